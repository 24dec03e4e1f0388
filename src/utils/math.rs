//! Математические функции и утилиты

use num_traits::Float;

/// Ограничение значения в заданных пределах
#[inline(always)]
pub fn constrain(value: f32, min: f32, max: f32) -> f32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Применение экспоненциальной кривой к управляющему сигналу
/// expo: 0.0 = линейная, 1.0 = максимальная экспонента
#[inline]
pub fn apply_expo(input: f32, expo: f32) -> f32 {
    let expo = constrain(expo, 0.0, 1.0);
    let input_abs = input.abs();

    // Формула: output = input * (|input| * expo + 1 - expo)
    let output_abs = input_abs * (input_abs * expo + 1.0 - expo);

    if input < 0.0 {
        -output_abs
    } else {
        output_abs
    }
}

/// Линейная интерполяция между двумя значениями
/// t: 0.0 = a, 1.0 = b
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * constrain(t, 0.0, 1.0)
}

/// Обратная линейная интерполяция - получение t из значения
#[inline]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() < f32::EPSILON {
        0.0
    } else {
        constrain((value - a) / (b - a), 0.0, 1.0)
    }
}

/// Перемапинг значения из одного диапазона в другой
#[inline]
pub fn map_range(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    let t = inverse_lerp(in_min, in_max, value);
    lerp(out_min, out_max, t)
}
