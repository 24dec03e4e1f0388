//! Генератор уставок: преобразование стиков в цели контуров управления.
//!
//! Каждый стик проходит зону нечувствительности вокруг центра, затем
//! линейно (или с экспонентой) масштабируется в предел своей оси.

use crate::config::flight::rc;
use crate::data::{AxisLimits, FlightMode, RcInput};
use crate::utils::math::{apply_expo, constrain};

/// Уставки контуров на один цикл.
/// В режиме Rate `roll`/`pitch` - угловые скорости (град/с),
/// в режимах с внешним контуром - углы (градусы).
/// `yaw_rate` всегда угловая скорость: контура удержания угла рыскания нет.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Setpoints {
    pub roll: f32,
    pub pitch: f32,
    pub yaw_rate: f32,
}

/// Отображение импульса стика в уставку оси.
///
/// Внутри зоны нечувствительности (±DEADBAND от центра) уставка ровно 0;
/// снаружи зона вычитается, чтобы отклик начинался без скачка:
/// normalized = (pulse - (CENTER ± DEADBAND)) / HALF_RANGE.
fn stick_to_setpoint(pulse: u16, limit: f32, expo: f32) -> f32 {
    let centered = pulse as i32 - rc::CENTER as i32;
    let deadband = rc::DEADBAND as i32;

    if centered.abs() < deadband {
        return 0.0;
    }

    let shifted = if centered > 0 {
        centered - deadband
    } else {
        centered + deadband
    };

    let normalized = shifted as f32 / rc::HALF_RANGE;
    let shaped = apply_expo(normalized, expo);

    constrain(shaped * limit, -limit, limit)
}

/// Расчет уставок для активного режима полета
pub fn generate(rc_input: &RcInput, mode: FlightMode, limits: &AxisLimits, expo: f32) -> Setpoints {
    let yaw_rate = stick_to_setpoint(rc_input.yaw, limits.max_yaw_rate_dps, expo);

    if mode.uses_angle_loop() {
        Setpoints {
            roll: stick_to_setpoint(rc_input.roll, limits.max_roll_angle_deg, expo),
            pitch: stick_to_setpoint(rc_input.pitch, limits.max_pitch_angle_deg, expo),
            yaw_rate,
        }
    } else {
        Setpoints {
            roll: stick_to_setpoint(rc_input.roll, limits.max_roll_rate_dps, expo),
            pitch: stick_to_setpoint(rc_input.pitch, limits.max_pitch_rate_dps, expo),
            yaw_rate,
        }
    }
}

// Тесты для отладки на хосте
#[cfg(test)]
mod tests {
    use super::*;

    fn rc_with_roll(roll: u16) -> RcInput {
        RcInput {
            roll,
            valid: true,
            ..RcInput::default()
        }
    }

    #[test]
    fn test_deadband_maps_to_zero() {
        let limits = AxisLimits::default();
        // 1507 внутри зоны нечувствительности ±8
        let sp = generate(&rc_with_roll(1507), FlightMode::Rate, &limits, 0.0);
        assert_eq!(sp.roll, 0.0);

        let sp = generate(&rc_with_roll(1493), FlightMode::Rate, &limits, 0.0);
        assert_eq!(sp.roll, 0.0);

        let sp = generate(&rc_with_roll(1500), FlightMode::Rate, &limits, 0.0);
        assert_eq!(sp.roll, 0.0);
    }

    #[test]
    fn test_linear_scale_outside_deadband() {
        let limits = AxisLimits::default();
        let sp = generate(&rc_with_roll(1520), FlightMode::Rate, &limits, 0.0);

        // (1520 - 1508) / 500 * max_roll_rate
        let expected = (1520.0 - 1508.0) / 500.0 * limits.max_roll_rate_dps;
        assert!((sp.roll - expected).abs() < 1e-4);

        // Симметрия по знаку
        let sp = generate(&rc_with_roll(1480), FlightMode::Rate, &limits, 0.0);
        let expected = (1480.0 - 1492.0) / 500.0 * limits.max_roll_rate_dps;
        assert!((sp.roll - expected).abs() < 1e-4);
    }

    #[test]
    fn test_setpoint_clamped_to_limit() {
        let limits = AxisLimits::default();
        let sp = generate(&rc_with_roll(2000), FlightMode::Rate, &limits, 0.0);
        assert!(sp.roll <= limits.max_roll_rate_dps);
        assert!(sp.roll > 0.9 * limits.max_roll_rate_dps);
    }

    #[test]
    fn test_angle_mode_uses_angle_limits() {
        let limits = AxisLimits::default();
        let rc_input = RcInput {
            roll: 2000,
            pitch: 1000,
            valid: true,
            ..RcInput::default()
        };

        let sp = generate(&rc_input, FlightMode::Angle, &limits, 0.0);
        assert!(sp.roll <= limits.max_roll_angle_deg);
        assert!(sp.roll > 0.9 * limits.max_roll_angle_deg);
        assert!(sp.pitch >= -limits.max_pitch_angle_deg);
        assert!(sp.pitch < -0.9 * limits.max_pitch_angle_deg);
    }

    #[test]
    fn test_yaw_is_rate_in_both_modes() {
        let limits = AxisLimits::default();
        let rc_input = RcInput {
            yaw: 2000,
            valid: true,
            ..RcInput::default()
        };

        let rate = generate(&rc_input, FlightMode::Rate, &limits, 0.0);
        let angle = generate(&rc_input, FlightMode::Angle, &limits, 0.0);
        assert_eq!(rate.yaw_rate, angle.yaw_rate);
        assert!(rate.yaw_rate > 0.9 * limits.max_yaw_rate_dps);
    }

    #[test]
    fn test_unimplemented_modes_fall_back_to_angle() {
        let limits = AxisLimits::default();
        let rc_input = rc_with_roll(1800);

        let angle = generate(&rc_input, FlightMode::Angle, &limits, 0.0);
        let alt = generate(&rc_input, FlightMode::AltitudeHold, &limits, 0.0);
        let pos = generate(&rc_input, FlightMode::PositionHold, &limits, 0.0);
        assert_eq!(angle, alt);
        assert_eq!(angle, pos);
    }
}
