//! Конфигурация параметров полета и PID контроллеров

/// Параметры каналов радиоуправления (импульсы в микросекундах)
pub mod rc {
    /// Минимальное значение канала
    pub const MIN: u16 = 1000;

    /// Максимальное значение канала
    pub const MAX: u16 = 2000;

    /// Центральное положение стика
    pub const CENTER: u16 = 1500;

    /// Зона нечувствительности вокруг центра
    pub const DEADBAND: u16 = 8;

    /// Половина рабочего диапазона стика (CENTER..MAX)
    pub const HALF_RANGE: f32 = 500.0;

    /// Верхняя граница выходного диапазона газа (0..1000)
    pub const THROTTLE_OUT_MAX: f32 = 1000.0;
}

/// Параметры PID контроллеров
pub mod pid {
    /// Коэффициент фильтра дифференциальной составляющей (0..1, 1 = без фильтра)
    pub const D_FILTER_ALPHA: f32 = 0.6;

    /// PID коэффициенты для контроля угловой скорости крена
    pub mod roll_rate {
        pub const KP: f32 = 1.2; // Пропорциональный коэффициент
        pub const KI: f32 = 0.8; // Интегральный коэффициент
        pub const KD: f32 = 0.02; // Дифференциальный коэффициент
        pub const I_LIMIT: f32 = 120.0; // Ограничение интегральной составляющей
        pub const OUTPUT_LIMIT: f32 = 400.0; // Максимальный выход
    }

    /// PID коэффициенты для контроля угловой скорости тангажа
    pub mod pitch_rate {
        pub const KP: f32 = 1.2;
        pub const KI: f32 = 0.8;
        pub const KD: f32 = 0.02;
        pub const I_LIMIT: f32 = 120.0;
        pub const OUTPUT_LIMIT: f32 = 400.0;
    }

    /// PID коэффициенты для контроля угловой скорости рыскания
    pub mod yaw_rate {
        pub const KP: f32 = 2.5;
        pub const KI: f32 = 0.5;
        pub const KD: f32 = 0.0;
        pub const I_LIMIT: f32 = 100.0;
        pub const OUTPUT_LIMIT: f32 = 400.0;
    }

    /// PID коэффициенты для контроля угла крена (roll)
    pub mod roll_angle {
        pub const KP: f32 = 4.5;
        pub const KI: f32 = 0.02;
        pub const KD: f32 = 0.15;
        pub const I_LIMIT: f32 = 10.0;
        // Выход внешнего контура - целевая угловая скорость (град/с)
        pub const OUTPUT_LIMIT: f32 = 200.0;
    }

    /// PID коэффициенты для контроля угла тангажа (pitch)
    pub mod pitch_angle {
        pub const KP: f32 = 4.5;
        pub const KI: f32 = 0.02;
        pub const KD: f32 = 0.15;
        pub const I_LIMIT: f32 = 10.0;
        pub const OUTPUT_LIMIT: f32 = 200.0;
    }
}

/// Ограничения осей в режимах стабилизации
pub mod limits {
    /// Максимальная угловая скорость крена (град/с)
    pub const MAX_ROLL_RATE_DPS: f32 = 200.0;

    /// Максимальная угловая скорость тангажа (град/с)
    pub const MAX_PITCH_RATE_DPS: f32 = 200.0;

    /// Максимальная угловая скорость рыскания (град/с)
    pub const MAX_YAW_RATE_DPS: f32 = 180.0;

    /// Максимальный угол крена в режиме стабилизации (градусы)
    pub const MAX_ROLL_ANGLE_DEG: f32 = 25.0;

    /// Максимальный угол тангажа в режиме стабилизации (градусы)
    pub const MAX_PITCH_ANGLE_DEG: f32 = 20.0;

    /// Коэффициент экспоненты для сглаживания управления
    pub const STICK_EXPO: f32 = 0.0;
}

/// Параметры процедуры постановки на охрану (arming)
pub mod arming {
    use super::rc;

    /// Порог газа для жестов arm/disarm и таймера авто-disarm
    pub const GESTURE_THROTTLE_MAX: u16 = rc::MIN + 50;

    /// Минимальное положение рыскания для жеста arm
    pub const ARM_YAW_MIN: u16 = rc::MAX - 100;

    /// Максимальное положение рыскания для жеста disarm
    pub const DISARM_YAW_MAX: u16 = rc::MIN + 100;

    /// Допустимое отклонение крена/тангажа от центра при жесте
    pub const STICK_CENTER_BAND: u16 = 50;

    /// Время удержания жеста (мс)
    pub const GESTURE_HOLD_MS: u64 = 1000;

    /// Авто-disarm при простое с минимальным газом (мс)
    pub const AUTO_DISARM_MS: u64 = 30_000;

    /// Максимальная угловая скорость для разрешения arm (град/с)
    pub const MAX_ARM_RATE_DPS: f32 = 5.0;

    /// Максимальный угол для разрешения arm (градусы)
    pub const MAX_ARM_ANGLE_DEG: f32 = 45.0;
}

/// Параметры безопасности полета
pub mod safety {
    /// Таймаут данных радиоуправления (мс)
    pub const RC_TIMEOUT_MS: u64 = 1000;

    /// Таймаут данных ориентации (мс)
    pub const SENSOR_TIMEOUT_MS: u64 = 100;

    /// Минимальное напряжение батареи (вольты, 3S Li-Po)
    pub const MIN_BATTERY_V: f32 = 10.5;
}
