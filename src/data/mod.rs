//! Общие типы данных ядра управления полетом.
//!
//! Входные структуры ([`RcInput`], [`SensorSample`]) заполняются внешними
//! драйверами и передаются в ядро по значению каждый цикл; ядро их не
//! изменяет. Если окружение разносит опрос датчиков и расчет управления по
//! разным задачам, снимки должны пересекать границу через канал или обмен
//! неизменяемыми копиями, а не через общую изменяемую память.

use bitflags::bitflags;

use crate::config::flight::{limits, pid, rc, safety};

/// Данные радиоуправления: восемь каналов-импульсов в диапазоне 1000..2000
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RcInput {
    pub throttle: u16,
    pub roll: u16,
    pub pitch: u16,
    pub yaw: u16,
    /// Вспомогательные каналы (переключатели режимов и т.п.)
    pub aux: [u16; 4],
    pub timestamp_us: u64,
    /// Флаг валидности кадра от драйвера приемника
    pub valid: bool,
}

impl Default for RcInput {
    fn default() -> Self {
        Self {
            throttle: rc::MIN,
            roll: rc::CENTER,
            pitch: rc::CENTER,
            yaw: rc::CENTER,
            aux: [rc::CENTER; 4],
            timestamp_us: 0,
            valid: false,
        }
    }
}

/// Оценка ориентации от внешнего эстиматора
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSample {
    pub roll_deg: f32,       // Крен в градусах
    pub pitch_deg: f32,      // Тангаж в градусах
    pub yaw_deg: f32,        // Рыскание в градусах
    pub roll_rate_dps: f32,  // Угловая скорость по крену (град/с)
    pub pitch_rate_dps: f32, // Угловая скорость по тангажу (град/с)
    pub yaw_rate_dps: f32,   // Угловая скорость по рысканию (град/с)
    pub timestamp_us: u64,
    pub valid: bool,
}

/// Команды управления для микшера моторов
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlOutputs {
    pub roll: f32,     // Момент по крену, |x| <= output_limit
    pub pitch: f32,    // Момент по тангажу
    pub yaw: f32,      // Момент по рысканию
    pub throttle: u16, // Газ 0..1000
}

impl ControlOutputs {
    pub const ZERO: Self = Self {
        roll: 0.0,
        pitch: 0.0,
        yaw: 0.0,
        throttle: 0,
    };
}

/// Режим полета
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlightMode {
    /// Стики задают угловые скорости (acro)
    Rate,
    /// Стики крена/тангажа задают углы, рыскание - скорость
    Angle,
    /// Не реализован: ведет себя как Angle
    AltitudeHold,
    /// Не реализован: ведет себя как Angle
    PositionHold,
}

impl FlightMode {
    /// Использует ли режим внешний контур по углу.
    /// AltitudeHold и PositionHold не реализованы и намеренно
    /// сводятся к поведению Angle.
    pub fn uses_angle_loop(&self) -> bool {
        !matches!(self, FlightMode::Rate)
    }
}

/// Состояние машины arm/disarm
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArmState {
    Disarmed,
    Arming,
    Armed,
    Disarming,
}

/// Действие при срабатывании failsafe.
/// Реализован только EmergencyStop; остальные значения принимаются
/// конфигурацией, но в текущей версии сводятся к EmergencyStop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FailsafeAction {
    /// Немедленный disarm и сброс контроллеров
    EmergencyStop,
    /// Управляемая посадка (не реализовано)
    Land,
    /// Удержание позиции (не реализовано)
    PositionHold,
    /// Возврат домой (не реализовано)
    ReturnToHome,
}

/// Ось управления
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    Roll,
    Pitch,
    Yaw,
}

bitflags! {
    /// Флаги состояния системы, пересчитываются целиком каждый цикл
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SystemStatus: u16 {
        /// Потеря радиоуправления
        const RC_LOST = 1 << 0;
        /// Потеря данных ориентации
        const SENSOR_LOST = 1 << 1;
        /// Низкое напряжение батареи
        const LOW_BATTERY = 1 << 2;
        /// Активен хотя бы один failsafe
        const FAILSAFE = 1 << 3;
        /// Идет калибровка датчиков (выставляется внешним эстиматором
        /// через окружение, ядро флаг не поднимает)
        const CALIBRATING = 1 << 4;
    }
}

bitflags! {
    /// Причины отказа в постановке на охрану
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ArmingBlocker: u16 {
        /// Нет валидных данных радиоуправления
        const RC_INVALID = 1 << 0;
        /// Нет валидных данных ориентации
        const SENSOR_INVALID = 1 << 1;
        /// Активен failsafe
        const FAILSAFE_ACTIVE = 1 << 2;
        /// Угловая скорость выше порога
        const HIGH_RATE = 1 << 3;
        /// Угол наклона выше порога
        const HIGH_TILT = 1 << 4;
    }
}

/// Конфигурация одного PID контроллера
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidConfig {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Ограничение интегральной составляющей (anti-windup)
    pub i_limit: f32,
    /// Ограничение выхода
    pub output_limit: f32,
    /// Коэффициент фильтра дифференциальной составляющей (0..1)
    pub d_filter_alpha: f32,
}

impl PidConfig {
    pub const fn new(kp: f32, ki: f32, kd: f32, i_limit: f32, output_limit: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            i_limit,
            output_limit,
            d_filter_alpha: pid::D_FILTER_ALPHA,
        }
    }
}

/// Ограничения осей для генератора уставок
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisLimits {
    pub max_roll_rate_dps: f32,
    pub max_pitch_rate_dps: f32,
    pub max_yaw_rate_dps: f32,
    pub max_roll_angle_deg: f32,
    pub max_pitch_angle_deg: f32,
}

impl Default for AxisLimits {
    fn default() -> Self {
        Self {
            max_roll_rate_dps: limits::MAX_ROLL_RATE_DPS,
            max_pitch_rate_dps: limits::MAX_PITCH_RATE_DPS,
            max_yaw_rate_dps: limits::MAX_YAW_RATE_DPS,
            max_roll_angle_deg: limits::MAX_ROLL_ANGLE_DEG,
            max_pitch_angle_deg: limits::MAX_PITCH_ANGLE_DEG,
        }
    }
}

/// Конфигурация монитора failsafe
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FailsafeConfig {
    pub rc_loss_action: FailsafeAction,
    pub sensor_loss_action: FailsafeAction,
    pub low_battery_action: FailsafeAction,
    pub min_battery_v: f32,
}

impl Default for FailsafeConfig {
    fn default() -> Self {
        Self {
            rc_loss_action: FailsafeAction::EmergencyStop,
            sensor_loss_action: FailsafeAction::EmergencyStop,
            low_battery_action: FailsafeAction::EmergencyStop,
            min_battery_v: safety::MIN_BATTERY_V,
        }
    }
}

/// Полная конфигурация полетного контроллера.
/// Передается в `initialize` один раз; после этого меняются только
/// коэффициенты PID через `update_pid_gains`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlightConfig {
    pub roll_rate_pid: PidConfig,
    pub pitch_rate_pid: PidConfig,
    pub yaw_rate_pid: PidConfig,
    pub roll_angle_pid: PidConfig,
    pub pitch_angle_pid: PidConfig,
    pub limits: AxisLimits,
    /// Экспонента стиков, 0.0 = линейный отклик
    pub stick_expo: f32,
    pub failsafe: FailsafeConfig,
}

impl Default for FlightConfig {
    fn default() -> Self {
        use pid::{pitch_angle, pitch_rate, roll_angle, roll_rate, yaw_rate};

        Self {
            roll_rate_pid: PidConfig::new(
                roll_rate::KP,
                roll_rate::KI,
                roll_rate::KD,
                roll_rate::I_LIMIT,
                roll_rate::OUTPUT_LIMIT,
            ),
            pitch_rate_pid: PidConfig::new(
                pitch_rate::KP,
                pitch_rate::KI,
                pitch_rate::KD,
                pitch_rate::I_LIMIT,
                pitch_rate::OUTPUT_LIMIT,
            ),
            yaw_rate_pid: PidConfig::new(
                yaw_rate::KP,
                yaw_rate::KI,
                yaw_rate::KD,
                yaw_rate::I_LIMIT,
                yaw_rate::OUTPUT_LIMIT,
            ),
            roll_angle_pid: PidConfig::new(
                roll_angle::KP,
                roll_angle::KI,
                roll_angle::KD,
                roll_angle::I_LIMIT,
                roll_angle::OUTPUT_LIMIT,
            ),
            pitch_angle_pid: PidConfig::new(
                pitch_angle::KP,
                pitch_angle::KI,
                pitch_angle::KD,
                pitch_angle::I_LIMIT,
                pitch_angle::OUTPUT_LIMIT,
            ),
            limits: AxisLimits::default(),
            stick_expo: limits::STICK_EXPO,
            failsafe: FailsafeConfig::default(),
        }
    }
}
