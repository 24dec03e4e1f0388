//! Ядро системы управления полетом малого мультикоптера.
//!
//! Библиотека не выполняет ввод-вывод и не содержит таймеров: внешний
//! планировщик вызывает [`FlightController::update`] один раз за цикл
//! управления и передает готовые данные радиоуправления, оценки ориентации,
//! напряжение батареи и прошедшее время. Результат - команды для микшера
//! моторов. Драйверы датчиков, приемника и ESC живут вне этого ядра.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod control;
pub mod data;
pub mod utils;

pub use control::controller::{ConfigError, FlightController};
pub use data::{
    ArmState, ArmingBlocker, Axis, AxisLimits, ControlOutputs, FailsafeAction, FailsafeConfig,
    FlightConfig, FlightMode, PidConfig, RcInput, SensorSample, SystemStatus,
};
