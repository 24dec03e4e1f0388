//! Монитор failsafe: потеря радиоуправления, потеря данных ориентации,
//! низкое напряжение батареи.
//!
//! Оценивается каждый цикл независимо от состояния arm. Флаги состояния
//! пересчитываются целиком, частично устаревших наборов не бывает.

use crate::config::flight::safety;
use crate::data::{FailsafeAction, FailsafeConfig, RcInput, SensorSample, SystemStatus};

/// Монитор условий failsafe
pub struct FailsafeMonitor {
    status: SystemStatus,
    /// Время последнего валидного кадра радиоуправления
    last_rc_valid_us: Option<u64>,
    /// Время последней валидной оценки ориентации
    last_sensor_valid_us: Option<u64>,
}

impl FailsafeMonitor {
    pub fn new() -> Self {
        Self {
            status: SystemStatus::empty(),
            last_rc_valid_us: None,
            last_sensor_valid_us: None,
        }
    }

    /// Проверка всех условий на текущем цикле.
    ///
    /// Возвращает действие наиболее приоритетного сработавшего условия
    /// (радиоуправление, затем ориентация, затем батарея); пока условие
    /// держится, действие возвращается каждый цикл.
    pub fn update(
        &mut self,
        rc: &RcInput,
        sensor: &SensorSample,
        battery_voltage: f32,
        now_us: u64,
        config: &FailsafeConfig,
    ) -> Option<FailsafeAction> {
        if rc.valid {
            self.last_rc_valid_us = Some(rc.timestamp_us);
        }
        if sensor.valid {
            self.last_sensor_valid_us = Some(sensor.timestamp_us);
        }

        let rc_lost =
            !rc.valid || now_us.saturating_sub(rc.timestamp_us) > safety::RC_TIMEOUT_MS * 1000;
        let sensor_lost = !sensor.valid
            || now_us.saturating_sub(sensor.timestamp_us) > safety::SENSOR_TIMEOUT_MS * 1000;
        let low_battery = battery_voltage < config.min_battery_v;

        let mut status = SystemStatus::empty();
        let mut action = None;

        if rc_lost {
            status |= SystemStatus::RC_LOST;
            action = action.or(Some(config.rc_loss_action));
        }
        if sensor_lost {
            status |= SystemStatus::SENSOR_LOST;
            action = action.or(Some(config.sensor_loss_action));
        }
        if low_battery {
            status |= SystemStatus::LOW_BATTERY;
            action = action.or(Some(config.low_battery_action));
        }
        if !status.is_empty() {
            status |= SystemStatus::FAILSAFE;

            #[cfg(feature = "defmt")]
            if !self.status.contains(SystemStatus::FAILSAFE) {
                defmt::warn!(
                    "Failsafe: rc_lost={} sensor_lost={} low_battery={}",
                    rc_lost,
                    sensor_lost,
                    low_battery
                );
            }
        }

        self.status = status;
        action
    }

    /// Активен ли хотя бы один failsafe
    pub fn active(&self) -> bool {
        self.status.contains(SystemStatus::FAILSAFE)
    }

    pub fn status(&self) -> SystemStatus {
        self.status
    }

    pub fn last_rc_valid_us(&self) -> Option<u64> {
        self.last_rc_valid_us
    }

    pub fn last_sensor_valid_us(&self) -> Option<u64> {
        self.last_sensor_valid_us
    }

    pub fn reset(&mut self) {
        self.status = SystemStatus::empty();
        self.last_rc_valid_us = None;
        self.last_sensor_valid_us = None;
    }
}

impl Default for FailsafeMonitor {
    fn default() -> Self {
        Self::new()
    }
}
