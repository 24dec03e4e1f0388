//! Машина состояний arm/disarm.
//!
//! Постановка на охрану и снятие выполняются жестами стиков (газ в
//! минимум, рыскание в крайнее положение) либо явным запросом. Таймеры
//! удержания жестов - явные поля машины, никаких скрытых статиков:
//! машина полностью реентерабельна и тестируется без реального времени.

use num_traits::Float;

use crate::config::flight::arming;
use crate::data::{ArmState, ArmingBlocker, RcInput, SensorSample};

/// Машина состояний arm/disarm с таймерами жестов
pub struct ArmingStateMachine {
    state: ArmState,
    /// Начало удержания жеста arm
    arm_gesture_since_us: Option<u64>,
    /// Начало удержания жеста disarm
    disarm_gesture_since_us: Option<u64>,
    /// Начало простоя с минимальным газом (авто-disarm)
    idle_throttle_since_us: Option<u64>,
    /// Причины последнего отказа в arm
    blockers: ArmingBlocker,
}

impl ArmingStateMachine {
    pub fn new() -> Self {
        Self {
            state: ArmState::Disarmed,
            arm_gesture_since_us: None,
            disarm_gesture_since_us: None,
            idle_throttle_since_us: None,
            blockers: ArmingBlocker::empty(),
        }
    }

    pub fn state(&self) -> ArmState {
        self.state
    }

    /// Причины, по которым последний запрос/жест arm был отклонен
    pub fn blockers(&self) -> ArmingBlocker {
        self.blockers
    }

    /// Один шаг машины состояний. Вызывается каждый цикл после монитора
    /// failsafe, до расчета уставок.
    pub fn update(
        &mut self,
        rc: &RcInput,
        sensor: &SensorSample,
        failsafe_active: bool,
        now_us: u64,
    ) {
        match self.state {
            ArmState::Disarmed => {
                self.disarm_gesture_since_us = None;
                self.idle_throttle_since_us = None;

                if rc.valid && is_arm_gesture(rc) {
                    let since = *self.arm_gesture_since_us.get_or_insert(now_us);
                    if now_us - since >= arming::GESTURE_HOLD_MS * 1000 {
                        // Жест удержан; условия проверяются в момент
                        // завершения удержания
                        self.blockers = arming_gate(rc, sensor, failsafe_active);
                        if self.blockers.is_empty() {
                            self.enter_armed();
                        }
                    }
                } else {
                    self.arm_gesture_since_us = None;
                }
            }

            ArmState::Arming => {
                // Явный запрос arm разрешается по состоянию следующего цикла
                self.blockers = arming_gate(rc, sensor, failsafe_active);
                if self.blockers.is_empty() {
                    self.enter_armed();
                } else {
                    self.enter_disarmed();
                }
            }

            ArmState::Armed => {
                if rc.valid && is_disarm_gesture(rc) {
                    let since = *self.disarm_gesture_since_us.get_or_insert(now_us);
                    if now_us - since >= arming::GESTURE_HOLD_MS * 1000 {
                        #[cfg(feature = "defmt")]
                        defmt::info!("Disarm по жесту оператора");
                        self.enter_disarmed();
                        return;
                    }
                } else {
                    self.disarm_gesture_since_us = None;
                }

                // Авто-disarm: газ на минимуме слишком долго
                if rc.valid && rc.throttle <= arming::GESTURE_THROTTLE_MAX {
                    let since = *self.idle_throttle_since_us.get_or_insert(now_us);
                    if now_us - since >= arming::AUTO_DISARM_MS * 1000 {
                        #[cfg(feature = "defmt")]
                        defmt::info!("Авто-disarm: простой с минимальным газом");
                        self.enter_disarmed();
                    }
                } else {
                    self.idle_throttle_since_us = None;
                }
            }

            ArmState::Disarming => {
                // Запрошенный disarm безусловен
                self.enter_disarmed();
            }
        }
    }

    /// Явный запрос постановки на охрану.
    /// Принимается только из Disarmed при неактивном failsafe; решение
    /// по условиям arm выносится на следующем цикле (Arming -> Armed
    /// или обратно в Disarmed).
    pub fn request_arm(&mut self, failsafe_active: bool) -> bool {
        if self.state == ArmState::Disarmed && !failsafe_active {
            self.state = ArmState::Arming;
            true
        } else {
            false
        }
    }

    /// Явный запрос снятия с охраны; принимается всегда
    pub fn request_disarm(&mut self) -> bool {
        self.state = ArmState::Disarming;
        true
    }

    /// Безусловный немедленный disarm (failsafe, аварийный останов)
    pub fn force_disarm(&mut self) {
        self.enter_disarmed();
    }

    fn enter_armed(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::info!("Система на охране (armed)");
        self.state = ArmState::Armed;
        self.arm_gesture_since_us = None;
        self.disarm_gesture_since_us = None;
        self.idle_throttle_since_us = None;
    }

    fn enter_disarmed(&mut self) {
        self.state = ArmState::Disarmed;
        self.arm_gesture_since_us = None;
        self.disarm_gesture_since_us = None;
        self.idle_throttle_since_us = None;
    }
}

impl Default for ArmingStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Жест arm: газ в минимум, рыскание вправо до упора, крен/тангаж в центре
fn is_arm_gesture(rc: &RcInput) -> bool {
    rc.throttle <= arming::GESTURE_THROTTLE_MAX
        && rc.yaw >= arming::ARM_YAW_MIN
        && stick_centered(rc.roll)
        && stick_centered(rc.pitch)
}

/// Жест disarm: газ в минимум, рыскание влево до упора, крен/тангаж в центре
fn is_disarm_gesture(rc: &RcInput) -> bool {
    rc.throttle <= arming::GESTURE_THROTTLE_MAX
        && rc.yaw <= arming::DISARM_YAW_MAX
        && stick_centered(rc.roll)
        && stick_centered(rc.pitch)
}

fn stick_centered(pulse: u16) -> bool {
    (pulse as i32 - crate::config::flight::rc::CENTER as i32).unsigned_abs()
        <= arming::STICK_CENTER_BAND as u32
}

/// Условия разрешения arm в момент завершения жеста/запроса
fn arming_gate(rc: &RcInput, sensor: &SensorSample, failsafe_active: bool) -> ArmingBlocker {
    let mut blockers = ArmingBlocker::empty();

    if !rc.valid {
        blockers |= ArmingBlocker::RC_INVALID;
    }
    if !sensor.valid {
        blockers |= ArmingBlocker::SENSOR_INVALID;
    }
    if failsafe_active {
        blockers |= ArmingBlocker::FAILSAFE_ACTIVE;
    }
    if sensor.roll_rate_dps.abs() >= arming::MAX_ARM_RATE_DPS
        || sensor.pitch_rate_dps.abs() >= arming::MAX_ARM_RATE_DPS
        || sensor.yaw_rate_dps.abs() >= arming::MAX_ARM_RATE_DPS
    {
        blockers |= ArmingBlocker::HIGH_RATE;
    }
    if sensor.roll_deg.abs() >= arming::MAX_ARM_ANGLE_DEG
        || sensor.pitch_deg.abs() >= arming::MAX_ARM_ANGLE_DEG
        || sensor.yaw_deg.abs() >= arming::MAX_ARM_ANGLE_DEG
    {
        blockers |= ArmingBlocker::HIGH_TILT;
    }

    blockers
}
