//! Полетный контроллер - единая точка входа ядра.
//!
//! Внешний планировщик вызывает [`FlightController::update`] один раз за
//! цикл управления (целевая частота от 100 Гц). Порядок внутри цикла
//! фиксирован: аварийный флаг, монитор failsafe, машина arm/disarm,
//! генератор уставок, каскад PID. Поздние стадии видят результаты ранних
//! стадий текущего цикла, никогда - устаревшие.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::config::flight::rc;
use crate::control::arming::ArmingStateMachine;
use crate::control::cascade::CascadeController;
use crate::control::failsafe::FailsafeMonitor;
use crate::control::pid::PidState;
use crate::control::setpoint;
use crate::data::{
    ArmState, ArmingBlocker, Axis, ControlOutputs, FailsafeAction, FlightConfig, FlightMode,
    PidConfig, RcInput, SensorSample, SystemStatus,
};
use crate::utils::math::map_range;

/// Ошибка конфигурации при инициализации
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Неположительный предел скорости или угла оси
    InvalidAxisLimit,
    /// Некорректная конфигурация PID (предел выхода, интеграла или
    /// коэффициент фильтра)
    InvalidPidConfig,
}

/// Полетный контроллер: фасад над монитором failsafe, машиной arm/disarm
/// и каскадом PID.
///
/// Все внутреннее состояние принадлежит задаче, вызывающей `update`.
/// Исключение - [`FlightController::emergency_stop`]: метод только
/// взводит атомарный флаг и поэтому безопасен из контекста с более
/// высоким приоритетом (например, обработчика kill-switch) параллельно
/// с выполняющимся `update`.
pub struct FlightController {
    config: FlightConfig,
    initialized: bool,
    mode: FlightMode,
    arming: ArmingStateMachine,
    failsafe: FailsafeMonitor,
    cascade: CascadeController,
    /// Накопленное время работы (мкс), база для проверок свежести
    now_us: u64,
    /// Запрос аварийного останова, потребляется в начале `update`
    estop: AtomicBool,
}

impl FlightController {
    pub fn new() -> Self {
        let config = FlightConfig::default();
        Self {
            cascade: CascadeController::new(&config),
            config,
            initialized: false,
            mode: FlightMode::Angle,
            arming: ArmingStateMachine::new(),
            failsafe: FailsafeMonitor::new(),
            now_us: 0,
            estop: AtomicBool::new(false),
        }
    }

    /// Применение конфигурации. До успешного завершения контроллер
    /// не считает циклы и не принимает запросы arm.
    pub fn initialize(&mut self, config: FlightConfig) -> Result<(), ConfigError> {
        self.initialized = false;

        let limits = &config.limits;
        if limits.max_roll_rate_dps <= 0.0
            || limits.max_pitch_rate_dps <= 0.0
            || limits.max_yaw_rate_dps <= 0.0
            || limits.max_roll_angle_deg <= 0.0
            || limits.max_pitch_angle_deg <= 0.0
        {
            return Err(ConfigError::InvalidAxisLimit);
        }

        for pid in [
            &config.roll_rate_pid,
            &config.pitch_rate_pid,
            &config.yaw_rate_pid,
            &config.roll_angle_pid,
            &config.pitch_angle_pid,
        ] {
            if pid.output_limit <= 0.0
                || pid.i_limit < 0.0
                || !(0.0..=1.0).contains(&pid.d_filter_alpha)
            {
                return Err(ConfigError::InvalidPidConfig);
            }
        }

        self.cascade = CascadeController::new(&config);
        self.config = config;
        self.arming = ArmingStateMachine::new();
        self.failsafe.reset();
        self.now_us = 0;
        self.initialized = true;

        #[cfg(feature = "defmt")]
        defmt::info!("Полетный контроллер инициализирован");

        Ok(())
    }

    /// Один цикл управления.
    ///
    /// `dt_us` - время с прошлого вызова в микросекундах. Возвращает
    /// команды для микшера; нули, если аппарат не armed, активен
    /// failsafe или контроллер не инициализирован.
    pub fn update(
        &mut self,
        rc_input: &RcInput,
        sensor: &SensorSample,
        battery_voltage: f32,
        dt_us: u64,
    ) -> ControlOutputs {
        // Аварийный флаг мог быть взведен из другого контекста
        if self.estop.swap(false, Ordering::Relaxed) {
            #[cfg(feature = "defmt")]
            defmt::warn!("Аварийный останов: disarm и сброс контроллеров");
            self.arming.force_disarm();
            self.cascade.reset();
        }

        if !self.initialized {
            return ControlOutputs::ZERO;
        }

        self.now_us += dt_us;

        // 1. Монитор failsafe
        if let Some(action) = self.failsafe.update(
            rc_input,
            sensor,
            battery_voltage,
            self.now_us,
            &self.config.failsafe,
        ) {
            self.apply_failsafe_action(action);
        }

        // 2. Машина arm/disarm; на переходах - безударный рестарт PID
        let prev_state = self.arming.state();
        self.arming
            .update(rc_input, sensor, self.failsafe.active(), self.now_us);
        let arm_state = self.arming.state();
        if arm_state != prev_state
            && matches!(arm_state, ArmState::Armed | ArmState::Disarmed)
        {
            self.cascade.reset();
            // Цикл перехода в Armed выходов не дает: PID стартуют с
            // чистого состояния на следующем цикле, пока оператор
            // отпускает жест
            if arm_state == ArmState::Armed {
                return ControlOutputs::ZERO;
            }
        }

        // 3. Без arm или под failsafe управление не считается
        if arm_state != ArmState::Armed || self.failsafe.active() {
            return ControlOutputs::ZERO;
        }

        // 4. Уставки и каскад
        let setpoints = setpoint::generate(
            rc_input,
            self.mode,
            &self.config.limits,
            self.config.stick_expo,
        );
        let dt_s = dt_us as f32 / 1_000_000.0;
        let axis = self
            .cascade
            .update(&setpoints, sensor, self.mode, &self.config.limits, dt_s);

        ControlOutputs {
            roll: axis.roll,
            pitch: axis.pitch,
            yaw: axis.yaw,
            throttle: map_range(
                rc_input.throttle as f32,
                rc::MIN as f32,
                rc::MAX as f32,
                0.0,
                rc::THROTTLE_OUT_MAX,
            ) as u16,
        }
    }

    /// Смена режима полета. Отклоняется, если аппарат armed при активном
    /// failsafe; принятая смена сбрасывает все PID (безударный переход).
    pub fn set_flight_mode(&mut self, mode: FlightMode) -> bool {
        if self.arming.state() == ArmState::Armed && self.failsafe.active() {
            return false;
        }
        if mode != self.mode {
            self.mode = mode;
            self.cascade.reset();
        }
        true
    }

    /// Явный запрос arm/disarm.
    /// Запрос arm отклоняется до инициализации, вне Disarmed и при
    /// активном failsafe; запрос disarm принимается всегда.
    pub fn set_armed(&mut self, armed: bool) -> bool {
        if armed {
            self.initialized && self.arming.request_arm(self.failsafe.active())
        } else {
            self.arming.request_disarm()
        }
    }

    /// Замена коэффициентов одного PID на лету.
    /// Возвращает false для несуществующего контура (угол рыскания).
    pub fn update_pid_gains(&mut self, axis: Axis, is_rate: bool, config: PidConfig) -> bool {
        let stored = match (axis, is_rate) {
            (Axis::Roll, true) => &mut self.config.roll_rate_pid,
            (Axis::Pitch, true) => &mut self.config.pitch_rate_pid,
            (Axis::Yaw, true) => &mut self.config.yaw_rate_pid,
            (Axis::Roll, false) => &mut self.config.roll_angle_pid,
            (Axis::Pitch, false) => &mut self.config.pitch_angle_pid,
            (Axis::Yaw, false) => return false,
        };
        *stored = config;
        self.cascade.set_gains(axis, is_rate, config);
        true
    }

    /// Сброс состояния всех PID контроллеров
    pub fn reset_pid_controllers(&mut self) {
        self.cascade.reset();
    }

    /// Запрос аварийного останова. Только взводит атомарный флаг;
    /// флаг потребляется в начале следующего `update`, который выполнит
    /// disarm и сброс контроллеров.
    pub fn emergency_stop(&self) {
        self.estop.store(true, Ordering::Relaxed);
    }

    pub fn flight_mode(&self) -> FlightMode {
        self.mode
    }

    pub fn arm_state(&self) -> ArmState {
        self.arming.state()
    }

    /// Флаги состояния последнего цикла
    pub fn status(&self) -> SystemStatus {
        self.failsafe.status()
    }

    /// Причины последнего отказа в arm - для наземной станции
    pub fn arming_blockers(&self) -> ArmingBlocker {
        self.arming.blockers()
    }

    /// Состояние одного PID контроллера - для телеметрии.
    /// None для несуществующего контура угла рыскания.
    pub fn pid_state(&self, axis: Axis, is_rate: bool) -> Option<&PidState> {
        if is_rate {
            Some(self.cascade.rate_pid(axis).state())
        } else {
            self.cascade.angle_pid(axis).map(|pid| pid.state())
        }
    }

    /// Накопленное время работы (мкс)
    pub fn uptime_us(&self) -> u64 {
        self.now_us
    }

    /// Исполнение действия failsafe. Реализован только аварийный
    /// останов; объявленные Land/PositionHold/ReturnToHome в текущей
    /// версии намеренно сводятся к нему же.
    fn apply_failsafe_action(&mut self, action: FailsafeAction) {
        match action {
            FailsafeAction::EmergencyStop
            | FailsafeAction::Land
            | FailsafeAction::PositionHold
            | FailsafeAction::ReturnToHome => {
                if self.arming.state() != ArmState::Disarmed {
                    self.arming.force_disarm();
                    self.cascade.reset();
                }
            }
        }
    }
}

impl Default for FlightController {
    fn default() -> Self {
        Self::new()
    }
}
