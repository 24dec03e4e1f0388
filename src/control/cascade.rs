//! Каскадный контроллер стабилизации.
//!
//! Режим Rate: по одному PID на ось, уставка скорости против измеренной
//! скорости. Режимы с внешним контуром: PID по углу дает целевую угловую
//! скорость (ограниченную пределом оси), которая идет на вход PID по
//! скорости. Рыскание всегда управляется только по скорости.

use crate::control::pid::PidController;
use crate::control::setpoint::Setpoints;
use crate::data::{Axis, AxisLimits, FlightConfig, FlightMode, PidConfig, SensorSample};
use crate::utils::math::constrain;

/// Выходы осей до микширования
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisOutputs {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

/// Пять PID контроллеров: три внутренних контура скорости и два внешних
/// контура угла (крен и тангаж)
pub struct CascadeController {
    roll_rate: PidController,
    pitch_rate: PidController,
    yaw_rate: PidController,
    roll_angle: PidController,
    pitch_angle: PidController,
}

impl CascadeController {
    pub fn new(config: &FlightConfig) -> Self {
        Self {
            roll_rate: PidController::new(config.roll_rate_pid),
            pitch_rate: PidController::new(config.pitch_rate_pid),
            yaw_rate: PidController::new(config.yaw_rate_pid),
            roll_angle: PidController::new(config.roll_angle_pid),
            pitch_angle: PidController::new(config.pitch_angle_pid),
        }
    }

    /// Один шаг каскада.
    ///
    /// При невалидных данных ориентации PID не обновляются: выходы
    /// держат значения прошлого шага (вышестоящая логика обнуляет их,
    /// если аппарат не armed).
    pub fn update(
        &mut self,
        setpoints: &Setpoints,
        sensor: &SensorSample,
        mode: FlightMode,
        limits: &AxisLimits,
        dt_s: f32,
    ) -> AxisOutputs {
        if !sensor.valid {
            return self.last_outputs();
        }

        let (roll_out, pitch_out) = if mode.uses_angle_loop() {
            // Внешний контур: угол -> целевая угловая скорость
            let roll_rate_sp = constrain(
                self.roll_angle
                    .update(setpoints.roll, sensor.roll_deg, dt_s),
                -limits.max_roll_rate_dps,
                limits.max_roll_rate_dps,
            );
            let pitch_rate_sp = constrain(
                self.pitch_angle
                    .update(setpoints.pitch, sensor.pitch_deg, dt_s),
                -limits.max_pitch_rate_dps,
                limits.max_pitch_rate_dps,
            );

            // Внутренний контур: скорость -> момент
            (
                self.roll_rate
                    .update(roll_rate_sp, sensor.roll_rate_dps, dt_s),
                self.pitch_rate
                    .update(pitch_rate_sp, sensor.pitch_rate_dps, dt_s),
            )
        } else {
            (
                self.roll_rate
                    .update(setpoints.roll, sensor.roll_rate_dps, dt_s),
                self.pitch_rate
                    .update(setpoints.pitch, sensor.pitch_rate_dps, dt_s),
            )
        };

        let yaw_out = self
            .yaw_rate
            .update(setpoints.yaw_rate, sensor.yaw_rate_dps, dt_s);

        AxisOutputs {
            roll: roll_out,
            pitch: pitch_out,
            yaw: yaw_out,
        }
    }

    /// Выходы прошлого шага без пересчета
    pub fn last_outputs(&self) -> AxisOutputs {
        AxisOutputs {
            roll: self.roll_rate.output(),
            pitch: self.pitch_rate.output(),
            yaw: self.yaw_rate.output(),
        }
    }

    /// Сброс всех пяти контроллеров (безударный рестарт)
    pub fn reset(&mut self) {
        self.roll_rate.reset();
        self.pitch_rate.reset();
        self.yaw_rate.reset();
        self.roll_angle.reset();
        self.pitch_angle.reset();
    }

    /// Сумма модулей интегральных накопителей - для проверки сброса
    pub fn total_integral(&self) -> f32 {
        use num_traits::Float;

        self.roll_rate.state().integral.abs()
            + self.pitch_rate.state().integral.abs()
            + self.yaw_rate.state().integral.abs()
            + self.roll_angle.state().integral.abs()
            + self.pitch_angle.state().integral.abs()
    }

    /// Замена коэффициентов одного контроллера.
    /// Возвращает false для несуществующей комбинации (контура угла
    /// рыскания нет).
    pub fn set_gains(&mut self, axis: Axis, is_rate: bool, config: PidConfig) -> bool {
        let pid = match (axis, is_rate) {
            (Axis::Roll, true) => &mut self.roll_rate,
            (Axis::Pitch, true) => &mut self.pitch_rate,
            (Axis::Yaw, true) => &mut self.yaw_rate,
            (Axis::Roll, false) => &mut self.roll_angle,
            (Axis::Pitch, false) => &mut self.pitch_angle,
            (Axis::Yaw, false) => return false,
        };
        pid.set_config(config);
        true
    }

    pub fn rate_pid(&self, axis: Axis) -> &PidController {
        match axis {
            Axis::Roll => &self.roll_rate,
            Axis::Pitch => &self.pitch_rate,
            Axis::Yaw => &self.yaw_rate,
        }
    }

    pub fn angle_pid(&self, axis: Axis) -> Option<&PidController> {
        match axis {
            Axis::Roll => Some(&self.roll_angle),
            Axis::Pitch => Some(&self.pitch_angle),
            Axis::Yaw => None,
        }
    }
}

// Тесты для отладки на хосте
#[cfg(test)]
mod tests {
    use super::*;

    fn level_sensor() -> SensorSample {
        SensorSample {
            valid: true,
            timestamp_us: 10_000,
            ..SensorSample::default()
        }
    }

    #[test]
    fn test_rate_mode_tracks_rate_error() {
        let config = FlightConfig::default();
        let mut cascade = CascadeController::new(&config);
        let sp = Setpoints {
            roll: 50.0,
            ..Setpoints::default()
        };

        let out = cascade.update(&sp, &level_sensor(), FlightMode::Rate, &config.limits, 0.01);
        // Положительная ошибка скорости крена дает положительный момент
        assert!(out.roll > 0.0);
        assert_eq!(out.pitch, 0.0);
        assert_eq!(out.yaw, 0.0);
    }

    #[test]
    fn test_angle_mode_cascades_through_rate_loop() {
        let config = FlightConfig::default();
        let mut cascade = CascadeController::new(&config);
        let sp = Setpoints {
            roll: 20.0,
            ..Setpoints::default()
        };

        cascade.update(&sp, &level_sensor(), FlightMode::Angle, &config.limits, 0.01);

        // Внешний контур выдал целевую скорость, внутренний ее отработал
        let inner_sp = cascade.rate_pid(Axis::Roll).state().setpoint;
        assert!(inner_sp > 0.0);
        assert!(inner_sp <= config.limits.max_roll_rate_dps);
    }

    #[test]
    fn test_angle_mode_rate_setpoint_clamped() {
        let mut config = FlightConfig::default();
        // Жесткий внешний контур: без ограничения уставка улетела бы
        // далеко за предел скорости
        config.roll_angle_pid.kp = 1000.0;
        let mut cascade = CascadeController::new(&config);
        let sp = Setpoints {
            roll: config.limits.max_roll_angle_deg,
            ..Setpoints::default()
        };

        cascade.update(&sp, &level_sensor(), FlightMode::Angle, &config.limits, 0.01);
        let inner_sp = cascade.rate_pid(Axis::Roll).state().setpoint;
        assert_eq!(inner_sp, config.limits.max_roll_rate_dps);
    }

    #[test]
    fn test_invalid_sensor_holds_outputs() {
        let config = FlightConfig::default();
        let mut cascade = CascadeController::new(&config);
        let sp = Setpoints {
            roll: 50.0,
            pitch: -30.0,
            yaw_rate: 20.0,
        };

        let before = cascade.update(&sp, &level_sensor(), FlightMode::Rate, &config.limits, 0.01);

        let stale = SensorSample {
            valid: false,
            ..level_sensor()
        };
        let held = cascade.update(&sp, &stale, FlightMode::Rate, &config.limits, 0.01);
        assert_eq!(before, held);
        // Интеграл не накапливался на невалидном шаге
        let integral = cascade.rate_pid(Axis::Roll).state().integral;
        let held2 = cascade.update(&sp, &stale, FlightMode::Rate, &config.limits, 0.01);
        assert_eq!(held, held2);
        assert_eq!(integral, cascade.rate_pid(Axis::Roll).state().integral);
    }

    #[test]
    fn test_reset_zeroes_all_integrals() {
        let config = FlightConfig::default();
        let mut cascade = CascadeController::new(&config);
        let sp = Setpoints {
            roll: 50.0,
            pitch: 30.0,
            yaw_rate: 20.0,
        };

        for _ in 0..10 {
            cascade.update(&sp, &level_sensor(), FlightMode::Angle, &config.limits, 0.01);
        }
        assert!(cascade.total_integral() > 0.0);

        cascade.reset();
        assert_eq!(cascade.total_integral(), 0.0);
        assert_eq!(cascade.last_outputs(), AxisOutputs::default());
    }

    #[test]
    fn test_yaw_angle_loop_does_not_exist() {
        let config = FlightConfig::default();
        let mut cascade = CascadeController::new(&config);
        assert!(cascade.angle_pid(Axis::Yaw).is_none());
        assert!(!cascade.set_gains(Axis::Yaw, false, config.yaw_rate_pid));
    }
}
