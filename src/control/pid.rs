//! Одноосевой PID контроллер с anti-windup и фильтрацией
//! дифференциальной составляющей.
//!
//! Контроллер ничего не знает о семантике полета: ось, контур и единицы
//! измерения определяются вызывающим кодом (см. [`cascade`](super::cascade)).

use crate::data::PidConfig;
use crate::utils::math::constrain;

/// Внутреннее состояние PID контроллера.
/// Принадлежит исключительно своему контроллеру; обнуляется при каждом
/// arm и смене режима полета (безударный рестарт).
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidState {
    pub setpoint: f32,
    pub error: f32,
    pub prev_error: f32,
    /// Интегральный накопитель (ограничен i_limit)
    pub integral: f32,
    /// Отфильтрованная производная ошибки
    pub derivative: f32,
    pub output: f32,
    /// Последние вклады составляющих - для телеметрии
    pub p_term: f32,
    pub i_term: f32,
    pub d_term: f32,
}

/// PID контроллер одной оси
#[derive(Clone, Copy, Debug)]
pub struct PidController {
    config: PidConfig,
    state: PidState,
}

impl PidController {
    pub fn new(config: PidConfig) -> Self {
        Self {
            config,
            state: PidState::default(),
        }
    }

    /// Один шаг регулирования.
    ///
    /// `dt_s` - время с прошлого шага в секундах. При `dt_s <= 0`
    /// интегральная и дифференциальная составляющие не обновляются
    /// (деление на ноль исключено), пропорциональная пересчитывается
    /// от свежей ошибки, выход как всегда ограничен.
    pub fn update(&mut self, setpoint: f32, measurement: f32, dt_s: f32) -> f32 {
        let error = setpoint - measurement;

        if dt_s > 0.0 {
            // Интегральная составляющая с anti-windup
            self.state.integral = constrain(
                self.state.integral + error * dt_s,
                -self.config.i_limit,
                self.config.i_limit,
            );

            // Производная ошибки через ФНЧ первого порядка:
            // d[n] = α * d_raw + (1 - α) * d[n-1]
            let d_raw = (error - self.state.prev_error) / dt_s;
            let alpha = constrain(self.config.d_filter_alpha, 0.0, 1.0);
            self.state.derivative = alpha * d_raw + (1.0 - alpha) * self.state.derivative;
        }

        self.state.p_term = self.config.kp * error;
        self.state.i_term = self.config.ki * self.state.integral;
        self.state.d_term = self.config.kd * self.state.derivative;

        let output = constrain(
            self.state.p_term + self.state.i_term + self.state.d_term,
            -self.config.output_limit,
            self.config.output_limit,
        );

        self.state.setpoint = setpoint;
        self.state.error = error;
        self.state.prev_error = error;
        self.state.output = output;

        output
    }

    /// Сброс состояния (безударный рестарт при arm или смене режима)
    pub fn reset(&mut self) {
        self.state = PidState::default();
    }

    /// Замена коэффициентов на лету; накопленное состояние сохраняется,
    /// новый i_limit применится на следующем шаге
    pub fn set_config(&mut self, config: PidConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &PidConfig {
        &self.config
    }

    pub fn state(&self) -> &PidState {
        &self.state
    }

    /// Последний рассчитанный выход без пересчета
    pub fn output(&self) -> f32 {
        self.state.output
    }
}

// Тесты для отладки на хосте
#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PidConfig {
        PidConfig {
            kp: 1.0,
            ki: 1.0,
            kd: 0.1,
            i_limit: 10.0,
            output_limit: 400.0,
            d_filter_alpha: 1.0,
        }
    }

    #[test]
    fn test_output_and_integral_clamped() {
        let mut pid = PidController::new(PidConfig {
            kp: 1000.0,
            ki: 1000.0,
            ..config()
        });

        for _ in 0..500 {
            let out = pid.update(100.0, 0.0, 0.01);
            assert!(out.abs() <= 400.0);
            assert!(pid.state().integral.abs() <= 10.0);
        }
        // При большой постоянной ошибке выход упирается в ограничение
        assert_eq!(pid.output(), 400.0);
    }

    #[test]
    fn test_zero_error_keeps_zero_state() {
        let mut pid = PidController::new(config());

        for _ in 0..1000 {
            let out = pid.update(0.0, 0.0, 0.01);
            assert_eq!(out, 0.0);
        }
        assert_eq!(pid.state().integral, 0.0);
        assert_eq!(pid.state().derivative, 0.0);
    }

    #[test]
    fn test_proportional_term() {
        let mut pid = PidController::new(PidConfig {
            ki: 0.0,
            kd: 0.0,
            kp: 2.0,
            ..config()
        });

        let out = pid.update(10.0, 4.0, 0.01);
        assert!((out - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_dt_skips_integral_and_derivative() {
        let mut pid = PidController::new(config());

        pid.update(5.0, 0.0, 0.01);
        let integral = pid.state().integral;
        let derivative = pid.state().derivative;

        // dt = 0: накопители заморожены, но выход определен
        let out = pid.update(7.0, 0.0, 0.0);
        assert_eq!(pid.state().integral, integral);
        assert_eq!(pid.state().derivative, derivative);
        assert!(out.is_finite());
        // Пропорциональная часть пересчитана от свежей ошибки
        assert_eq!(pid.state().error, 7.0);
    }

    #[test]
    fn test_derivative_filter_smooths_step() {
        let mut filtered = PidController::new(PidConfig {
            d_filter_alpha: 0.2,
            ..config()
        });
        let mut raw = PidController::new(PidConfig {
            d_filter_alpha: 1.0,
            ..config()
        });

        filtered.update(0.0, 0.0, 0.01);
        raw.update(0.0, 0.0, 0.01);
        // Скачок ошибки: фильтрованная производная должна быть меньше сырой
        filtered.update(1.0, 0.0, 0.01);
        raw.update(1.0, 0.0, 0.01);
        assert!(filtered.state().derivative.abs() < raw.state().derivative.abs());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut pid = PidController::new(config());
        pid.update(3.0, 1.0, 0.01);
        assert!(pid.state().integral != 0.0);

        pid.reset();
        assert_eq!(pid.state().integral, 0.0);
        assert_eq!(pid.state().prev_error, 0.0);
        assert_eq!(pid.output(), 0.0);
    }
}
