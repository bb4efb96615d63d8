use crate::error::{Error, Result};
use crate::solvers::{Discrete, Euler, RungeKutta4, Stepper};
use crate::traits::Scalar;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Euler,
    RungeKutta4,
    Discrete,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegratorSettings {
    pub method: Method,
    pub step_size: f64,
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        Self {
            method: Method::RungeKutta4,
            step_size: 1e-2,
        }
    }
}

impl IntegratorSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(Error::configuration(format!(
                "step_size must be finite and positive, got {}",
                self.step_size
            )));
        }
        Ok(())
    }

    pub fn build<T: Scalar>(&self) -> Result<Stepper<T>> {
        self.validate()?;
        let step = T::from_f64(self.step_size).ok_or_else(|| {
            Error::configuration(format!(
                "step_size {} is not representable",
                self.step_size
            ))
        })?;
        Ok(match self.method {
            Method::Euler => Stepper::Euler(Euler::new(step)),
            Method::RungeKutta4 => Stepper::RungeKutta4(RungeKutta4::new(step)),
            Method::Discrete => Stepper::Discrete(Discrete::new(step)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{IntegratorSettings, Method};
    use crate::solvers::Stepper;
    use crate::traits::Integrator;

    #[test]
    fn default_is_rk4_with_centisecond_step() {
        let stepper = IntegratorSettings::default().build::<f64>().unwrap();
        assert!(matches!(stepper, Stepper::RungeKutta4(_)));
        assert_eq!(stepper.step_size(), 1e-2);
    }

    #[test]
    fn build_rejects_non_positive_or_non_finite_steps() {
        for step_size in [0.0, -1e-3, f64::NAN, f64::INFINITY] {
            let settings = IntegratorSettings {
                method: Method::Euler,
                step_size,
            };
            let err = settings.build::<f64>().unwrap_err();
            assert!(err.to_string().contains("step_size"), "{err}");
        }
    }

    #[test]
    fn settings_deserialize_from_json() {
        let settings: IntegratorSettings =
            serde_json::from_str(r#"{ "method": "discrete", "step_size": 1.0 }"#).unwrap();
        assert_eq!(settings.method, Method::Discrete);
        let stepper = settings.build::<f32>().unwrap();
        assert!(matches!(stepper, Stepper::Discrete(_)));
        assert_eq!(stepper.step_size(), 1.0_f32);
    }
}
