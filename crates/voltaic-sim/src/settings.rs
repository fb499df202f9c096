//! Simulation settings, validated before any solve.

use thiserror::Error;
use voltaic_solver::{ConvergenceCriteria, SolverConfig, SolverStrategy};

/// Rejected configuration. Raised at construction/validation time, never
/// mid-analysis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive finite number, got {value}")]
    InvalidTolerance { name: &'static str, value: f64 },

    #[error("max_iterations must be at least 1")]
    InvalidIterationBudget,

    #[error("temperature must be positive (Kelvin), got {kelvin}")]
    InvalidTemperature { kelvin: f64 },

    #[error("time step must be positive and finite, got {dt}")]
    InvalidTimeStep { dt: f64 },

    #[error("end time must be positive, finite, and no smaller than the step, got {t_end}")]
    InvalidEndTime { t_end: f64 },
}

/// Analysis configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Newton-Raphson iteration budget.
    pub max_iterations: usize,
    /// Absolute convergence tolerance on the solution step norm.
    pub abstol: f64,
    /// Relative convergence tolerance on the solution step norm.
    pub reltol: f64,
    /// Select the iterative sparse backend instead of size-based selection.
    pub use_sparse: bool,
    /// Operating temperature (K) for temperature-dependent models.
    pub temperature: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            abstol: 1e-9,
            reltol: 1e-6,
            use_sparse: false,
            temperature: 300.15,
        }
    }
}

impl Settings {
    /// Check every field; called once when a simulator is constructed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidIterationBudget);
        }
        for (name, value) in [("abstol", self.abstol), ("reltol", self.reltol)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(ConfigError::InvalidTemperature {
                kelvin: self.temperature,
            });
        }
        Ok(())
    }

    pub(crate) fn criteria(&self) -> ConvergenceCriteria {
        ConvergenceCriteria {
            abstol: self.abstol,
            reltol: self.reltol,
            max_iterations: self.max_iterations,
        }
    }

    pub(crate) fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            strategy: if self.use_sparse {
                SolverStrategy::IterativeGmres
            } else {
                SolverStrategy::Auto
            },
            ..Default::default()
        }
    }
}

/// Check transient timing parameters.
pub(crate) fn validate_timing(t_end: f64, dt: f64) -> Result<(), ConfigError> {
    if !(dt.is_finite() && dt > 0.0) {
        return Err(ConfigError::InvalidTimeStep { dt });
    }
    if !(t_end.is_finite() && t_end > 0.0) || t_end < dt {
        return Err(ConfigError::InvalidEndTime { t_end });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_bad_tolerance_rejected() {
        let s = Settings {
            abstol: -1.0,
            ..Default::default()
        };
        assert_eq!(
            s.validate(),
            Err(ConfigError::InvalidTolerance {
                name: "abstol",
                value: -1.0
            })
        );

        let s = Settings {
            reltol: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            s.validate(),
            Err(ConfigError::InvalidTolerance { name: "reltol", .. })
        ));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let s = Settings {
            max_iterations: 0,
            ..Default::default()
        };
        assert_eq!(s.validate(), Err(ConfigError::InvalidIterationBudget));
    }

    #[test]
    fn test_negative_time_step_rejected() {
        assert!(matches!(
            validate_timing(1e-3, -1e-6),
            Err(ConfigError::InvalidTimeStep { .. })
        ));
        assert!(matches!(
            validate_timing(-1.0, 1e-6),
            Err(ConfigError::InvalidEndTime { .. })
        ));
        assert!(validate_timing(1e-3, 1e-6).is_ok());
    }

    #[test]
    fn test_use_sparse_selects_gmres() {
        let s = Settings {
            use_sparse: true,
            ..Default::default()
        };
        assert_eq!(s.solver_config().strategy, SolverStrategy::IterativeGmres);
        assert_eq!(
            Settings::default().solver_config().strategy,
            SolverStrategy::Auto
        );
    }
}
