//! Error surface of the simulation facade.

use thiserror::Error;
use voltaic_core::ValidationError;

use crate::settings::ConfigError;

#[derive(Debug, Error)]
pub enum Error {
    /// Structural mistake while building the graph (unknown pin, duplicate
    /// binding, ground conflicts).
    #[error(transparent)]
    Structure(#[from] voltaic_core::Error),

    /// Netlist validation failed; nothing was solved.
    #[error("invalid netlist: {}", format_errors(.errors))]
    Invalid { errors: Vec<ValidationError> },

    /// Two components share a name.
    #[error("duplicate component name: {name}")]
    DuplicateComponentName { name: String },

    /// A wire endpoint names a component the netlist does not contain.
    #[error("wire references unknown component: {name}")]
    UnknownComponent { name: String },

    /// Rejected settings or analysis parameters.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Numerical failure from the solver layer, with diagnostic context.
    #[error(transparent)]
    Numerical(#[from] voltaic_solver::Error),

    /// AC analysis was invoked before any DC operating point was computed.
    #[error("AC analysis requires a DC operating point; run DC analysis first")]
    MissingOperatingPoint,
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, Error>;
