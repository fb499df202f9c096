//! Numerical error types for voltaic-solver.
//!
//! Every variant carries the diagnostic context a caller needs to decide
//! whether to retry with different settings.

use thiserror::Error;
use voltaic_core::NodeId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("matrix is singular (zero or near-zero pivot)")]
    SingularMatrix,

    #[error("node {node} has no path to ground; the system matrix would be singular")]
    SingularTopology { node: NodeId },

    #[error("Newton-Raphson diverged after {iterations} iterations (last delta {last_delta:.3e})")]
    Diverged { iterations: usize, last_delta: f64 },

    #[error("iterative solver did not converge in {iterations} iterations (residual {residual:.3e})")]
    SolverNonconvergence { iterations: usize, residual: f64 },

    #[error("time step underflow at t = {time:.6e} s (step {step})")]
    TimeStepUnderflow { time: f64, step: usize },

    #[error("analysis cancelled at t = {time:.6e} s")]
    Cancelled { time: f64 },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
