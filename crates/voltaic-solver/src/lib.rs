//! Linear and nonlinear solvers for Voltaic.
//!
//! This crate provides:
//! - Linear system solvers behind one interface: direct LU factorization and
//!   restarted GMRES over compressed sparse rows, real and complex
//! - Newton-Raphson iteration for nonlinear circuits
//! - DC operating point analysis
//! - Transient time-domain analysis (backward Euler)
//! - AC small-signal frequency-domain analysis

pub mod ac;
pub mod cancel;
pub mod dc;
pub mod error;
pub mod gmres;
pub mod linear;
pub mod newton;
pub mod operator;
pub mod solver_select;
pub mod transient;

pub use ac::{AcPoint, AcResult, decade_sweep, solve_ac};
pub use cancel::CancelToken;
pub use dc::{ConvergenceStatus, DcSolution, solve_dc};
pub use error::{Error, Result};
pub use gmres::{GmresConfig, GmresResult, solve_gmres_complex, solve_gmres_real};
pub use newton::{AssembledSystem, ConvergenceCriteria, NewtonOutcome, SystemStamper, solve_newton};
pub use operator::{ComplexOperator, CsrComplexMatrix, CsrMatrix, RealOperator};
pub use solver_select::{SolverConfig, SolverStrategy, solve_complex_system, solve_real_system};
pub use transient::{TimePoint, TransientParams, TransientResult, solve_transient};
