//! Simulation facade for Voltaic.
//!
//! Consumes the structural netlist the schematic editor produces — an
//! ordered list of components and pin-to-pin wires — and exposes the three
//! analyses:
//!
//! - [`build_netlist`] resolves wire connectivity into a validated
//!   [`CircuitGraph`](voltaic_core::CircuitGraph)
//! - [`Simulator::run_dc`] finds the operating point
//! - [`Simulator::run_transient`] time-steps from the operating point
//! - [`Simulator::run_ac`] sweeps the small-signal response
//!
//! A failed analysis returns a typed error with diagnostic context; a
//! returned result is always fully valid.

pub mod error;
pub mod netlist;
pub mod results;
pub mod settings;
pub mod simulator;
pub mod stamp;

pub use error::{Error, Result};
pub use netlist::{ComponentSpec, PinRef, Wire, build_netlist};
pub use results::{AcFrequencyPoint, AcResult, ComponentFigures, DcResult, TransientResult};
pub use settings::{ConfigError, Settings};
pub use simulator::Simulator;
pub use stamp::{CircuitStamper, DcStamper, TransientStamper};

pub use voltaic_core::{CircuitGraph, ComponentKind, DiodeModel, NodeId, Waveform};
pub use voltaic_solver::{CancelToken, ConvergenceStatus, TransientParams};
