//! Core circuit representation for Voltaic.
//!
//! This crate provides the netlist graph model (nodes, components, pin
//! bindings, ground reference), the typed electrical models for each
//! component kind, and the MNA system triple `(G, C, b)` that the analysis
//! engines assemble and solve.

pub mod component;
pub mod error;
pub mod graph;
pub mod mna;
pub mod node;
pub mod units;
pub mod waveform;

pub use component::{Component, ComponentId, ComponentKind, DiodeModel};
pub use error::{Error, Result};
pub use graph::{CircuitGraph, ValidationError, ValidationReport, ValidationWarning};
pub use mna::MnaSystem;
pub use node::{Node, NodeId};
pub use waveform::Waveform;
