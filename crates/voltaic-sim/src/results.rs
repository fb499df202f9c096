//! Results post-processing: branch currents, voltage drops, power.
//!
//! The solved unknown vector holds node voltages and the branch currents of
//! voltage sources and inductors. Everything else a caller wants — resistor
//! and diode currents, per-component drops, dissipated power — is derived
//! here, after the solve, from the immutable solution.

use std::fmt;

use indexmap::IndexMap;
use nalgebra::DVector;
use num_complex::Complex64;
use voltaic_core::units::format_quantity;
use voltaic_core::{ComponentKind, NodeId};
use voltaic_solver::{ConvergenceStatus, DcSolution};

use crate::stamp::CircuitStamper;

/// Voltages below this magnitude are numerical noise and display as zero.
const DISPLAY_TOLERANCE: f64 = 1e-12;

/// Per-component derived quantities.
#[derive(Debug, Clone)]
pub struct ComponentFigures {
    /// Current through the component (A). Direction: first pin to second
    /// pin; for sources, the MNA branch current.
    pub current: f64,
    /// Voltage across the component, first pin minus second pin (V).
    pub voltage_drop: f64,
    /// Power absorbed (W), passive sign convention: negative means the
    /// component delivers power.
    pub power: f64,
}

/// Solved operating point with derived quantities.
#[derive(Debug, Clone)]
pub struct DcResult {
    /// Voltage of every node, ground included (0 V).
    pub node_voltages: IndexMap<NodeId, f64>,
    /// Derived figures per component name, in netlist order.
    pub components: IndexMap<String, ComponentFigures>,
    /// How the Newton loop ended.
    pub status: ConvergenceStatus,
}

impl DcResult {
    /// Voltage at a node.
    pub fn voltage(&self, node: NodeId) -> Option<f64> {
        self.node_voltages.get(&node).copied()
    }

    /// Current through a named component.
    pub fn current(&self, component: &str) -> Option<f64> {
        self.components.get(component).map(|f| f.current)
    }

    /// Power absorbed by a named component.
    pub fn power(&self, component: &str) -> Option<f64> {
        self.components.get(component).map(|f| f.power)
    }

    /// Newton iterations performed.
    pub fn iterations(&self) -> usize {
        self.status.iterations()
    }

    /// Sum of absorbed power over all components (≈ 0 for a consistent
    /// solution).
    pub fn total_power(&self) -> f64 {
        self.components.values().map(|f| f.power).sum()
    }
}

impl fmt::Display for DcResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Node voltages:")?;
        for (node, &v) in &self.node_voltages {
            writeln!(f, "  {node}: {}", format_quantity(v, "V"))?;
        }
        writeln!(f, "Component currents:")?;
        for (name, figures) in &self.components {
            writeln!(f, "  {name}: {}", format_quantity(figures.current, "A"))?;
        }
        Ok(())
    }
}

/// Transient solution: one derived result per time point.
#[derive(Debug, Clone)]
pub struct TransientResult {
    /// `(time, result)` pairs, starting at the t = 0 operating point.
    pub points: Vec<(f64, DcResult)>,
}

impl TransientResult {
    /// `(time, voltage)` waveform of one node.
    pub fn voltage_waveform(&self, node: NodeId) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|(t, r)| (*t, r.voltage(node).unwrap_or(0.0)))
            .collect()
    }

    /// `(time, current)` waveform of one component.
    pub fn current_waveform(&self, component: &str) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|(t, r)| (*t, r.current(component).unwrap_or(0.0)))
            .collect()
    }

    /// The final time point.
    pub fn last(&self) -> &(f64, DcResult) {
        self.points.last().expect("at least the t=0 point")
    }
}

/// AC sweep solution: complex node voltages per frequency.
#[derive(Debug, Clone)]
pub struct AcResult {
    /// One voltage map per requested frequency, in request order.
    pub points: Vec<AcFrequencyPoint>,
}

/// Complex node voltages at one frequency.
#[derive(Debug, Clone)]
pub struct AcFrequencyPoint {
    pub frequency: f64,
    pub node_voltages: IndexMap<NodeId, Complex64>,
}

impl AcResult {
    /// `(frequency, magnitude in dB)` response of one node.
    pub fn magnitude_db(&self, node: NodeId) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|p| {
                let mag = p
                    .node_voltages
                    .get(&node)
                    .map(|v| v.norm())
                    .unwrap_or(0.0);
                (p.frequency, 20.0 * mag.log10())
            })
            .collect()
    }

    /// `(frequency, phase in degrees)` response of one node.
    pub fn phase_deg(&self, node: NodeId) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|p| {
                let phase = p
                    .node_voltages
                    .get(&node)
                    .map(|v| v.arg().to_degrees())
                    .unwrap_or(0.0);
                (p.frequency, phase)
            })
            .collect()
    }
}

/// Derive a [`DcResult`] from a solved vector.
///
/// `time` evaluates time-varying sources; `prev` is the previous transient
/// point and step, used to recover capacitor currents from the voltage
/// slope (at DC a capacitor carries no current).
pub(crate) fn derive_dc_result(
    stamper: &CircuitStamper<'_>,
    solution: &DcSolution,
    status: ConvergenceStatus,
    time: Option<f64>,
    prev: Option<(&DVector<f64>, f64)>,
    temperature: f64,
) -> DcResult {
    let graph = stamper.graph();

    let mut node_voltages = IndexMap::new();
    for node in graph.nodes() {
        let v = snap(solution.voltage(stamper.index_of(node.id())));
        node_voltages.insert(node.id(), v);
    }

    let voltage_of = |sol: &DVector<f64>, node: Option<usize>| -> f64 {
        node.map(|i| sol[i]).unwrap_or(0.0)
    };

    let mut components = IndexMap::new();
    for comp in graph.components() {
        let pins = comp.pin_names();
        let first = comp.binding(pins[0]).and_then(|n| stamper.index_of(n));
        let second = comp.binding(pins[1]).and_then(|n| stamper.index_of(n));
        let drop = solution.voltage(first) - solution.voltage(second);

        let current = match comp.kind() {
            ComponentKind::Resistor { .. } => {
                let r = comp
                    .kind()
                    .resistance_at(temperature)
                    .expect("resistor kind")
                    .max(1e-12);
                drop / r
            }
            ComponentKind::Capacitor { capacitance } => match prev {
                Some((prev_solution, h)) => {
                    let prev_drop = voltage_of(prev_solution, first)
                        - voltage_of(prev_solution, second);
                    capacitance * (drop - prev_drop) / h
                }
                None => 0.0,
            },
            ComponentKind::Inductor { .. } | ComponentKind::VoltageSource { .. } => {
                let branch = stamper.branch_of(comp.id()).expect("branch var");
                solution.branch_current(branch)
            }
            ComponentKind::CurrentSource { waveform } => match time {
                Some(t) => waveform.value_at(t),
                None => waveform.dc_value(),
            },
            ComponentKind::Diode { model } => model.evaluate(drop, temperature).0,
        };

        components.insert(
            comp.name().to_string(),
            ComponentFigures {
                current: snap(current),
                voltage_drop: snap(drop),
                power: snap(drop * current),
            },
        );
    }

    DcResult {
        node_voltages,
        components,
        status,
    }
}

fn snap(value: f64) -> f64 {
    if value.abs() < DISPLAY_TOLERANCE {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stamp::{CircuitStamper, DcStamper};
    use voltaic_core::{CircuitGraph, ComponentKind};
    use voltaic_solver::{ConvergenceCriteria, SolverConfig, solve_dc};

    fn divider() -> CircuitGraph {
        let mut g = CircuitGraph::new();
        let gnd = g.add_node();
        let n1 = g.add_node();
        let n2 = g.add_node();
        let v1 = g.add_component("V1", ComponentKind::dc_voltage(10.0));
        g.connect(v1, "+", n1).unwrap();
        g.connect(v1, "-", gnd).unwrap();
        let r1 = g.add_component("R1", ComponentKind::resistor(1000.0));
        g.connect(r1, "in", n1).unwrap();
        g.connect(r1, "out", n2).unwrap();
        let r2 = g.add_component("R2", ComponentKind::resistor(1000.0));
        g.connect(r2, "in", n2).unwrap();
        g.connect(r2, "out", gnd).unwrap();
        g.set_ground(gnd).unwrap();
        g
    }

    #[test]
    fn test_derived_currents_and_power() {
        let g = divider();
        let stamper = CircuitStamper::new(&g, 300.15).unwrap();
        let sol = solve_dc(
            &DcStamper(&stamper),
            &ConvergenceCriteria::default(),
            &SolverConfig::default(),
            None,
        )
        .unwrap();
        let status = ConvergenceStatus::Converged {
            iterations: sol.iterations,
        };
        let result = derive_dc_result(&stamper, &sol, status, None, None, 300.15);

        // 10 V over 2 kΩ: 5 mA through each resistor
        assert!((result.current("R1").unwrap() - 0.005).abs() < 1e-12);
        assert!((result.current("R2").unwrap() - 0.005).abs() < 1e-12);

        // Resistors dissipate 25 mW each; the source delivers 50 mW
        assert!((result.power("R1").unwrap() - 0.025).abs() < 1e-12);
        assert!((result.power("V1").unwrap() + 0.050).abs() < 1e-12);

        // Power balance
        assert!(result.total_power().abs() < 1e-12);
    }

    #[test]
    fn test_display_uses_engineering_notation() {
        let g = divider();
        let stamper = CircuitStamper::new(&g, 300.15).unwrap();
        let sol = solve_dc(
            &DcStamper(&stamper),
            &ConvergenceCriteria::default(),
            &SolverConfig::default(),
            None,
        )
        .unwrap();
        let status = ConvergenceStatus::Converged {
            iterations: sol.iterations,
        };
        let result = derive_dc_result(&stamper, &sol, status, None, None, 300.15);

        let text = result.to_string();
        assert!(text.contains("10.0000 V"), "{text}");
        assert!(text.contains("5.0000 mA"), "{text}");
    }
}
