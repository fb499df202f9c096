//! MNA assembly: turns the circuit graph into the `(G, C, b)` triple.
//!
//! Row/column assignment is fixed once per analysis: non-ground nodes in
//! graph insertion order, then branch variables (voltage sources and
//! inductors) in component insertion order. The builder never mutates the
//! graph; it only reads bindings and parameters.

use indexmap::IndexMap;
use nalgebra::DVector;
use voltaic_core::{CircuitGraph, Component, ComponentId, ComponentKind, MnaSystem, NodeId};
use voltaic_solver::{Error as SolverError, SystemStamper};

/// How independent sources are evaluated for a stamping pass.
#[derive(Debug, Clone, Copy)]
enum SourceEval {
    /// Operating-point value (pre-delay level of time-varying waveforms).
    Dc,
    /// Waveform value at a transient time point.
    At(f64),
}

/// Per-analysis view of the graph with fixed matrix indices.
#[derive(Debug)]
pub struct CircuitStamper<'a> {
    graph: &'a CircuitGraph,
    node_index: IndexMap<NodeId, usize>,
    branch_index: IndexMap<ComponentId, usize>,
    temperature: f64,
}

impl<'a> CircuitStamper<'a> {
    /// Build the index maps and run the pre-solve connectivity check.
    ///
    /// Any node with no conductive path to ground would make the matrix
    /// structurally singular, so it is rejected here — naming the node —
    /// rather than diagnosed from a failed factorization.
    pub fn new(graph: &'a CircuitGraph, temperature: f64) -> Result<Self, SolverError> {
        let ground = graph.ground();

        let reachable = match ground {
            Some(g) => graph.reachable_from(g),
            None => Default::default(),
        };
        for node in graph.nodes() {
            if !reachable.contains(&node.id()) {
                return Err(SolverError::SingularTopology { node: node.id() });
            }
        }

        let mut node_index = IndexMap::new();
        for node in graph.nodes() {
            if Some(node.id()) != ground {
                node_index.insert(node.id(), node_index.len());
            }
        }

        let mut branch_index = IndexMap::new();
        for comp in graph.components() {
            if comp.kind().num_branch_vars() > 0 {
                branch_index.insert(comp.id(), branch_index.len());
            }
        }

        Ok(Self {
            graph,
            node_index,
            branch_index,
            temperature,
        })
    }

    /// The graph this stamper reads.
    pub fn graph(&self) -> &CircuitGraph {
        self.graph
    }

    /// Matrix index of a node; `None` for ground.
    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.node_index.get(&node).copied()
    }

    /// Branch-variable index of a component, if it has one.
    pub fn branch_of(&self, component: ComponentId) -> Option<usize> {
        self.branch_index.get(&component).copied()
    }

    /// Number of node-voltage unknowns.
    pub fn num_nodes(&self) -> usize {
        self.node_index.len()
    }

    /// Number of branch-current unknowns.
    pub fn num_branches(&self) -> usize {
        self.branch_index.len()
    }

    /// Total unknown count.
    pub fn size(&self) -> usize {
        self.num_nodes() + self.num_branches()
    }

    /// Whether the graph is free of nonlinear elements.
    pub fn is_linear(&self) -> bool {
        !self.graph.has_nonlinear()
    }

    fn pin(&self, comp: &Component, pin: &str) -> Option<usize> {
        comp.binding(pin).and_then(|n| self.index_of(n))
    }

    fn guess_voltage(&self, guess: &DVector<f64>, index: Option<usize>) -> f64 {
        index.map(|i| guess[i]).unwrap_or(0.0)
    }

    fn stamp_system(&self, eval: SourceEval, guess: &DVector<f64>) -> MnaSystem {
        let mut mna = MnaSystem::new(self.num_nodes(), self.num_branches());

        for comp in self.graph.components() {
            match comp.kind() {
                ComponentKind::Resistor { .. } => {
                    let r = comp
                        .kind()
                        .resistance_at(self.temperature)
                        .expect("resistor kind")
                        .max(1e-12);
                    let i = self.pin(comp, "in");
                    let j = self.pin(comp, "out");
                    mna.stamp_conductance(i, j, 1.0 / r);
                }
                ComponentKind::Capacitor { capacitance } => {
                    let i = self.pin(comp, "in");
                    let j = self.pin(comp, "out");
                    mna.stamp_capacitance(i, j, *capacitance);
                }
                ComponentKind::Inductor { inductance } => {
                    let i = self.pin(comp, "in");
                    let j = self.pin(comp, "out");
                    let branch = self.branch_of(comp.id()).expect("inductor branch var");
                    mna.stamp_inductor(i, j, branch, *inductance);
                }
                ComponentKind::VoltageSource { waveform } => {
                    let value = match eval {
                        SourceEval::Dc => waveform.dc_value(),
                        SourceEval::At(t) => waveform.value_at(t),
                    };
                    let p = self.pin(comp, "+");
                    let n = self.pin(comp, "-");
                    let branch = self.branch_of(comp.id()).expect("source branch var");
                    mna.stamp_voltage_source(p, n, branch, value);
                }
                ComponentKind::CurrentSource { waveform } => {
                    let value = match eval {
                        SourceEval::Dc => waveform.dc_value(),
                        SourceEval::At(t) => waveform.value_at(t),
                    };
                    let p = self.pin(comp, "+");
                    let n = self.pin(comp, "-");
                    mna.stamp_current_source(p, n, value);
                }
                ComponentKind::Diode { model } => {
                    let a = self.pin(comp, "a");
                    let k = self.pin(comp, "k");
                    let vd = self.guess_voltage(guess, a) - self.guess_voltage(guess, k);
                    let (gd, ieq) = model.linearize(vd, self.temperature);
                    mna.stamp_conductance(a, k, gd);
                    mna.stamp_current_source(a, k, ieq);
                }
            }
        }

        mna
    }

    /// Small-signal stamp linearized at the DC operating point `op`.
    ///
    /// Nonlinear elements enter as their operating-point conductance only —
    /// no companion current sources. Sources keep their operating-point
    /// stimulus, so the zero-frequency solve of a resistive circuit equals
    /// its DC solution.
    pub fn stamp_small_signal(&self, op: &DVector<f64>) -> MnaSystem {
        let mut mna = MnaSystem::new(self.num_nodes(), self.num_branches());

        for comp in self.graph.components() {
            match comp.kind() {
                ComponentKind::Diode { model } => {
                    let a = self.pin(comp, "a");
                    let k = self.pin(comp, "k");
                    let vd = self.guess_voltage(op, a) - self.guess_voltage(op, k);
                    let (_, gd) = model.evaluate(vd, self.temperature);
                    mna.stamp_conductance(a, k, gd);
                }
                ComponentKind::Resistor { .. } => {
                    let r = comp
                        .kind()
                        .resistance_at(self.temperature)
                        .expect("resistor kind")
                        .max(1e-12);
                    mna.stamp_conductance(self.pin(comp, "in"), self.pin(comp, "out"), 1.0 / r);
                }
                ComponentKind::Capacitor { capacitance } => {
                    mna.stamp_capacitance(
                        self.pin(comp, "in"),
                        self.pin(comp, "out"),
                        *capacitance,
                    );
                }
                ComponentKind::Inductor { inductance } => {
                    let branch = self.branch_of(comp.id()).expect("inductor branch var");
                    mna.stamp_inductor(
                        self.pin(comp, "in"),
                        self.pin(comp, "out"),
                        branch,
                        *inductance,
                    );
                }
                ComponentKind::VoltageSource { waveform } => {
                    let branch = self.branch_of(comp.id()).expect("source branch var");
                    mna.stamp_voltage_source(
                        self.pin(comp, "+"),
                        self.pin(comp, "-"),
                        branch,
                        waveform.dc_value(),
                    );
                }
                ComponentKind::CurrentSource { waveform } => {
                    mna.stamp_current_source(
                        self.pin(comp, "+"),
                        self.pin(comp, "-"),
                        waveform.dc_value(),
                    );
                }
            }
        }

        mna
    }
}

/// Adapter stamping sources at their operating-point values.
pub struct DcStamper<'a>(pub &'a CircuitStamper<'a>);

impl SystemStamper for DcStamper<'_> {
    fn size(&self) -> usize {
        self.0.size()
    }

    fn num_nodes(&self) -> usize {
        self.0.num_nodes()
    }

    fn is_linear(&self) -> bool {
        self.0.is_linear()
    }

    fn stamp_at(&self, _time: f64, guess: &DVector<f64>) -> MnaSystem {
        self.0.stamp_system(SourceEval::Dc, guess)
    }
}

/// Adapter stamping sources at the requested transient time.
pub struct TransientStamper<'a>(pub &'a CircuitStamper<'a>);

impl SystemStamper for TransientStamper<'_> {
    fn size(&self) -> usize {
        self.0.size()
    }

    fn num_nodes(&self) -> usize {
        self.0.num_nodes()
    }

    fn is_linear(&self) -> bool {
        self.0.is_linear()
    }

    fn stamp_at(&self, time: f64, guess: &DVector<f64>) -> MnaSystem {
        self.0.stamp_system(SourceEval::At(time), guess)
    }
}
