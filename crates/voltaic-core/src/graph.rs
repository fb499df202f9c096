//! Circuit graph: nodes, components, pin bindings, ground reference.
//!
//! Nodes and components are stored in insertion order and enumerated in that
//! order everywhere, so matrix row/column assignment is reproducible
//! run-to-run.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use crate::component::{Component, ComponentId, ComponentKind};
use crate::error::{Error, Result};
use crate::node::{Node, NodeId};

/// Structural problem that makes the netlist unsolvable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("pin {pin:?} of {component} is not bound to any node")]
    UnboundPin { component: String, pin: String },

    #[error("no ground node is set")]
    MissingGround,
}

/// Structural oddity that does not block solving by itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationWarning {
    #[error("node {node} has no conductive path to ground")]
    FloatingNode { node: NodeId },
}

/// Outcome of [`CircuitGraph::validate`].
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    /// Whether the netlist is structurally solvable.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The canonical structural representation of a circuit.
#[derive(Debug, Default)]
pub struct CircuitGraph {
    nodes: IndexMap<NodeId, Node>,
    components: IndexMap<ComponentId, Component>,
    ground: Option<NodeId>,
    next_node_id: u32,
    next_component_id: u32,
}

impl CircuitGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its ID.
    pub fn add_node(&mut self) -> NodeId {
        let id = NodeId::new(self.next_node_id);
        self.next_node_id += 1;
        self.nodes.insert(id, Node::new(id));
        id
    }

    /// Add a component instance, returning its ID. Pins start unbound.
    pub fn add_component(&mut self, name: impl Into<String>, kind: ComponentKind) -> ComponentId {
        let id = ComponentId::new(self.next_component_id);
        self.next_component_id += 1;
        self.components.insert(id, Component::new(id, name, kind));
        id
    }

    /// Bind a component pin to a node.
    ///
    /// Fails with [`Error::UnknownPin`] if the component's kind does not
    /// declare `pin`, and with [`Error::DuplicateBinding`] if the pin is
    /// already bound.
    pub fn connect(&mut self, component: ComponentId, pin: &str, node: NodeId) -> Result<()> {
        if !self.nodes.contains_key(&node) {
            return Err(Error::NodeNotFound(node));
        }
        let comp = self
            .components
            .get_mut(&component)
            .ok_or(Error::ComponentNotFound(component))?;

        let canonical = comp
            .pin_names()
            .iter()
            .copied()
            .find(|p| *p == pin)
            .ok_or_else(|| Error::UnknownPin {
                component: comp.name().to_string(),
                pin: pin.to_string(),
            })?;

        if let Some(existing) = comp.binding(canonical) {
            return Err(Error::DuplicateBinding {
                component: comp.name().to_string(),
                pin: pin.to_string(),
                node: existing,
            });
        }

        comp.bind(canonical, node);
        self.nodes
            .get_mut(&node)
            .expect("node checked above")
            .attach(component, canonical);
        Ok(())
    }

    /// Designate the ground reference node (fixed at 0 V).
    ///
    /// Fails with [`Error::GroundAlreadySet`] if a different ground already
    /// exists. Setting the same node again is a no-op.
    pub fn set_ground(&mut self, node: NodeId) -> Result<()> {
        if !self.nodes.contains_key(&node) {
            return Err(Error::NodeNotFound(node));
        }
        match self.ground {
            Some(existing) if existing != node => Err(Error::GroundAlreadySet { existing }),
            _ => {
                self.ground = Some(node);
                Ok(())
            }
        }
    }

    /// The ground node, if set.
    pub fn ground(&self) -> Option<NodeId> {
        self.ground
    }

    /// Whether a node is the ground reference.
    pub fn is_ground(&self, node: NodeId) -> bool {
        self.ground == Some(node)
    }

    /// The most-connected node, as a ground candidate for circuits drawn
    /// without an explicit ground symbol. Pure query; never mutates.
    pub fn suggest_ground(&self) -> Option<NodeId> {
        self.nodes
            .values()
            .max_by_key(|n| n.degree())
            .map(|n| n.id())
    }

    /// Get a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a component by ID.
    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id)
    }

    /// Look up a component by name.
    pub fn component_by_name(&self, name: &str) -> Option<&Component> {
        self.components.values().find(|c| c.name() == name)
    }

    /// Iterate over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterate over all components in insertion order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Number of nodes, including ground.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of components.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Whether any component requires Newton-Raphson iteration.
    pub fn has_nonlinear(&self) -> bool {
        self.components.values().any(|c| c.kind().is_nonlinear())
    }

    /// Check the graph for structural problems.
    ///
    /// Errors: any unbound pin; no ground set while more than one node
    /// exists. Warnings: each node with no conductive path to ground.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        for comp in self.components.values() {
            for pin in comp.unbound_pins() {
                report.errors.push(ValidationError::UnboundPin {
                    component: comp.name().to_string(),
                    pin: pin.to_string(),
                });
            }
        }

        match self.ground {
            None => {
                if self.nodes.len() > 1 {
                    report.errors.push(ValidationError::MissingGround);
                }
            }
            Some(ground) => {
                let reachable = self.reachable_from(ground);
                for node in self.nodes.keys() {
                    if !reachable.contains(node) {
                        report
                            .warnings
                            .push(ValidationWarning::FloatingNode { node: *node });
                    }
                }
            }
        }

        report
    }

    /// Nodes reachable from `start` through component connectivity, in
    /// breadth-first order. Every pair of bound nodes on one component is
    /// treated as adjacent.
    pub fn reachable_from(&self, start: NodeId) -> IndexSet<NodeId> {
        let mut seen = IndexSet::new();
        if !self.nodes.contains_key(&start) {
            return seen;
        }
        seen.insert(start);
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            let Some(n) = self.nodes.get(&node) else {
                continue;
            };
            for &(comp_id, _) in n.pins() {
                let Some(comp) = self.components.get(&comp_id) else {
                    continue;
                };
                for other in comp.bound_nodes() {
                    if seen.insert(other) {
                        queue.push_back(other);
                    }
                }
            }
        }

        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::DiodeModel;

    fn divider() -> (CircuitGraph, NodeId, NodeId, NodeId) {
        // V1 from n1 to gnd, R1 n1→n2, R2 n2→gnd
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
        (g, gnd, n1, n2)
    }

    #[test]
    fn test_valid_divider() {
        let (g, ..) = divider();
        let report = g.validate();
        assert!(report.is_ok());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_unknown_pin() {
        let mut g = CircuitGraph::new();
        let n = g.add_node();
        let r = g.add_component("R1", ComponentKind::resistor(1.0));
        let err = g.connect(r, "anode", n).unwrap_err();
        assert!(matches!(err, Error::UnknownPin { .. }));
    }

    #[test]
    fn test_duplicate_binding() {
        let mut g = CircuitGraph::new();
        let n1 = g.add_node();
        let n2 = g.add_node();
        let r = g.add_component("R1", ComponentKind::resistor(1.0));
        g.connect(r, "in", n1).unwrap();
        let err = g.connect(r, "in", n2).unwrap_err();
        assert_eq!(
            err,
            Error::DuplicateBinding {
                component: "R1".into(),
                pin: "in".into(),
                node: n1,
            }
        );
    }

    #[test]
    fn test_ground_already_set() {
        let mut g = CircuitGraph::new();
        let n1 = g.add_node();
        let n2 = g.add_node();
        g.set_ground(n1).unwrap();
        g.set_ground(n1).unwrap(); // same node: no-op
        let err = g.set_ground(n2).unwrap_err();
        assert_eq!(err, Error::GroundAlreadySet { existing: n1 });
    }

    #[test]
    fn test_unbound_pin_is_error() {
        let mut g = CircuitGraph::new();
        let gnd = g.add_node();
        let n1 = g.add_node();
        g.set_ground(gnd).unwrap();
        let r = g.add_component("R1", ComponentKind::resistor(1.0));
        g.connect(r, "in", n1).unwrap();

        let report = g.validate();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(
            report.errors[0],
            ValidationError::UnboundPin {
                component: "R1".into(),
                pin: "out".into(),
            }
        );
    }

    #[test]
    fn test_missing_ground() {
        let mut g = CircuitGraph::new();
        g.add_node();
        g.add_node();
        let report = g.validate();
        assert!(report.errors.contains(&ValidationError::MissingGround));
    }

    #[test]
    fn test_floating_node_warning_names_node() {
        let (mut g, ..) = divider();
        // An orphan node with a diode hanging between two new nodes,
        // disconnected from the grounded subgraph.
        let n3 = g.add_node();
        let n4 = g.add_node();
        let d = g.add_component(
            "D1",
            ComponentKind::Diode {
                model: DiodeModel::default(),
            },
        );
        g.connect(d, "a", n3).unwrap();
        g.connect(d, "k", n4).unwrap();

        let report = g.validate();
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings.len(), 2);
        assert!(report
            .warnings
            .contains(&ValidationWarning::FloatingNode { node: n3 }));
        assert!(report
            .warnings
            .contains(&ValidationWarning::FloatingNode { node: n4 }));
    }

    #[test]
    fn test_suggest_ground_prefers_most_connected() {
        let (g, gnd, ..) = divider();
        // gnd has V1.-, R2.out attached; n1 and n2 also have two each, so the
        // max_by_key tie-break keeps the last maximum in insertion order.
        let suggested = g.suggest_ground().unwrap();
        assert!(g.node(suggested).unwrap().degree() >= g.node(gnd).unwrap().degree());
    }

    #[test]
    fn test_deterministic_iteration_order() {
        let (g, ..) = divider();
        let names: Vec<_> = g.components().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["V1", "R1", "R2"]);
        let ids: Vec<_> = g.nodes().map(|n| n.id().as_u32()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
