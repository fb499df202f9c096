//! Structural netlist construction.
//!
//! The schematic editor hands over components and wires; pins joined
//! transitively by wires collapse into one node. This module resolves that
//! equivalence relation, builds the circuit graph, and validates it before
//! any analysis can run.

use indexmap::IndexMap;
use voltaic_core::{CircuitGraph, ComponentKind};

use crate::error::{Error, Result};

/// A component declaration from the editor.
#[derive(Debug, Clone)]
pub struct ComponentSpec {
    pub name: String,
    pub kind: ComponentKind,
}

impl ComponentSpec {
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// One end of a wire: a named component pin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PinRef {
    pub component: String,
    pub pin: String,
}

impl PinRef {
    pub fn new(component: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            pin: pin.into(),
        }
    }
}

/// A wire joining two component pins.
#[derive(Debug, Clone)]
pub struct Wire {
    pub a: PinRef,
    pub b: PinRef,
}

impl Wire {
    pub fn new(a: PinRef, b: PinRef) -> Self {
        Self { a, b }
    }

    /// Convenience constructor from `(component, pin)` pairs.
    pub fn between(
        comp_a: impl Into<String>,
        pin_a: impl Into<String>,
        comp_b: impl Into<String>,
        pin_b: impl Into<String>,
    ) -> Self {
        Self {
            a: PinRef::new(comp_a, pin_a),
            b: PinRef::new(comp_b, pin_b),
        }
    }
}

/// Disjoint-set over wire endpoints.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            let root = self.find(self.parent[i]);
            self.parent[i] = root;
        }
        self.parent[i]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            // Smaller root wins, keeping node creation order stable
            let (keep, merge) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[merge] = keep;
        }
    }
}

/// Build a validated circuit graph from components, wires, and a ground pin.
///
/// Every pin of every component becomes a union-find element; each wire
/// merges its two endpoints; each resulting equivalence class becomes one
/// node. The node of `ground` becomes the reference. Validation errors
/// (unbound pins, missing ground) abort the build; warnings (floating
/// nodes) are logged and left for the caller to inspect via
/// [`CircuitGraph::validate`].
pub fn build_netlist(
    components: &[ComponentSpec],
    wires: &[Wire],
    ground: &PinRef,
) -> Result<CircuitGraph> {
    let mut graph = CircuitGraph::new();

    // Declare components; names must be unique so wires can refer to them.
    let mut by_name = IndexMap::new();
    for spec in components {
        if by_name.contains_key(spec.name.as_str()) {
            return Err(Error::DuplicateComponentName {
                name: spec.name.clone(),
            });
        }
        let id = graph.add_component(spec.name.clone(), spec.kind.clone());
        by_name.insert(spec.name.as_str(), id);
    }

    // Enumerate every declared pin as a union-find element.
    let mut pin_slot: IndexMap<(&str, &'static str), usize> = IndexMap::new();
    for spec in components {
        for pin in spec.kind.pin_names() {
            pin_slot.insert((spec.name.as_str(), pin), pin_slot.len());
        }
    }

    let kinds: IndexMap<&str, &ComponentKind> = components
        .iter()
        .map(|s| (s.name.as_str(), &s.kind))
        .collect();
    let resolve = |r: &PinRef| -> Result<usize> {
        let kind = kinds
            .get(r.component.as_str())
            .ok_or_else(|| Error::UnknownComponent {
                name: r.component.clone(),
            })?;
        let canonical = kind
            .pin_names()
            .iter()
            .find(|p| **p == r.pin)
            .ok_or_else(|| voltaic_core::Error::UnknownPin {
                component: r.component.clone(),
                pin: r.pin.clone(),
            })?;
        Ok(pin_slot[&(r.component.as_str(), *canonical)])
    };

    let mut dsu = UnionFind::new(pin_slot.len());
    for wire in wires {
        let a = resolve(&wire.a)?;
        let b = resolve(&wire.b)?;
        dsu.union(a, b);
    }
    let ground_slot = resolve(ground)?;

    // One node per equivalence class that contains at least one wired pin
    // (or the ground pin). Untouched pins stay unbound and surface through
    // validation.
    let mut wired = vec![false; pin_slot.len()];
    for wire in wires {
        wired[resolve(&wire.a)?] = true;
        wired[resolve(&wire.b)?] = true;
    }
    wired[ground_slot] = true;

    let mut class_node = IndexMap::new();
    for (&(comp_name, pin), &slot) in &pin_slot {
        if !wired[slot] {
            continue;
        }
        let root = dsu.find(slot);
        let node = *class_node.entry(root).or_insert_with(|| graph.add_node());
        let comp_id = by_name[comp_name];
        graph.connect(comp_id, pin, node)?;
    }

    let ground_node = class_node[&dsu.find(ground_slot)];
    graph.set_ground(ground_node)?;

    let report = graph.validate();
    for warning in &report.warnings {
        log::warn!("netlist: {warning}");
    }
    if !report.is_ok() {
        return Err(Error::Invalid {
            errors: report.errors,
        });
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltaic_core::ValidationError;

    fn divider_specs() -> (Vec<ComponentSpec>, Vec<Wire>) {
        let components = vec![
            ComponentSpec::new("V1", ComponentKind::dc_voltage(10.0)),
            ComponentSpec::new("R1", ComponentKind::resistor(1000.0)),
            ComponentSpec::new("R2", ComponentKind::resistor(1000.0)),
        ];
        let wires = vec![
            Wire::between("V1", "+", "R1", "in"),
            Wire::between("R1", "out", "R2", "in"),
            Wire::between("R2", "out", "V1", "-"),
        ];
        (components, wires)
    }

    #[test]
    fn test_build_divider() {
        let (components, wires) = divider_specs();
        let graph = build_netlist(&components, &wires, &PinRef::new("V1", "-")).unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.component_count(), 3);
        assert!(graph.ground().is_some());

        // V1.- and R2.out share the ground node
        let v1 = graph.component_by_name("V1").unwrap();
        let r2 = graph.component_by_name("R2").unwrap();
        assert_eq!(v1.binding("-"), r2.binding("out"));
        assert_eq!(v1.binding("-"), graph.ground());
    }

    #[test]
    fn test_transitive_wire_merging() {
        // Three wires all meeting at one junction: R1.out, R2.in, R3.in
        let components = vec![
            ComponentSpec::new("V1", ComponentKind::dc_voltage(5.0)),
            ComponentSpec::new("R1", ComponentKind::resistor(100.0)),
            ComponentSpec::new("R2", ComponentKind::resistor(100.0)),
            ComponentSpec::new("R3", ComponentKind::resistor(100.0)),
        ];
        let wires = vec![
            Wire::between("V1", "+", "R1", "in"),
            Wire::between("R1", "out", "R2", "in"),
            Wire::between("R2", "in", "R3", "in"),
            Wire::between("R2", "out", "V1", "-"),
            Wire::between("R3", "out", "V1", "-"),
        ];
        let graph = build_netlist(&components, &wires, &PinRef::new("V1", "-")).unwrap();

        let r1 = graph.component_by_name("R1").unwrap();
        let r2 = graph.component_by_name("R2").unwrap();
        let r3 = graph.component_by_name("R3").unwrap();
        assert_eq!(r1.binding("out"), r2.binding("in"));
        assert_eq!(r2.binding("in"), r3.binding("in"));
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_unwired_pin_fails_validation() {
        let (components, mut wires) = divider_specs();
        wires.pop(); // R2.out and V1.- now dangle

        let err = build_netlist(&components, &wires, &PinRef::new("V1", "-")).unwrap_err();
        match err {
            Error::Invalid { errors } => {
                assert!(errors.contains(&ValidationError::UnboundPin {
                    component: "R2".into(),
                    pin: "out".into(),
                }));
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_component_in_wire() {
        let (components, mut wires) = divider_specs();
        wires.push(Wire::between("R9", "in", "R1", "in"));
        let err = build_netlist(&components, &wires, &PinRef::new("V1", "-")).unwrap_err();
        assert!(matches!(err, Error::UnknownComponent { name } if name == "R9"));
    }

    #[test]
    fn test_unknown_pin_in_wire() {
        let (components, mut wires) = divider_specs();
        wires.push(Wire::between("R1", "base", "R2", "in"));
        let err = build_netlist(&components, &wires, &PinRef::new("V1", "-")).unwrap_err();
        assert!(matches!(
            err,
            Error::Structure(voltaic_core::Error::UnknownPin { .. })
        ));
    }

    #[test]
    fn test_duplicate_component_name() {
        let components = vec![
            ComponentSpec::new("R1", ComponentKind::resistor(1.0)),
            ComponentSpec::new("R1", ComponentKind::resistor(2.0)),
        ];
        let err = build_netlist(&components, &[], &PinRef::new("R1", "in")).unwrap_err();
        assert!(matches!(err, Error::DuplicateComponentName { name } if name == "R1"));
    }
}
