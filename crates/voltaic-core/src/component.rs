//! Component instances and their electrical models.

use std::fmt;

use indexmap::IndexMap;

use crate::node::NodeId;
use crate::waveform::Waveform;

/// Nominal temperature for temperature-dependent models (27 °C in K).
pub const T_NOMINAL: f64 = 300.15;

/// Unique identifier for a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) u32);

impl ComponentId {
    /// Create a ComponentId from a raw value.
    pub fn new(id: u32) -> Self {
        ComponentId(id)
    }

    /// Get the raw value.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Typed parameter set for each component kind.
///
/// Each variant declares its exact field set; there is no open key/value
/// property map, so unknown parameters cannot enter the model.
#[derive(Debug, Clone)]
pub enum ComponentKind {
    /// Linear resistor. `temp_coeff` is the linear temperature coefficient
    /// (1/K) applied around [`T_NOMINAL`].
    Resistor { resistance: f64, temp_coeff: f64 },
    /// Linear capacitor (F).
    Capacitor { capacitance: f64 },
    /// Linear inductor (H). Carries one branch-current unknown.
    Inductor { inductance: f64 },
    /// Independent voltage source. Carries one branch-current unknown.
    VoltageSource { waveform: Waveform },
    /// Independent current source.
    CurrentSource { waveform: Waveform },
    /// Junction diode (Shockley model).
    Diode { model: DiodeModel },
}

impl ComponentKind {
    /// A plain resistor with zero temperature coefficient.
    pub fn resistor(resistance: f64) -> Self {
        ComponentKind::Resistor {
            resistance,
            temp_coeff: 0.0,
        }
    }

    /// A DC voltage source.
    pub fn dc_voltage(volts: f64) -> Self {
        ComponentKind::VoltageSource {
            waveform: Waveform::dc(volts),
        }
    }

    /// A DC current source.
    pub fn dc_current(amps: f64) -> Self {
        ComponentKind::CurrentSource {
            waveform: Waveform::dc(amps),
        }
    }

    /// The symbolic pin names this kind declares, in order.
    pub fn pin_names(&self) -> &'static [&'static str] {
        match self {
            ComponentKind::Resistor { .. }
            | ComponentKind::Capacitor { .. }
            | ComponentKind::Inductor { .. } => &["in", "out"],
            ComponentKind::VoltageSource { .. } | ComponentKind::CurrentSource { .. } => {
                &["+", "-"]
            }
            ComponentKind::Diode { .. } => &["a", "k"],
        }
    }

    /// Human-readable type tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            ComponentKind::Resistor { .. } => "Resistor",
            ComponentKind::Capacitor { .. } => "Capacitor",
            ComponentKind::Inductor { .. } => "Inductor",
            ComponentKind::VoltageSource { .. } => "VoltageSource",
            ComponentKind::CurrentSource { .. } => "CurrentSource",
            ComponentKind::Diode { .. } => "Diode",
        }
    }

    /// Whether this kind requires Newton-Raphson linearization.
    pub fn is_nonlinear(&self) -> bool {
        matches!(self, ComponentKind::Diode { .. })
    }

    /// Number of auxiliary branch-current unknowns this kind introduces.
    pub fn num_branch_vars(&self) -> usize {
        match self {
            ComponentKind::VoltageSource { .. } | ComponentKind::Inductor { .. } => 1,
            _ => 0,
        }
    }

    /// Effective resistance at the given temperature (K), for resistors.
    pub fn resistance_at(&self, temp: f64) -> Option<f64> {
        match self {
            ComponentKind::Resistor {
                resistance,
                temp_coeff,
            } => Some(resistance * (1.0 + temp_coeff * (temp - T_NOMINAL))),
            _ => None,
        }
    }
}

/// Shockley diode model parameters.
#[derive(Debug, Clone)]
pub struct DiodeModel {
    /// Saturation current (A).
    pub is: f64,
    /// Emission coefficient.
    pub n: f64,
}

impl Default for DiodeModel {
    fn default() -> Self {
        Self { is: 1e-14, n: 1.0 }
    }
}

/// Minimum diode conductance stamped for numerical stability (S).
pub const GMIN: f64 = 1e-12;

impl DiodeModel {
    /// Evaluate diode current and conductance at junction voltage `vd`.
    ///
    /// Returns `(current, conductance)`:
    /// - `I = Is * (exp(Vd / (n*Vt)) - 1)`
    /// - `dI/dV = Is / (n*Vt) * exp(Vd / (n*Vt))`
    ///
    /// The voltage is limited above the critical voltage to keep `exp`
    /// finite; the conductance is floored at [`GMIN`].
    pub fn evaluate(&self, vd: f64, temp: f64) -> (f64, f64) {
        let nvt = self.n * thermal_voltage(temp);
        let vd = self.limit_voltage(vd, nvt);

        let exp_term = (vd / nvt).exp();
        let id = self.is * (exp_term - 1.0);
        let gd = (self.is * exp_term / nvt).max(GMIN);

        (id, gd)
    }

    /// Norton companion of the linearized diode at junction voltage `vd`.
    ///
    /// Returns `(gd, ieq)` where the companion is `gd` in parallel with the
    /// current source `ieq = I(v*) - gd·v*`, with `v*` the limited voltage.
    /// Anchoring the tangent at the limited point is what lets
    /// Newton-Raphson walk a huge initial guess down the exponential
    /// instead of creeping.
    pub fn linearize(&self, vd: f64, temp: f64) -> (f64, f64) {
        let nvt = self.n * thermal_voltage(temp);
        let vd_lim = self.limit_voltage(vd, nvt);

        let exp_term = (vd_lim / nvt).exp();
        let id = self.is * (exp_term - 1.0);
        let gd = (self.is * exp_term / nvt).max(GMIN);

        (gd, id - gd * vd_lim)
    }

    /// Log-compress voltages above the critical voltage so `exp` cannot
    /// overflow. Deterministic: the same input always limits the same way.
    fn limit_voltage(&self, vd: f64, nvt: f64) -> f64 {
        let vcrit = nvt * (nvt / (std::f64::consts::SQRT_2 * self.is)).ln();
        if vd > vcrit {
            vcrit + nvt * (1.0 + ((vd - vcrit) / nvt).ln_1p())
        } else {
            vd
        }
    }
}

/// Thermal voltage kT/q at the given temperature (K).
pub fn thermal_voltage(temp_k: f64) -> f64 {
    const K_BOLTZMANN: f64 = 1.380649e-23;
    const Q_ELECTRON: f64 = 1.602176634e-19;
    K_BOLTZMANN * temp_k / Q_ELECTRON
}

/// A component instance: a named, typed element with pin-to-node bindings.
#[derive(Debug, Clone)]
pub struct Component {
    id: ComponentId,
    name: String,
    kind: ComponentKind,
    bindings: IndexMap<&'static str, NodeId>,
}

impl Component {
    pub(crate) fn new(id: ComponentId, name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            bindings: IndexMap::new(),
        }
    }

    /// The component's ID.
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// The component's name (e.g. "R1").
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The component's kind and parameters.
    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    /// Declared pin names, in order.
    pub fn pin_names(&self) -> &'static [&'static str] {
        self.kind.pin_names()
    }

    /// The node a pin is bound to, if bound.
    pub fn binding(&self, pin: &str) -> Option<NodeId> {
        self.bindings.get(pin).copied()
    }

    /// Declared pins that have no node binding yet.
    pub fn unbound_pins(&self) -> Vec<&'static str> {
        self.pin_names()
            .iter()
            .copied()
            .filter(|p| !self.bindings.contains_key(p))
            .collect()
    }

    /// All bound nodes, in pin declaration order.
    pub fn bound_nodes(&self) -> Vec<NodeId> {
        self.pin_names()
            .iter()
            .filter_map(|p| self.bindings.get(p).copied())
            .collect()
    }

    pub(crate) fn bind(&mut self, pin: &'static str, node: NodeId) {
        self.bindings.insert(pin, node);
    }
}
