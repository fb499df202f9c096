//! Analysis orchestration over an immutable circuit graph.

use indexmap::IndexMap;
use voltaic_core::CircuitGraph;
use voltaic_solver::{
    CancelToken, ConvergenceStatus, DcSolution, TransientParams, solve_ac, solve_dc,
    solve_transient,
};

use crate::error::{Error, Result};
use crate::results::{AcFrequencyPoint, AcResult, DcResult, TransientResult, derive_dc_result};
use crate::settings::{Settings, validate_timing};
use crate::stamp::{CircuitStamper, DcStamper, TransientStamper};

/// One circuit document, ready to analyze.
///
/// The graph is read-only for the simulator's lifetime; each run derives
/// its own matrices and discards them. DC must run before AC, since the
/// small-signal linearization needs an operating point. Runs are
/// synchronous; long transient runs can be aborted between steps through
/// the [`CancelToken`].
pub struct Simulator {
    graph: CircuitGraph,
    settings: Settings,
    operating_point: Option<DcSolution>,
    cancel: CancelToken,
}

impl Simulator {
    /// Wrap a validated graph. Fails fast on bad settings or a structurally
    /// invalid netlist; floating-node warnings are logged but do not block.
    pub fn new(graph: CircuitGraph, settings: Settings) -> Result<Self> {
        settings.validate()?;

        let report = graph.validate();
        for warning in &report.warnings {
            log::warn!("netlist: {warning}");
        }
        if !report.is_ok() {
            return Err(Error::Invalid {
                errors: report.errors,
            });
        }

        Ok(Self {
            graph,
            settings,
            operating_point: None,
            cancel: CancelToken::new(),
        })
    }

    /// The circuit graph under analysis.
    pub fn graph(&self) -> &CircuitGraph {
        &self.graph
    }

    /// A token that aborts an in-flight transient run between time steps.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Compute the DC operating point.
    ///
    /// Always starts from a cold initial guess so repeated runs on an
    /// unchanged netlist are bit-identical. The operating point is cached
    /// for subsequent AC runs.
    pub fn run_dc(&mut self) -> Result<DcResult> {
        log::info!(
            "dc analysis: {} nodes, {} components",
            self.graph.node_count(),
            self.graph.component_count()
        );

        let stamper = CircuitStamper::new(&self.graph, self.settings.temperature)?;
        let solution = solve_dc(
            &DcStamper(&stamper),
            &self.settings.criteria(),
            &self.settings.solver_config(),
            None,
        )?;

        let status = ConvergenceStatus::Converged {
            iterations: solution.iterations,
        };
        let result = derive_dc_result(
            &stamper,
            &solution,
            status,
            None,
            None,
            self.settings.temperature,
        );
        self.operating_point = Some(solution);
        Ok(result)
    }

    /// Run a fixed-step transient analysis from `t = 0` to `t_end`.
    pub fn run_transient(&mut self, t_end: f64, dt: f64) -> Result<TransientResult> {
        self.run_transient_with(TransientParams::fixed(t_end, dt))
    }

    /// Run a transient analysis with full parameter control (adaptive
    /// stepping, step floor).
    pub fn run_transient_with(&mut self, params: TransientParams) -> Result<TransientResult> {
        validate_timing(params.t_end, params.dt)?;
        log::info!(
            "transient analysis: t_end = {:.3e} s, dt = {:.3e} s{}",
            params.t_end,
            params.dt,
            if params.adaptive { " (adaptive)" } else { "" }
        );

        let stamper = CircuitStamper::new(&self.graph, self.settings.temperature)?;
        let criteria = self.settings.criteria();
        let solver = self.settings.solver_config();

        // Operating point is the t = 0 initial condition
        let dc = solve_dc(&DcStamper(&stamper), &criteria, &solver, None)?;

        let raw = solve_transient(
            &TransientStamper(&stamper),
            &dc.solution,
            &params,
            &criteria,
            &solver,
            Some(&self.cancel),
        )?;

        let num_nodes = stamper.num_nodes();
        let mut points = Vec::with_capacity(raw.points.len());
        for (i, tp) in raw.points.iter().enumerate() {
            let iterations = if i == 0 { dc.iterations } else { tp.iterations };
            let status = ConvergenceStatus::Converged { iterations };
            let snapshot = DcSolution {
                solution: tp.solution.clone(),
                num_nodes,
                iterations,
            };
            let prev = (i > 0).then(|| {
                let before = &raw.points[i - 1];
                (&before.solution, tp.time - before.time)
            });
            let time = (i > 0).then_some(tp.time);
            points.push((
                tp.time,
                derive_dc_result(
                    &stamper,
                    &snapshot,
                    status,
                    time,
                    prev,
                    self.settings.temperature,
                ),
            ));
        }

        self.operating_point = Some(dc);
        Ok(TransientResult { points })
    }

    /// Sweep the small-signal response over the given frequencies.
    ///
    /// Requires an operating point from a prior [`run_dc`](Self::run_dc) or
    /// transient run; fails with [`Error::MissingOperatingPoint`] otherwise.
    pub fn run_ac(&self, frequencies: &[f64]) -> Result<AcResult> {
        let op = self
            .operating_point
            .as_ref()
            .ok_or(Error::MissingOperatingPoint)?;

        log::info!("ac analysis: {} frequency points", frequencies.len());

        let stamper = CircuitStamper::new(&self.graph, self.settings.temperature)?;
        let mna = stamper.stamp_small_signal(&op.solution);
        let raw = solve_ac(&mna, frequencies, &self.settings.solver_config())?;

        let points = raw
            .points
            .iter()
            .map(|p| {
                let mut node_voltages = IndexMap::new();
                for node in self.graph.nodes() {
                    let v = match stamper.index_of(node.id()) {
                        Some(i) => p.solution[i],
                        None => num_complex::Complex64::new(0.0, 0.0),
                    };
                    node_voltages.insert(node.id(), v);
                }
                AcFrequencyPoint {
                    frequency: p.frequency,
                    node_voltages,
                }
            })
            .collect();

        Ok(AcResult { points })
    }
}
