//! Transient time-domain analysis.
//!
//! Backward-Euler discretization of the descriptor system `G·x + C·x' = b`:
//! each step solves `(G + C/h)·x_{n+1} = b(t_{n+1}) + (C/h)·x_n`. For a
//! capacitor this is the familiar companion model (`G_eq = C/h` in parallel
//! with `I_eq = (C/h)·v_n`); for an inductor kept in branch form it is
//! `V⁺ − V⁻ − (L/h)·i_{n+1} = −(L/h)·i_n`. Nonlinear elements run the
//! Newton-Raphson loop at every step, warm-started from the previous step.

use nalgebra::DVector;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::newton::{AssembledSystem, ConvergenceCriteria, SystemStamper, solve_newton};
use crate::solver_select::SolverConfig;
use voltaic_core::mna::triplet_matvec;

/// Transient run parameters.
#[derive(Debug, Clone)]
pub struct TransientParams {
    /// Stop time (s).
    pub t_end: f64,
    /// Requested time step (s).
    pub dt: f64,
    /// Halve the step on non-convergence instead of failing outright.
    pub adaptive: bool,
    /// Step floor for adaptive mode; defaults to `dt / 1024`.
    pub min_dt: Option<f64>,
}

impl TransientParams {
    /// Fixed-step run.
    pub fn fixed(t_end: f64, dt: f64) -> Self {
        Self {
            t_end,
            dt,
            adaptive: false,
            min_dt: None,
        }
    }

    /// Adaptive run: on non-convergence the step halves down to the floor,
    /// beyond which the run fails with `TimeStepUnderflow`.
    pub fn adaptive(t_end: f64, dt: f64) -> Self {
        Self {
            t_end,
            dt,
            adaptive: true,
            min_dt: None,
        }
    }

    fn step_floor(&self) -> f64 {
        self.min_dt.unwrap_or(self.dt / 1024.0)
    }
}

/// One solved time point.
#[derive(Debug, Clone)]
pub struct TimePoint {
    /// Time (s).
    pub time: f64,
    /// Solution vector at this time (node voltages, then branch currents).
    pub solution: DVector<f64>,
    /// Newton iterations spent on this step (0 for the initial point,
    /// which is supplied, not solved).
    pub iterations: usize,
}

/// Ordered transient solution.
#[derive(Debug, Clone)]
pub struct TransientResult {
    /// Computed points, starting with the operating point at t = 0.
    pub points: Vec<TimePoint>,
    /// Number of node-voltage unknowns.
    pub num_nodes: usize,
}

impl TransientResult {
    /// `(time, voltage)` pairs for a node index (`None` = ground, all zero).
    pub fn voltage_waveform(&self, node: Option<usize>) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|tp| {
                let v = match node {
                    Some(i) if i < self.num_nodes => tp.solution[i],
                    _ => 0.0,
                };
                (tp.time, v)
            })
            .collect()
    }

    /// All time values.
    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|tp| tp.time).collect()
    }

    /// The last computed point.
    pub fn last(&self) -> &TimePoint {
        self.points.last().expect("at least the t=0 point")
    }
}

/// Run a transient simulation from the DC operating point.
///
/// Each invocation starts fresh at `t = 0` with `dc_solution` as the
/// initial state; the run is not restartable mid-way. The cancel token, if
/// given, is checked between steps only.
pub fn solve_transient(
    stamper: &dyn SystemStamper,
    dc_solution: &DVector<f64>,
    params: &TransientParams,
    criteria: &ConvergenceCriteria,
    solver: &SolverConfig,
    cancel: Option<&CancelToken>,
) -> Result<TransientResult> {
    let size = stamper.size();
    if dc_solution.len() != size {
        return Err(Error::DimensionMismatch {
            expected: size,
            actual: dc_solution.len(),
        });
    }

    let mut points = vec![TimePoint {
        time: 0.0,
        solution: dc_solution.clone(),
        iterations: 0,
    }];
    let mut x_prev = dc_solution.clone();

    let mut t = 0.0;
    let mut h = params.dt;
    let floor = params.step_floor();
    // Remaining time below this is roundoff, not a missing step
    let t_eps = params.t_end * 1e-12;

    while params.t_end - t > t_eps {
        if let Some(token) = cancel {
            if token.is_cancelled() {
                return Err(Error::Cancelled { time: t });
            }
        }

        let h_step = h.min(params.t_end - t);
        let t_next = t + h_step;

        let outcome = solve_newton(
            size,
            stamper.is_linear(),
            |guess: &DVector<f64>| {
                let mna = stamper.stamp_at(t_next, guess);
                let mut matrix = mna.g_triplets().to_vec();
                for &(i, j, v) in mna.c_triplets() {
                    matrix.push((i, j, v / h_step));
                }
                let mut rhs = mna.rhs().clone();
                rhs += triplet_matvec(size, mna.c_triplets(), &x_prev) / h_step;
                AssembledSystem {
                    size,
                    matrix,
                    rhs,
                }
            },
            criteria,
            Some(&x_prev),
            solver,
        )?;

        if outcome.converged {
            t = t_next;
            x_prev = outcome.solution;
            points.push(TimePoint {
                time: t,
                solution: x_prev.clone(),
                iterations: outcome.iterations,
            });
        } else if params.adaptive {
            h /= 2.0;
            log::warn!("transient: step halved to {h:.3e} s at t = {t:.6e} s");
            if h < floor {
                return Err(Error::TimeStepUnderflow {
                    time: t_next,
                    step: points.len(),
                });
            }
        } else {
            return Err(Error::Diverged {
                iterations: outcome.iterations,
                last_delta: outcome.last_delta,
            });
        }
    }

    log::debug!(
        "transient: {} points over {:.3e} s",
        points.len(),
        params.t_end
    );
    Ok(TransientResult {
        points,
        num_nodes: stamper.num_nodes(),
    })
}
