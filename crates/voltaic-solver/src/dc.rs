//! DC operating point analysis.

use nalgebra::DVector;

use crate::error::Result;
use crate::newton::{AssembledSystem, ConvergenceCriteria, SystemStamper, solve_newton};
use crate::solver_select::SolverConfig;

/// How a DC run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConvergenceStatus {
    /// Tolerances held; `iterations` linear solves were performed.
    Converged { iterations: usize },
    /// Iteration budget exhausted without settling.
    Diverged { iterations: usize, last_delta: f64 },
}

impl ConvergenceStatus {
    /// Number of iterations performed.
    pub fn iterations(&self) -> usize {
        match *self {
            ConvergenceStatus::Converged { iterations }
            | ConvergenceStatus::Diverged { iterations, .. } => iterations,
        }
    }
}

/// Solved DC operating point.
///
/// Layout: node voltages first (by matrix index; ground is implicit 0 V),
/// then branch currents.
#[derive(Debug, Clone)]
pub struct DcSolution {
    /// Full solution vector.
    pub solution: DVector<f64>,
    /// Number of node-voltage unknowns.
    pub num_nodes: usize,
    /// Iterations the Newton loop performed (1 for linear circuits).
    pub iterations: usize,
}

impl DcSolution {
    /// Voltage at a matrix node index; `None` is ground (0 V).
    pub fn voltage(&self, index: Option<usize>) -> f64 {
        match index {
            Some(i) if i < self.num_nodes => self.solution[i],
            _ => 0.0,
        }
    }

    /// Voltage difference between two node indices.
    pub fn voltage_diff(&self, pos: Option<usize>, neg: Option<usize>) -> f64 {
        self.voltage(pos) - self.voltage(neg)
    }

    /// Branch current by branch-variable index.
    pub fn branch_current(&self, branch: usize) -> f64 {
        let i = self.num_nodes + branch;
        if i < self.solution.len() {
            self.solution[i]
        } else {
            0.0
        }
    }
}

/// Find the DC operating point for the stamped circuit.
///
/// Nonlinear circuits run the Newton-Raphson loop; linear circuits solve
/// once. Divergence surfaces as [`Error::Diverged`](crate::Error::Diverged)
/// with the iteration count and last step norm — no partial solution is
/// returned.
pub fn solve_dc(
    stamper: &dyn SystemStamper,
    criteria: &ConvergenceCriteria,
    solver: &SolverConfig,
    warm_start: Option<&DVector<f64>>,
) -> Result<DcSolution> {
    // All C-matrix terms drop out at DC (x' = 0), so only G and b enter.
    let outcome = solve_newton(
        stamper.size(),
        stamper.is_linear(),
        |guess: &DVector<f64>| {
            let mna = stamper.stamp_at(0.0, guess);
            AssembledSystem {
                size: mna.size(),
                matrix: mna.g_triplets().to_vec(),
                rhs: mna.rhs().clone(),
            }
        },
        criteria,
        warm_start,
        solver,
    )?
    .into_result()?;

    Ok(DcSolution {
        solution: outcome.solution,
        num_nodes: stamper.num_nodes(),
        iterations: outcome.iterations,
    })
}
