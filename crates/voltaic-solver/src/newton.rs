//! Newton-Raphson iteration for nonlinear circuits.
//!
//! Each iteration re-stamps the system linearized at the current voltage
//! guess, solves, and checks the step against absolute and relative
//! tolerances. Convergence is declared only after the check passes on two
//! consecutive iterations, so one accidentally small step cannot end the
//! loop early.

use nalgebra::DVector;
use voltaic_core::MnaSystem;

use crate::error::{Error, Result};
use crate::solver_select::{SolverConfig, solve_real_system};
use voltaic_core::mna::Triplet;

/// Convergence thresholds for the Newton-Raphson loop.
#[derive(Debug, Clone)]
pub struct ConvergenceCriteria {
    /// Absolute tolerance on the solution step norm.
    pub abstol: f64,
    /// Relative tolerance on the solution step norm.
    pub reltol: f64,
    /// Iteration budget before the loop reports divergence.
    pub max_iterations: usize,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            abstol: 1e-9,
            reltol: 1e-6,
            max_iterations: 100,
        }
    }
}

/// A linear system ready to hand to the solver backend: `A·x = rhs` in
/// coordinate form.
#[derive(Debug, Clone)]
pub struct AssembledSystem {
    pub size: usize,
    pub matrix: Vec<Triplet>,
    pub rhs: DVector<f64>,
}

/// Produces the MNA triple for a circuit at a given time, linearized at a
/// given voltage guess. Implemented by the netlist-facing layer.
pub trait SystemStamper {
    /// Total unknown count (node voltages + branch currents).
    fn size(&self) -> usize;

    /// Number of node-voltage unknowns (excluding ground).
    fn num_nodes(&self) -> usize;

    /// Whether the circuit contains no nonlinear elements.
    fn is_linear(&self) -> bool;

    /// Stamp `(G, C, b)` at `time`, with nonlinear elements linearized at
    /// `guess`.
    fn stamp_at(&self, time: f64, guess: &DVector<f64>) -> MnaSystem;
}

/// Result of a Newton-Raphson run. Divergence is data, not a panic: the
/// caller decides whether to retry with a different guess or step size.
#[derive(Debug, Clone)]
pub struct NewtonOutcome {
    /// Final solution vector (last iterate if not converged).
    pub solution: DVector<f64>,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether the tolerance held for two consecutive iterations.
    pub converged: bool,
    /// Norm of the last solution step.
    pub last_delta: f64,
}

impl NewtonOutcome {
    /// Convert a non-converged outcome into the typed divergence error.
    pub fn into_result(self) -> Result<NewtonOutcome> {
        if self.converged {
            Ok(self)
        } else {
            Err(Error::Diverged {
                iterations: self.iterations,
                last_delta: self.last_delta,
            })
        }
    }
}

/// Run Newton-Raphson on the system produced by `assemble`.
///
/// `assemble` is called once per iteration with the current guess. Purely
/// linear systems (`linear = true`) bypass iteration: one solve, reported
/// as converged after a single pass.
pub fn solve_newton<F>(
    size: usize,
    linear: bool,
    assemble: F,
    criteria: &ConvergenceCriteria,
    initial_guess: Option<&DVector<f64>>,
    solver: &SolverConfig,
) -> Result<NewtonOutcome>
where
    F: Fn(&DVector<f64>) -> AssembledSystem,
{
    let mut x = match initial_guess {
        Some(guess) => guess.clone(),
        None => DVector::zeros(size),
    };

    if linear {
        let sys = assemble(&x);
        let solution = solve_real_system(sys.size, &sys.matrix, &sys.rhs, solver)?;
        return Ok(NewtonOutcome {
            solution,
            iterations: 1,
            converged: true,
            last_delta: 0.0,
        });
    }

    let mut passes = 0usize;
    let mut last_delta = f64::INFINITY;

    for iteration in 1..=criteria.max_iterations {
        let sys = assemble(&x);
        let x_new = solve_real_system(sys.size, &sys.matrix, &sys.rhs, solver)?;

        if x_new.iter().any(|v| !v.is_finite()) {
            log::warn!("newton: non-finite solution at iteration {iteration}");
            return Ok(NewtonOutcome {
                solution: x,
                iterations: iteration,
                converged: false,
                last_delta: f64::INFINITY,
            });
        }

        let abs_delta = (&x_new - &x).norm();
        let x_norm = x_new.norm();
        let rel_delta = if x_norm > 0.0 { abs_delta / x_norm } else { 0.0 };
        last_delta = abs_delta;

        x = x_new;

        if abs_delta < criteria.abstol && rel_delta < criteria.reltol {
            passes += 1;
            if passes >= 2 {
                log::debug!("newton converged in {iteration} iterations");
                return Ok(NewtonOutcome {
                    solution: x,
                    iterations: iteration,
                    converged: true,
                    last_delta: abs_delta,
                });
            }
        } else {
            passes = 0;
        }
    }

    log::warn!(
        "newton diverged after {} iterations (last delta {last_delta:.3e})",
        criteria.max_iterations
    );
    Ok(NewtonOutcome {
        solution: x,
        iterations: criteria.max_iterations,
        converged: false,
        last_delta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_bypass_single_pass() {
        // 2x = 4
        let outcome = solve_newton(
            1,
            true,
            |_| AssembledSystem {
                size: 1,
                matrix: vec![(0, 0, 2.0)],
                rhs: DVector::from_vec(vec![4.0]),
            },
            &ConvergenceCriteria::default(),
            None,
            &SolverConfig::default(),
        )
        .unwrap();

        assert!(outcome.converged);
        assert_eq!(outcome.iterations, 1);
        assert!((outcome.solution[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_nonlinear_scalar_equation() {
        // Solve g(v) = v + e^v - 2 = 0 via its MNA-style linearization:
        // at guess v0, (1 + e^v0)·v = 2 - e^v0·(1 - v0)
        let outcome = solve_newton(
            1,
            false,
            |guess: &DVector<f64>| {
                let v0 = guess[0];
                let e = v0.exp();
                AssembledSystem {
                    size: 1,
                    matrix: vec![(0, 0, 1.0 + e)],
                    rhs: DVector::from_vec(vec![2.0 - e * (1.0 - v0)]),
                }
            },
            &ConvergenceCriteria::default(),
            None,
            &SolverConfig::default(),
        )
        .unwrap();

        assert!(outcome.converged);
        let v = outcome.solution[0];
        assert!((v + v.exp() - 2.0).abs() < 1e-8, "residual at v = {v}");
        // Two consecutive passing checks means at least 2 iterations
        assert!(outcome.iterations >= 2);
    }

    #[test]
    fn test_divergence_reported_with_diagnostics() {
        // Alternating assembly that never settles
        let outcome = solve_newton(
            1,
            false,
            |guess: &DVector<f64>| AssembledSystem {
                size: 1,
                matrix: vec![(0, 0, 1.0)],
                rhs: DVector::from_vec(vec![if guess[0] > 0.5 { 0.0 } else { 1.0 }]),
            },
            &ConvergenceCriteria {
                max_iterations: 10,
                ..Default::default()
            },
            None,
            &SolverConfig::default(),
        )
        .unwrap();

        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 10);
        assert!(outcome.last_delta > 0.0);
        assert!(matches!(
            outcome.into_result(),
            Err(Error::Diverged { iterations: 10, .. })
        ));
    }

    #[test]
    fn test_warm_start() {
        // Linear system, but routed through the nonlinear path with a warm
        // start sitting exactly on the solution: converges immediately.
        let assemble = |_: &DVector<f64>| AssembledSystem {
            size: 1,
            matrix: vec![(0, 0, 1.0)],
            rhs: DVector::from_vec(vec![3.0]),
        };
        let warm = DVector::from_vec(vec![3.0]);
        let outcome = solve_newton(
            1,
            false,
            assemble,
            &ConvergenceCriteria::default(),
            Some(&warm),
            &SolverConfig::default(),
        )
        .unwrap();

        assert!(outcome.converged);
        assert_eq!(outcome.iterations, 2);
    }
}
