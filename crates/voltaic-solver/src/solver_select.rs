//! Solver backend selection: direct LU or iterative GMRES behind one call.
//!
//! The analysis engines hand over the assembled system in coordinate form
//! and never know which backend ran.

use nalgebra::DVector;
use num_complex::Complex64;

use crate::error::{Error, Result};
use crate::gmres::{GmresConfig, solve_gmres_complex, solve_gmres_real};
use crate::linear::{solve_dense, solve_dense_complex};
use crate::operator::{CsrComplexMatrix, CsrMatrix};
use voltaic_core::mna::{Triplet, dense_from_triplets};

/// Which linear solver backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum SolverStrategy {
    /// Pick by system size (default): LU below the threshold, GMRES above.
    #[default]
    Auto,
    /// Always use direct LU factorization.
    DirectLu,
    /// Always use iterative GMRES.
    IterativeGmres,
}

impl SolverStrategy {
    /// Strategy name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            SolverStrategy::Auto => "auto",
            SolverStrategy::DirectLu => "direct (LU)",
            SolverStrategy::IterativeGmres => "iterative (GMRES)",
        }
    }
}

impl std::fmt::Display for SolverStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Backend selection configuration.
#[derive(Debug, Clone, Default)]
pub struct SolverConfig {
    /// Selection strategy.
    pub strategy: SolverStrategy,
    /// System size at which `Auto` switches from LU to GMRES. Dense LU
    /// memory grows with n², which is where large circuits start to hurt.
    pub gmres_threshold: usize,
    /// GMRES parameters, used when GMRES is selected.
    pub gmres: GmresConfig,
}

impl SolverConfig {
    /// A config that always uses direct LU.
    pub fn direct_lu() -> Self {
        Self {
            strategy: SolverStrategy::DirectLu,
            ..Default::default()
        }
    }

    /// A config that always uses GMRES.
    pub fn gmres() -> Self {
        Self {
            strategy: SolverStrategy::IterativeGmres,
            ..Default::default()
        }
    }

    fn use_gmres(&self, n: usize) -> bool {
        match self.strategy {
            SolverStrategy::DirectLu => false,
            SolverStrategy::IterativeGmres => true,
            SolverStrategy::Auto => n >= self.threshold(),
        }
    }

    fn threshold(&self) -> usize {
        if self.gmres_threshold == 0 {
            2048
        } else {
            self.gmres_threshold
        }
    }
}

/// Solve a real system given in coordinate form.
pub fn solve_real_system(
    n: usize,
    triplets: &[Triplet],
    rhs: &DVector<f64>,
    config: &SolverConfig,
) -> Result<DVector<f64>> {
    if rhs.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: rhs.len(),
        });
    }

    if config.use_gmres(n) {
        let a = CsrMatrix::from_triplets(n, triplets);
        let result = solve_gmres_real(&a, rhs.as_slice(), &config.gmres);
        if !result.converged {
            return Err(Error::SolverNonconvergence {
                iterations: result.iterations,
                residual: result.residual,
            });
        }
        Ok(DVector::from_vec(result.x))
    } else {
        let a = dense_from_triplets(n, triplets);
        solve_dense(&a, rhs)
    }
}

/// Solve a complex system given in coordinate form.
pub fn solve_complex_system(
    n: usize,
    triplets: &[(usize, usize, Complex64)],
    rhs: &DVector<Complex64>,
    config: &SolverConfig,
) -> Result<DVector<Complex64>> {
    if rhs.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: rhs.len(),
        });
    }

    if config.use_gmres(n) {
        let a = CsrComplexMatrix::from_triplets(n, triplets);
        let result = solve_gmres_complex(&a, rhs.as_slice(), &config.gmres);
        if !result.converged {
            return Err(Error::SolverNonconvergence {
                iterations: result.iterations,
                residual: result.residual,
            });
        }
        Ok(DVector::from_vec(result.x))
    } else {
        let mut a = nalgebra::DMatrix::from_element(n, n, Complex64::new(0.0, 0.0));
        for &(i, j, v) in triplets {
            a[(i, j)] += v;
        }
        solve_dense_complex(&a, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    fn system() -> (usize, Vec<Triplet>, DVector<f64>) {
        // [3 -1; -1 2] x = [2; 1] → x = [1; 1]
        (
            2,
            vec![(0, 0, 3.0), (0, 1, -1.0), (1, 0, -1.0), (1, 1, 2.0)],
            dvector![2.0, 1.0],
        )
    }

    #[test]
    fn test_direct_and_gmres_agree() {
        let (n, t, b) = system();
        let lu = solve_real_system(n, &t, &b, &SolverConfig::direct_lu()).unwrap();
        let gm = solve_real_system(n, &t, &b, &SolverConfig::gmres()).unwrap();
        for i in 0..n {
            assert!((lu[i] - 1.0).abs() < 1e-10);
            assert!((lu[i] - gm[i]).abs() < 1e-8);
        }
    }

    #[test]
    fn test_auto_picks_lu_for_small_systems() {
        let (n, t, b) = system();
        let x = solve_real_system(n, &t, &b, &SolverConfig::default()).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_nonconvergence_is_typed() {
        let (n, t, b) = system();
        let config = SolverConfig {
            strategy: SolverStrategy::IterativeGmres,
            gmres: GmresConfig {
                max_iter: 1,
                tol: 1e-16,
                restart: 1,
            },
            ..Default::default()
        };
        let err = solve_real_system(n, &t, &b, &config).unwrap_err();
        assert!(matches!(err, Error::SolverNonconvergence { .. }));
    }

    #[test]
    fn test_complex_backends_agree() {
        let j = Complex64::new(0.0, 1.0);
        let one = Complex64::new(1.0, 0.0);
        let t = vec![(0, 0, one + j), (1, 1, one * 2.0)];
        let b = DVector::from_vec(vec![Complex64::new(2.0, 0.0), Complex64::new(4.0, 2.0)]);

        let lu = solve_complex_system(2, &t, &b, &SolverConfig::direct_lu()).unwrap();
        let gm = solve_complex_system(2, &t, &b, &SolverConfig::gmres()).unwrap();
        assert!((lu[0] - Complex64::new(1.0, -1.0)).norm() < 1e-10);
        assert!((lu[1] - Complex64::new(2.0, 1.0)).norm() < 1e-10);
        for i in 0..2 {
            assert!((lu[i] - gm[i]).norm() < 1e-8);
        }
    }
}
