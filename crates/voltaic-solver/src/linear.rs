//! Direct linear solves via LU factorization.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::error::{Error, Result};

/// A pivot smaller than this fraction of the largest pivot is treated as
/// zero: the factorization is declared singular instead of producing a
/// solution polluted by roundoff.
pub const PIVOT_RATIO: f64 = 1e-13;

/// Solve Ax = b by dense LU with an explicit near-zero-pivot check.
pub fn solve_dense(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    check_dims(a.nrows(), a.ncols(), b.len())?;
    if a.nrows() == 0 {
        return Ok(DVector::zeros(0));
    }

    let lu = a.clone().lu();
    let diag = lu.u().diagonal();
    let max_pivot = diag.iter().fold(0.0f64, |m, p| m.max(p.abs()));
    let min_pivot = diag.iter().fold(f64::INFINITY, |m, p| m.min(p.abs()));
    if max_pivot == 0.0 || min_pivot <= PIVOT_RATIO * max_pivot {
        return Err(Error::SingularMatrix);
    }

    lu.solve(b).ok_or(Error::SingularMatrix)
}

/// Solve a complex system Ax = b by dense LU with the same pivot check.
pub fn solve_dense_complex(
    a: &DMatrix<Complex64>,
    b: &DVector<Complex64>,
) -> Result<DVector<Complex64>> {
    check_dims(a.nrows(), a.ncols(), b.len())?;
    if a.nrows() == 0 {
        return Ok(DVector::zeros(0));
    }

    let lu = a.clone().lu();
    let diag = lu.u().diagonal();
    let max_pivot = diag.iter().fold(0.0f64, |m, p| m.max(p.norm()));
    let min_pivot = diag.iter().fold(f64::INFINITY, |m, p| m.min(p.norm()));
    if max_pivot == 0.0 || min_pivot <= PIVOT_RATIO * max_pivot {
        return Err(Error::SingularMatrix);
    }

    lu.solve(b).ok_or(Error::SingularMatrix)
}

fn check_dims(rows: usize, cols: usize, rhs: usize) -> Result<()> {
    if rows != cols {
        return Err(Error::DimensionMismatch {
            expected: rows,
            actual: cols,
        });
    }
    if rows != rhs {
        return Err(Error::DimensionMismatch {
            expected: rows,
            actual: rhs,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{dmatrix, dvector};

    #[test]
    fn test_solve_simple() {
        // 2x + y = 5, x + 3y = 6 → x = 1.8, y = 1.4
        let a = dmatrix![2.0, 1.0; 1.0, 3.0];
        let b = dvector![5.0, 6.0];
        let x = solve_dense(&a, &b).unwrap();
        assert!((x[0] - 1.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_singular_matrix() {
        let a = dmatrix![1.0, 2.0; 2.0, 4.0];
        let b = dvector![1.0, 2.0];
        assert_eq!(solve_dense(&a, &b), Err(Error::SingularMatrix));
    }

    #[test]
    fn test_near_singular_pivot() {
        // Second pivot is ~1e-16 of the first; must be rejected, not solved.
        let a = dmatrix![1.0, 1.0; 1.0, 1.0 + 1e-16];
        let b = dvector![2.0, 2.0];
        assert_eq!(solve_dense(&a, &b), Err(Error::SingularMatrix));
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = dmatrix![1.0, 2.0; 3.0, 4.0];
        let b = dvector![1.0, 2.0, 3.0];
        assert!(matches!(
            solve_dense(&a, &b),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_solve_complex() {
        // (1+j)·x = 2 → x = 1 - j
        let one_j = Complex64::new(1.0, 1.0);
        let a = DMatrix::from_element(1, 1, one_j);
        let b = DVector::from_element(1, Complex64::new(2.0, 0.0));
        let x = solve_dense_complex(&a, &b).unwrap();
        assert!((x[0] - Complex64::new(1.0, -1.0)).norm() < 1e-12);
    }
}
