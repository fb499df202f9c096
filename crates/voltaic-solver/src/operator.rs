//! Matrix-free operator traits and CSR storage for iterative solvers.

use num_complex::Complex64;
use voltaic_core::mna::Triplet;

/// A real linear operator y = A·x.
pub trait RealOperator {
    /// Operator dimension.
    fn dim(&self) -> usize;

    /// Compute `out = A·x`.
    fn apply(&self, x: &[f64], out: &mut [f64]);
}

/// A complex linear operator y = A·x.
pub trait ComplexOperator {
    /// Operator dimension.
    fn dim(&self) -> usize;

    /// Compute `out = A·x`.
    fn apply(&self, x: &[Complex64], out: &mut [Complex64]);
}

/// Compressed sparse row matrix, real-valued.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    n: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Compress coordinate entries into CSR form, summing duplicates.
    pub fn from_triplets(n: usize, triplets: &[Triplet]) -> Self {
        let (row_ptr, col_idx, values) =
            compress(n, triplets.iter().map(|&(i, j, v)| (i, j, v)), |a, b| a + b);
        Self {
            n,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Number of stored (structural) nonzeros.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }
}

impl RealOperator for CsrMatrix {
    fn dim(&self) -> usize {
        self.n
    }

    fn apply(&self, x: &[f64], out: &mut [f64]) {
        for (i, o) in out.iter_mut().enumerate() {
            let mut acc = 0.0;
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                acc += self.values[k] * x[self.col_idx[k]];
            }
            *o = acc;
        }
    }
}

/// Compressed sparse row matrix, complex-valued.
#[derive(Debug, Clone)]
pub struct CsrComplexMatrix {
    n: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<Complex64>,
}

impl CsrComplexMatrix {
    /// Compress complex coordinate entries into CSR form, summing duplicates.
    pub fn from_triplets(n: usize, triplets: &[(usize, usize, Complex64)]) -> Self {
        let (row_ptr, col_idx, values) =
            compress(n, triplets.iter().copied(), |a: Complex64, b| a + b);
        Self {
            n,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Number of stored (structural) nonzeros.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }
}

impl ComplexOperator for CsrComplexMatrix {
    fn dim(&self) -> usize {
        self.n
    }

    fn apply(&self, x: &[Complex64], out: &mut [Complex64]) {
        for (i, o) in out.iter_mut().enumerate() {
            let mut acc = Complex64::new(0.0, 0.0);
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                acc += self.values[k] * x[self.col_idx[k]];
            }
            *o = acc;
        }
    }
}

/// Sort coordinate entries by (row, col), merge duplicates, and build the
/// CSR index arrays.
fn compress<T, I, F>(n: usize, entries: I, merge: F) -> (Vec<usize>, Vec<usize>, Vec<T>)
where
    T: Copy,
    I: Iterator<Item = (usize, usize, T)>,
    F: Fn(T, T) -> T,
{
    let mut sorted: Vec<(usize, usize, T)> = entries.collect();
    sorted.sort_by_key(|&(i, j, _)| (i, j));

    let mut col_idx = Vec::with_capacity(sorted.len());
    let mut values: Vec<T> = Vec::with_capacity(sorted.len());
    let mut rows = Vec::with_capacity(sorted.len());

    for (i, j, v) in sorted {
        if let (Some(&last_row), Some(&last_col)) = (rows.last(), col_idx.last()) {
            if last_row == i && last_col == j {
                let last = values.last_mut().expect("parallel arrays");
                *last = merge(*last, v);
                continue;
            }
        }
        rows.push(i);
        col_idx.push(j);
        values.push(v);
    }

    let mut row_ptr = vec![0usize; n + 1];
    for &i in &rows {
        row_ptr[i + 1] += 1;
    }
    for i in 0..n {
        row_ptr[i + 1] += row_ptr[i];
    }

    (row_ptr, col_idx, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csr_matvec() {
        // [2 1; 0 3]
        let m = CsrMatrix::from_triplets(2, &[(0, 0, 2.0), (0, 1, 1.0), (1, 1, 3.0)]);
        let mut out = [0.0; 2];
        m.apply(&[1.0, 2.0], &mut out);
        assert_eq!(out, [4.0, 6.0]);
    }

    #[test]
    fn test_csr_merges_duplicates() {
        let m = CsrMatrix::from_triplets(1, &[(0, 0, 1.0), (0, 0, 2.5)]);
        assert_eq!(m.nnz(), 1);
        let mut out = [0.0];
        m.apply(&[2.0], &mut out);
        assert_eq!(out, [7.0]);
    }

    #[test]
    fn test_csr_empty_row() {
        let m = CsrMatrix::from_triplets(3, &[(0, 0, 1.0), (2, 2, 1.0)]);
        let mut out = [9.0; 3];
        m.apply(&[1.0, 1.0, 1.0], &mut out);
        assert_eq!(out, [1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_complex_csr_matvec() {
        let j = Complex64::new(0.0, 1.0);
        let m = CsrComplexMatrix::from_triplets(1, &[(0, 0, j)]);
        let mut out = [Complex64::new(0.0, 0.0)];
        m.apply(&[Complex64::new(2.0, 0.0)], &mut out);
        assert_eq!(out[0], Complex64::new(0.0, 2.0));
    }
}
