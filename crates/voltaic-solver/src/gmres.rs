//! Restarted GMRES for real and complex systems.
//!
//! The matrix enters only through the operator traits, so the same solver
//! serves dense, CSR, or matrix-free representations. Arnoldi with modified
//! Gram-Schmidt; the least-squares problem is updated incrementally with
//! Givens rotations.

use num_complex::Complex64 as C64;

use crate::operator::{ComplexOperator, RealOperator};

/// GMRES solver configuration.
#[derive(Debug, Clone)]
pub struct GmresConfig {
    /// Maximum total iterations before giving up.
    pub max_iter: usize,
    /// Convergence tolerance (relative residual).
    pub tol: f64,
    /// Krylov subspace dimension before restart.
    pub restart: usize,
}

impl Default for GmresConfig {
    fn default() -> Self {
        Self {
            max_iter: 500,
            tol: 1e-10,
            restart: 30,
        }
    }
}

/// Result of a GMRES solve.
#[derive(Debug, Clone)]
pub struct GmresResult<T> {
    /// Solution vector (best iterate if not converged).
    pub x: Vec<T>,
    /// Iterations performed.
    pub iterations: usize,
    /// Final relative residual.
    pub residual: f64,
    /// Whether the tolerance was reached.
    pub converged: bool,
}

/// Solve A·x = b with restarted GMRES, real arithmetic.
pub fn solve_gmres_real(
    op: &dyn RealOperator,
    b: &[f64],
    config: &GmresConfig,
) -> GmresResult<f64> {
    let n = op.dim();
    assert_eq!(b.len(), n, "RHS dimension mismatch");

    let b_norm = norm_real(b);
    if b_norm < 1e-30 {
        return GmresResult {
            x: vec![0.0; n],
            iterations: 0,
            residual: 0.0,
            converged: true,
        };
    }

    let mut x = vec![0.0; n];
    let mut total_iter = 0;
    let mut last_residual = f64::INFINITY;

    while total_iter < config.max_iter {
        // r = b - A·x
        let mut ax = vec![0.0; n];
        op.apply(&x, &mut ax);
        let mut r: Vec<f64> = b.iter().zip(&ax).map(|(&bi, &axi)| bi - axi).collect();
        let r_norm = norm_real(&r);
        last_residual = r_norm / b_norm;

        if last_residual < config.tol {
            return GmresResult {
                x,
                iterations: total_iter,
                residual: last_residual,
                converged: true,
            };
        }

        let m = config.restart.min(n).max(1);
        let mut v: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
        let mut h = vec![vec![0.0; m + 1]; m]; // h[col][row]

        let inv = 1.0 / r_norm;
        for ri in r.iter_mut() {
            *ri *= inv;
        }
        v.push(r);

        let mut g = vec![0.0; m + 1];
        g[0] = r_norm;

        let mut cs = vec![0.0; m];
        let mut sn = vec![0.0; m];

        let mut k = 0;
        while k < m && total_iter < config.max_iter {
            total_iter += 1;

            let mut w = vec![0.0; n];
            op.apply(&v[k], &mut w);

            // Modified Gram-Schmidt
            for j in 0..=k {
                let hjk = dot_real(&v[j], &w);
                h[k][j] = hjk;
                for i in 0..n {
                    w[i] -= hjk * v[j][i];
                }
            }

            let w_norm = norm_real(&w);
            h[k][k + 1] = w_norm;

            // Lucky breakdown (w_norm ≈ 0): the subspace already contains
            // the solution. Rotations still run so H stays triangular.
            let breakdown = w_norm < 1e-30;
            if !breakdown {
                let inv_w = 1.0 / w_norm;
                v.push(w.iter().map(|&wi| wi * inv_w).collect());
            }

            // Apply previous rotations to the new column
            for j in 0..k {
                let temp = cs[j] * h[k][j] + sn[j] * h[k][j + 1];
                h[k][j + 1] = -sn[j] * h[k][j] + cs[j] * h[k][j + 1];
                h[k][j] = temp;
            }

            let (c, s) = givens_real(h[k][k], h[k][k + 1]);
            cs[k] = c;
            sn[k] = s;
            h[k][k] = c * h[k][k] + s * h[k][k + 1];
            h[k][k + 1] = 0.0;

            let temp_g = c * g[k] + s * g[k + 1];
            g[k + 1] = -s * g[k] + c * g[k + 1];
            g[k] = temp_g;

            k += 1;
            if breakdown || g[k].abs() / b_norm < config.tol {
                break;
            }
        }

        // Back-substitute H·y = g and update x
        let mut y = vec![0.0; k];
        for i in (0..k).rev() {
            let mut sum = g[i];
            for j in (i + 1)..k {
                sum -= h[j][i] * y[j];
            }
            if h[i][i].abs() > 1e-30 {
                y[i] = sum / h[i][i];
            }
        }
        for (j, &yj) in y.iter().enumerate() {
            for i in 0..n {
                x[i] += yj * v[j][i];
            }
        }
    }

    // Final residual for the diagnostic
    let mut ax = vec![0.0; n];
    op.apply(&x, &mut ax);
    let r: Vec<f64> = b.iter().zip(&ax).map(|(&bi, &axi)| bi - axi).collect();
    let rel = norm_real(&r) / b_norm;

    GmresResult {
        x,
        iterations: total_iter,
        residual: rel.min(last_residual),
        converged: rel < config.tol,
    }
}

/// Solve A·x = b with restarted GMRES, complex arithmetic.
pub fn solve_gmres_complex(
    op: &dyn ComplexOperator,
    b: &[C64],
    config: &GmresConfig,
) -> GmresResult<C64> {
    let n = op.dim();
    assert_eq!(b.len(), n, "RHS dimension mismatch");

    let zero = C64::new(0.0, 0.0);
    let b_norm = norm_complex(b);
    if b_norm < 1e-30 {
        return GmresResult {
            x: vec![zero; n],
            iterations: 0,
            residual: 0.0,
            converged: true,
        };
    }

    let mut x = vec![zero; n];
    let mut total_iter = 0;
    let mut last_residual = f64::INFINITY;

    while total_iter < config.max_iter {
        let mut ax = vec![zero; n];
        op.apply(&x, &mut ax);
        let mut r: Vec<C64> = b.iter().zip(&ax).map(|(&bi, &axi)| bi - axi).collect();
        let r_norm = norm_complex(&r);
        last_residual = r_norm / b_norm;

        if last_residual < config.tol {
            return GmresResult {
                x,
                iterations: total_iter,
                residual: last_residual,
                converged: true,
            };
        }

        let m = config.restart.min(n).max(1);
        let mut v: Vec<Vec<C64>> = Vec::with_capacity(m + 1);
        let mut h = vec![vec![zero; m + 1]; m];

        let inv = 1.0 / r_norm;
        for ri in r.iter_mut() {
            *ri *= inv;
        }
        v.push(r);

        let mut g = vec![zero; m + 1];
        g[0] = C64::new(r_norm, 0.0);

        let mut cs = vec![zero; m];
        let mut sn = vec![zero; m];

        let mut k = 0;
        while k < m && total_iter < config.max_iter {
            total_iter += 1;

            let mut w = vec![zero; n];
            op.apply(&v[k], &mut w);

            for j in 0..=k {
                let hjk = conj_dot(&v[j], &w);
                h[k][j] = hjk;
                for i in 0..n {
                    w[i] -= hjk * v[j][i];
                }
            }

            let w_norm = norm_complex(&w);
            h[k][k + 1] = C64::new(w_norm, 0.0);

            let breakdown = w_norm < 1e-30;
            if !breakdown {
                let inv_w = 1.0 / w_norm;
                v.push(w.iter().map(|&wi| wi * inv_w).collect());
            }

            for j in 0..k {
                let temp = cs[j].conj() * h[k][j] + sn[j].conj() * h[k][j + 1];
                h[k][j + 1] = -sn[j] * h[k][j] + cs[j] * h[k][j + 1];
                h[k][j] = temp;
            }

            let (c, s) = givens_complex(h[k][k], h[k][k + 1]);
            cs[k] = c;
            sn[k] = s;
            h[k][k] = c.conj() * h[k][k] + s.conj() * h[k][k + 1];
            h[k][k + 1] = zero;

            let temp_g = c.conj() * g[k] + s.conj() * g[k + 1];
            g[k + 1] = -s * g[k] + c * g[k + 1];
            g[k] = temp_g;

            k += 1;
            if breakdown || g[k].norm() / b_norm < config.tol {
                break;
            }
        }

        let mut y = vec![zero; k];
        for i in (0..k).rev() {
            let mut sum = g[i];
            for j in (i + 1)..k {
                sum -= h[j][i] * y[j];
            }
            if h[i][i].norm() > 1e-30 {
                y[i] = sum / h[i][i];
            }
        }
        for (j, &yj) in y.iter().enumerate() {
            for i in 0..n {
                x[i] += yj * v[j][i];
            }
        }
    }

    let mut ax = vec![zero; n];
    op.apply(&x, &mut ax);
    let r: Vec<C64> = b.iter().zip(&ax).map(|(&bi, &axi)| bi - axi).collect();
    let rel = norm_complex(&r) / b_norm;

    GmresResult {
        x,
        iterations: total_iter,
        residual: rel.min(last_residual),
        converged: rel < config.tol,
    }
}

fn norm_real(v: &[f64]) -> f64 {
    v.iter().map(|&x| x * x).sum::<f64>().sqrt()
}

fn dot_real(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(&ai, &bi)| ai * bi).sum()
}

fn norm_complex(v: &[C64]) -> f64 {
    v.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt()
}

fn conj_dot(a: &[C64], b: &[C64]) -> C64 {
    a.iter().zip(b).map(|(ai, bi)| ai.conj() * bi).sum()
}

/// Rotation (c, s) with c² + s² = 1 and -s·a + c·b = 0.
fn givens_real(a: f64, b: f64) -> (f64, f64) {
    if b == 0.0 {
        (1.0, 0.0)
    } else if a == 0.0 {
        (0.0, 1.0)
    } else {
        let r = (a * a + b * b).sqrt();
        (a.abs() / r, a.signum() * b / r)
    }
}

/// Complex rotation with |c|² + |s|² = 1, c real, and -s·a + c·b = 0.
fn givens_complex(a: C64, b: C64) -> (C64, C64) {
    if b.norm() == 0.0 {
        (C64::new(1.0, 0.0), C64::new(0.0, 0.0))
    } else if a.norm() == 0.0 {
        (C64::new(0.0, 0.0), C64::new(1.0, 0.0))
    } else {
        let r = (a.norm_sqr() + b.norm_sqr()).sqrt();
        let c = C64::new(a.norm() / r, 0.0);
        let s = c * b / a;
        (c, s)
    }
}
