//! AC small-signal frequency-domain analysis.
//!
//! Takes the small-signal system `(G, C, b)` linearized at the DC operating
//! point and solves the complex system `(G + jωC)·x = b` once per frequency.
//! No iteration is involved; nonlinear elements are already reduced to their
//! operating-point conductances by the stamping layer.

use std::f64::consts::PI;

use nalgebra::DVector;
use num_complex::Complex64;

use crate::error::Result;
use crate::solver_select::{SolverConfig, solve_complex_system};
use voltaic_core::MnaSystem;

/// A single solved frequency point.
#[derive(Debug, Clone)]
pub struct AcPoint {
    /// Frequency (Hz).
    pub frequency: f64,
    /// Complex solution vector (node voltages, then branch currents).
    pub solution: DVector<Complex64>,
}

/// Ordered AC sweep solution.
#[derive(Debug, Clone)]
pub struct AcResult {
    /// One point per requested frequency, in request order.
    pub points: Vec<AcPoint>,
    /// Number of node-voltage unknowns.
    pub num_nodes: usize,
}

impl AcResult {
    /// Complex voltage at a node index across all frequencies.
    pub fn voltage_at(&self, node: Option<usize>) -> Vec<(f64, Complex64)> {
        self.points
            .iter()
            .map(|p| {
                let v = match node {
                    Some(i) if i < self.num_nodes => p.solution[i],
                    _ => Complex64::new(0.0, 0.0),
                };
                (p.frequency, v)
            })
            .collect()
    }

    /// Voltage magnitude in dB at a node index across all frequencies.
    pub fn magnitude_db(&self, node: usize) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|p| (p.frequency, 20.0 * p.solution[node].norm().log10()))
            .collect()
    }

    /// Voltage phase in degrees at a node index across all frequencies.
    pub fn phase_deg(&self, node: usize) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|p| (p.frequency, p.solution[node].arg().to_degrees()))
            .collect()
    }

    /// All frequency values.
    pub fn frequencies(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.frequency).collect()
    }
}

/// Sweep the linearized system over the given frequencies.
///
/// `mna` must hold the small-signal stamp: conductances (including
/// operating-point conductances of nonlinear elements) and source stimuli
/// in `G`/`b`, reactances in `C`.
pub fn solve_ac(mna: &MnaSystem, frequencies: &[f64], solver: &SolverConfig) -> Result<AcResult> {
    let n = mna.size();
    let mut points = Vec::with_capacity(frequencies.len());

    for &freq in frequencies {
        let omega = 2.0 * PI * freq;

        let mut triplets: Vec<(usize, usize, Complex64)> =
            Vec::with_capacity(mna.g_triplets().len() + mna.c_triplets().len());
        for &(i, j, v) in mna.g_triplets() {
            triplets.push((i, j, Complex64::new(v, 0.0)));
        }
        for &(i, j, v) in mna.c_triplets() {
            triplets.push((i, j, Complex64::new(0.0, omega * v)));
        }

        let rhs = DVector::from_iterator(n, mna.rhs().iter().map(|&v| Complex64::new(v, 0.0)));

        let solution = solve_complex_system(n, &triplets, &rhs, solver)?;
        points.push(AcPoint {
            frequency: freq,
            solution,
        });
    }

    log::debug!("ac: solved {} frequency points", points.len());
    Ok(AcResult {
        points,
        num_nodes: mna.num_nodes(),
    })
}

/// Logarithmically spaced frequencies, `points_per_decade` per decade from
/// `fstart` to `fstop` inclusive.
pub fn decade_sweep(fstart: f64, fstop: f64, points_per_decade: usize) -> Vec<f64> {
    let decades = (fstop / fstart).log10();
    let total = (points_per_decade as f64 * decades).ceil() as usize + 1;
    (0..total)
        .map(|i| fstart * 10.0_f64.powf(i as f64 / points_per_decade as f64))
        .filter(|&f| f <= fstop * 1.001)
        .collect()
}
