//! MNA system triple `(G, C, b)`.
//!
//! `G` holds conductances and source/branch couplings, `C` holds the
//! reactive (capacitance/inductance) terms, `b` is the independent source
//! vector. Matrix entries accumulate in coordinate (triplet) form and are
//! compressed on demand: to dense for direct solves, to CSR for iterative
//! solves.
//!
//! Row/column layout: non-ground nodes first (0..num_nodes), then branch
//! current variables (num_nodes..num_nodes+num_branches).

use nalgebra::{DMatrix, DVector};

/// Coordinate-form matrix entry: (row, col, value).
pub type Triplet = (usize, usize, f64);

/// The assembled system for one stamping pass.
#[derive(Debug, Clone)]
pub struct MnaSystem {
    num_nodes: usize,
    num_branches: usize,
    g: Vec<Triplet>,
    c: Vec<Triplet>,
    rhs: DVector<f64>,
}

impl MnaSystem {
    /// Create an empty system.
    ///
    /// `num_nodes` excludes ground; `num_branches` counts auxiliary current
    /// unknowns (voltage sources and inductors).
    pub fn new(num_nodes: usize, num_branches: usize) -> Self {
        Self {
            num_nodes,
            num_branches,
            g: Vec::new(),
            c: Vec::new(),
            rhs: DVector::zeros(num_nodes + num_branches),
        }
    }

    /// Total unknown count (nodes + branch currents).
    pub fn size(&self) -> usize {
        self.num_nodes + self.num_branches
    }

    /// Number of node-voltage unknowns.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Number of branch-current unknowns.
    pub fn num_branches(&self) -> usize {
        self.num_branches
    }

    /// Matrix row of a branch variable.
    pub fn branch_row(&self, branch: usize) -> usize {
        self.num_nodes + branch
    }

    /// Reset all accumulated entries.
    pub fn clear(&mut self) {
        self.g.clear();
        self.c.clear();
        self.rhs.fill(0.0);
    }

    /// Stamp a conductance between two nodes (`None` = ground).
    ///
    /// Self-conductance adds on the diagonal, mutual conductance subtracts
    /// off-diagonal:
    /// `G[i,i] += g`, `G[j,j] += g`, `G[i,j] -= g`, `G[j,i] -= g`.
    pub fn stamp_conductance(&mut self, node_i: Option<usize>, node_j: Option<usize>, g: f64) {
        stencil(&mut self.g, node_i, node_j, g);
    }

    /// Stamp a capacitance between two nodes into `C` with the same stencil.
    pub fn stamp_capacitance(&mut self, node_i: Option<usize>, node_j: Option<usize>, c: f64) {
        stencil(&mut self.c, node_i, node_j, c);
    }

    /// Stamp an independent current source driving current from `node_i`
    /// to `node_j` (positive current leaves `i`, enters `j`).
    pub fn stamp_current_source(
        &mut self,
        node_i: Option<usize>,
        node_j: Option<usize>,
        current: f64,
    ) {
        if let Some(i) = node_i {
            self.rhs[i] -= current;
        }
        if let Some(j) = node_j {
            self.rhs[j] += current;
        }
    }

    /// Stamp a voltage source `V(pos) - V(neg) = voltage` using branch
    /// variable `branch`: ±1 couplings between the node rows and the branch
    /// row, and the source value on the branch RHS.
    pub fn stamp_voltage_source(
        &mut self,
        node_pos: Option<usize>,
        node_neg: Option<usize>,
        branch: usize,
        voltage: f64,
    ) {
        let row = self.branch_row(branch);
        if let Some(p) = node_pos {
            self.g.push((p, row, 1.0));
            self.g.push((row, p, 1.0));
        }
        if let Some(n) = node_neg {
            self.g.push((n, row, -1.0));
            self.g.push((row, n, -1.0));
        }
        self.rhs[row] = voltage;
    }

    /// Stamp an inductor with branch equation `V(pos) - V(neg) = L·dI/dt`:
    /// voltage-source-style couplings in `G`, `-L` on the branch diagonal
    /// of `C`.
    pub fn stamp_inductor(
        &mut self,
        node_pos: Option<usize>,
        node_neg: Option<usize>,
        branch: usize,
        inductance: f64,
    ) {
        let row = self.branch_row(branch);
        if let Some(p) = node_pos {
            self.g.push((p, row, 1.0));
            self.g.push((row, p, 1.0));
        }
        if let Some(n) = node_neg {
            self.g.push((n, row, -1.0));
            self.g.push((row, n, -1.0));
        }
        self.c.push((row, row, -inductance));
    }

    /// Accumulated `G` entries in coordinate form.
    pub fn g_triplets(&self) -> &[Triplet] {
        &self.g
    }

    /// Accumulated `C` entries in coordinate form.
    pub fn c_triplets(&self) -> &[Triplet] {
        &self.c
    }

    /// The independent source vector.
    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }

    /// Mutable access to the source vector.
    pub fn rhs_mut(&mut self) -> &mut DVector<f64> {
        &mut self.rhs
    }

    /// Compress `G` to a dense matrix.
    pub fn g_dense(&self) -> DMatrix<f64> {
        dense_from_triplets(self.size(), &self.g)
    }

    /// Compress `C` to a dense matrix.
    pub fn c_dense(&self) -> DMatrix<f64> {
        dense_from_triplets(self.size(), &self.c)
    }
}

fn stencil(out: &mut Vec<Triplet>, node_i: Option<usize>, node_j: Option<usize>, value: f64) {
    if let Some(i) = node_i {
        out.push((i, i, value));
    }
    if let Some(j) = node_j {
        out.push((j, j, value));
    }
    if let (Some(i), Some(j)) = (node_i, node_j) {
        out.push((i, j, -value));
        out.push((j, i, -value));
    }
}

/// Sum coordinate entries into a dense n×n matrix.
pub fn dense_from_triplets(n: usize, triplets: &[Triplet]) -> DMatrix<f64> {
    let mut m = DMatrix::zeros(n, n);
    for &(i, j, v) in triplets {
        m[(i, j)] += v;
    }
    m
}

/// Multiply coordinate entries by a vector: `out = A·x`.
pub fn triplet_matvec(n: usize, triplets: &[Triplet], x: &DVector<f64>) -> DVector<f64> {
    let mut out = DVector::zeros(n);
    for &(i, j, v) in triplets {
        out[i] += v * x[j];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conductance_stencil() {
        let mut sys = MnaSystem::new(2, 0);
        sys.stamp_conductance(Some(0), Some(1), 1.0);
        let g = sys.g_dense();
        assert_eq!(g[(0, 0)], 1.0);
        assert_eq!(g[(1, 1)], 1.0);
        assert_eq!(g[(0, 1)], -1.0);
        assert_eq!(g[(1, 0)], -1.0);
    }

    #[test]
    fn test_conductance_to_ground() {
        let mut sys = MnaSystem::new(2, 0);
        sys.stamp_conductance(Some(0), None, 0.01);
        let g = sys.g_dense();
        assert_eq!(g[(0, 0)], 0.01);
        assert_eq!(g[(1, 1)], 0.0);
    }

    #[test]
    fn test_parallel_conductances_accumulate() {
        let mut sys = MnaSystem::new(1, 0);
        sys.stamp_conductance(Some(0), None, 0.001);
        sys.stamp_conductance(Some(0), None, 0.001);
        assert!((sys.g_dense()[(0, 0)] - 0.002).abs() < 1e-15);
    }

    #[test]
    fn test_current_source() {
        let mut sys = MnaSystem::new(2, 0);
        sys.stamp_current_source(None, Some(0), 1.0);
        assert_eq!(sys.rhs()[0], 1.0);
        assert_eq!(sys.rhs()[1], 0.0);
    }

    #[test]
    fn test_voltage_source() {
        let mut sys = MnaSystem::new(2, 1);
        sys.stamp_voltage_source(Some(0), None, 0, 5.0);
        let g = sys.g_dense();
        assert_eq!(g[(0, 2)], 1.0);
        assert_eq!(g[(2, 0)], 1.0);
        assert_eq!(sys.rhs()[2], 5.0);
    }

    #[test]
    fn test_capacitor_goes_to_c() {
        let mut sys = MnaSystem::new(1, 0);
        sys.stamp_capacitance(Some(0), None, 1e-6);
        assert_eq!(sys.g_dense()[(0, 0)], 0.0);
        assert!((sys.c_dense()[(0, 0)] - 1e-6).abs() < 1e-20);
    }

    #[test]
    fn test_inductor_branch_form() {
        let mut sys = MnaSystem::new(2, 1);
        sys.stamp_inductor(Some(0), Some(1), 0, 1e-3);
        let g = sys.g_dense();
        let c = sys.c_dense();
        assert_eq!(g[(0, 2)], 1.0);
        assert_eq!(g[(2, 0)], 1.0);
        assert_eq!(g[(1, 2)], -1.0);
        assert_eq!(g[(2, 1)], -1.0);
        assert!((c[(2, 2)] + 1e-3).abs() < 1e-15);
    }

    #[test]
    fn test_clear() {
        let mut sys = MnaSystem::new(1, 0);
        sys.stamp_conductance(Some(0), None, 1.0);
        sys.stamp_current_source(None, Some(0), 1.0);
        sys.clear();
        assert!(sys.g_triplets().is_empty());
        assert_eq!(sys.rhs()[0], 0.0);
    }

    #[test]
    fn test_triplet_matvec() {
        let triplets = vec![(0, 0, 2.0), (0, 1, 1.0), (1, 1, 3.0)];
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let y = triplet_matvec(2, &triplets, &x);
        assert_eq!(y[0], 4.0);
        assert_eq!(y[1], 6.0);
    }
}
