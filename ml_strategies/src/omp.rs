//! Non-negative orthogonal matching pursuit with a ridge term.

use ml_core::SelectionError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Atoms picked by `nonneg_omp` and their strictly positive coefficients, in pick order.
#[derive(Debug, Clone, PartialEq)]
pub struct OmpSolution {
    pub atoms: Vec<usize>,
    pub coefs: Vec<f32>,
}

/// Greedily approximates `target` as a sparse non-negative combination of the rows of `atoms`.
///
/// At every step the unpicked atom most positively correlated with the residual joins the
/// support, and the coefficients of the whole support are re-fitted by solving
/// `(AᵀA + lam·I) x = Aᵀb`. The factorization of `AᵀA + lam·I` is grown one row per step.
///
/// Stops after `nnz` atoms, once the residual norm is at most `eps`, when no atom correlates
/// positively with the residual or when the next atom is linearly dependent on the support.
/// Coefficients that end up non-positive are discarded.
///
/// # Errors
/// Returns `SelectionError::Optimization` if the inputs or the fit become non-finite.
pub fn nonneg_omp(
    atoms: ArrayView2<f32>,
    target: ArrayView1<f32>,
    nnz: usize,
    lam: f32,
    eps: f32,
) -> Result<OmpSolution, SelectionError> {
    if atoms.ncols() != target.len() {
        return Err(SelectionError::Optimization(format!(
            "atoms have {} features but the target has {}",
            atoms.ncols(),
            target.len()
        )));
    }

    let atoms: Array2<f64> = atoms.mapv(f64::from);
    let target: Array1<f64> = target.mapv(f64::from);
    let lam = f64::from(lam);
    let eps = f64::from(eps);

    if atoms.iter().chain(target.iter()).any(|v| !v.is_finite()) {
        return Err(SelectionError::Optimization("non-finite OMP input".into()));
    }

    let n = atoms.nrows();
    let mut picked = vec![false; n];
    let mut support: Vec<usize> = Vec::new();
    let mut chol = Cholesky::default();
    let mut atb: Vec<f64> = Vec::new();
    let mut coefs: Vec<f64> = Vec::new();
    let mut residual = target.clone();

    for _ in 0..nnz.min(n) {
        if residual.dot(&residual).sqrt() <= eps {
            break;
        }

        let projections = atoms.dot(&residual);
        let best = projections
            .iter()
            .enumerate()
            .filter(|(i, _)| !picked[*i])
            .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(&a.0)));

        let Some((best, &value)) = best else {
            break;
        };

        if value <= 0. {
            break;
        }

        let atom = atoms.row(best);
        let cross: Vec<f64> = support.iter().map(|&j| atoms.row(j).dot(&atom)).collect();
        if !chol.push(&cross, atom.dot(&atom) + lam) {
            break;
        }

        picked[best] = true;
        support.push(best);
        atb.push(atom.dot(&target));
        coefs = chol.solve(&atb);

        residual = target.clone();
        for (&j, &c) in support.iter().zip(&coefs) {
            residual.scaled_add(-c, &atoms.row(j));
        }

        if residual.iter().any(|v| !v.is_finite()) {
            return Err(SelectionError::Optimization("OMP fit diverged".into()));
        }
    }

    let (atoms, coefs): (Vec<usize>, Vec<f32>) = support
        .into_iter()
        .zip(coefs)
        .map(|(i, c)| (i, c as f32))
        .filter(|&(_, c)| c > 0. && c.is_finite())
        .unzip();

    Ok(OmpSolution { atoms, coefs })
}

/// A lower triangular factor `L` of a symmetric positive definite matrix, grown by rows.
#[derive(Debug, Default)]
struct Cholesky {
    rows: Vec<Vec<f64>>,
}

impl Cholesky {
    /// Appends one row and column to the factored matrix.
    ///
    /// `cross` holds the new column's entries against the existing ones and `diag` the new
    /// diagonal entry. Returns `false`, leaving the factor untouched, if the extended matrix is
    /// not numerically positive definite.
    fn push(&mut self, cross: &[f64], diag: f64) -> bool {
        let w = self.forward(cross);
        let d2 = diag - w.iter().map(|v| v * v).sum::<f64>();

        if !d2.is_finite() || d2 <= diag.abs() * 1e-10 {
            return false;
        }

        let mut row = w;
        row.push(d2.sqrt());
        self.rows.push(row);
        true
    }

    /// Solves `L y = b`.
    fn forward(&self, b: &[f64]) -> Vec<f64> {
        let mut y = Vec::with_capacity(b.len());

        for (i, row) in self.rows.iter().enumerate() {
            let acc: f64 = row[..i].iter().zip(&y).map(|(l, y)| l * y).sum();
            y.push((b[i] - acc) / row[i]);
        }

        y
    }

    /// Solves `L Lᵀ x = b`.
    fn solve(&self, b: &[f64]) -> Vec<f64> {
        let y = self.forward(b);
        let n = y.len();
        let mut x = vec![0.; n];

        for i in (0..n).rev() {
            let acc: f64 = (i + 1..n).map(|k| self.rows[k][i] * x[k]).sum();
            x[i] = (y[i] - acc) / self.rows[i][i];
        }

        x
    }
}
