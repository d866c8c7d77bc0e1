//! Truncated SVD of the term-weight matrix.
//!
//! Randomized range finder (Halko, Martinsson & Tropp) with a few power
//! iterations, followed by an exact eigendecomposition (nalgebra) of the
//! small projected Gram matrix. Only the reduced row vectors `U * Sigma` are kept:
//! the similarity engine never needs to project new documents.

use anyhow::{Result, bail};
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument};

use crate::config::ReducerConfig;
use crate::sparse::CsrMatrix;

/// Output of a reduction run
#[derive(Debug, Clone)]
pub struct Reduction {
    /// One dense row per movie, `n_components` columns
    pub features: Array2<f64>,
    pub n_components: usize,
    /// Share of the input's total variance kept by the components
    pub explained_variance_ratio: f64,
}

/// Rank to reduce a `rows x cols` matrix to, or `None` when reduction is skipped.
///
/// Only corpora larger than `min_rows` are reduced; the configured rank is
/// clamped to `rows - 1` and `cols - 1`.
pub fn target_rank(config: &ReducerConfig, (rows, cols): (usize, usize)) -> Option<usize> {
    if rows <= config.min_rows {
        return None;
    }
    let rank = config
        .n_components
        .min(rows.saturating_sub(1))
        .min(cols.saturating_sub(1));
    (rank > 0).then_some(rank)
}

/// Project `matrix` onto its top `rank` singular directions.
#[instrument(skip_all, fields(shape = ?matrix.shape(), rank = rank))]
pub fn truncated_svd(matrix: &CsrMatrix, rank: usize, config: &ReducerConfig) -> Result<Reduction> {
    let (rows, cols) = matrix.shape();
    if rank == 0 || rank > rows.min(cols) {
        bail!("Cannot reduce a {}x{} matrix to rank {}", rows, cols, rank);
    }
    let width = (rank + config.n_oversamples).min(rows).min(cols);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let omega = gaussian(cols, width, &mut rng);

    let mut q = orthonormalize(matrix.dot_dense(&omega));
    for iteration in 0..config.n_iter {
        let z = orthonormalize(matrix.transpose_dot_dense(&q));
        q = orthonormalize(matrix.dot_dense(&z));
        debug!("Power iteration {}/{}", iteration + 1, config.n_iter);
    }

    // B = Q^T M, kept transposed; its Gram matrix B B^T is width x width
    let bt = matrix.transpose_dot_dense(&q);
    let gram = bt.t().dot(&bt);
    let (eigenvalues, eigenvectors) = symmetric_eigen(&gram);

    let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));
    order.truncate(rank);

    // U * Sigma = Q * W * Sigma, one column per kept component
    let mut scaled = Array2::<f64>::zeros((width, rank));
    for (out_col, &src) in order.iter().enumerate() {
        let sigma = eigenvalues[src].max(0.0).sqrt();
        let mut column = scaled.column_mut(out_col);
        column.assign(&eigenvectors.column(src));
        column.mapv_inplace(|v| v * sigma);
    }
    let features = q.dot(&scaled);

    let total_variance = matrix.total_column_variance();
    let explained: f64 = features.var_axis(Axis(0), 0.0).sum();
    let explained_variance_ratio = if total_variance > 0.0 {
        explained / total_variance
    } else {
        0.0
    };
    info!(
        "Reduced to {:?}, explained variance ratio {:.3}",
        features.dim(),
        explained_variance_ratio
    );

    Ok(Reduction {
        features,
        n_components: rank,
        explained_variance_ratio,
    })
}

/// Standard normal samples via Box-Muller
fn gaussian(rows: usize, cols: usize, rng: &mut StdRng) -> Array2<f64> {
    Array2::from_shape_simple_fn((rows, cols), || {
        let u1: f64 = rng.random_range(f64::EPSILON..1.0);
        let u2: f64 = rng.random_range(0.0..1.0);
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    })
}

/// Orthonormal basis of the column space (modified Gram-Schmidt).
///
/// Columns that are numerically dependent on earlier ones become zero.
fn orthonormalize(a: Array2<f64>) -> Array2<f64> {
    // Work on the transpose so each basis vector is a contiguous row
    let mut basis = a.t().as_standard_layout().into_owned();
    for j in 0..basis.nrows() {
        let (done, mut rest) = basis.view_mut().split_at(Axis(0), j);
        let mut current = rest.row_mut(0);
        for prev in done.rows() {
            let projection = prev.dot(&current);
            current.scaled_add(-projection, &prev);
        }
        let norm = current.dot(&current).sqrt();
        if norm > 1e-10 {
            current.mapv_inplace(|v| v / norm);
        } else {
            current.fill(0.0);
        }
    }
    basis.t().as_standard_layout().into_owned()
}

/// Eigenvalues and eigenvectors (as columns) of a symmetric matrix.
fn symmetric_eigen(a: &Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let n = a.nrows();
    let matrix = DMatrix::from_fn(n, n, |i, j| a[[i, j]]);
    let eigen = SymmetricEigen::new(matrix);

    let vectors = eigen.eigenvectors;
    let eigenvectors = Array2::from_shape_fn((n, n), |(i, j)| vectors[(i, j)]);
    (eigen.eigenvalues.iter().copied().collect(), eigenvectors)
}
