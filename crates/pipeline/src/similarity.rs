//! All-pairs cosine similarity.
//!
//! Rows are L2-normalized once, then every output row `i` holds the dot
//! products of row `i` with every row. Large corpora are processed in
//! fixed-size row blocks written into disjoint ranges of one pre-allocated
//! matrix; each cell is computed by the same code either way, so chunking
//! never changes a single bit of the result.

use model_store::SimilarityMatrix;
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use tracing::{info, instrument};

use crate::config::SimilarityConfig;
use crate::sparse::CsrMatrix;

/// Feature vectors fed to the similarity engine.
#[derive(Debug, Clone)]
pub enum FeatureMatrix {
    /// Raw TF-IDF weights
    Sparse(CsrMatrix),
    /// Reduced vectors from the truncated SVD
    Dense(Array2<f64>),
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        match self {
            FeatureMatrix::Sparse(m) => m.shape().0,
            FeatureMatrix::Dense(m) => m.nrows(),
        }
    }

    pub fn n_cols(&self) -> usize {
        match self {
            FeatureMatrix::Sparse(m) => m.shape().1,
            FeatureMatrix::Dense(m) => m.ncols(),
        }
    }
}

/// Feature rows scaled to unit length; zero rows stay zero.
enum Normalized<'a> {
    Sparse {
        matrix: &'a CsrMatrix,
        scales: Vec<f64>,
    },
    Dense(Array2<f64>),
}

impl<'a> Normalized<'a> {
    fn new(features: &'a FeatureMatrix) -> Self {
        match features {
            FeatureMatrix::Sparse(m) => {
                let scales = (0..m.shape().0)
                    .map(|i| inverse_norm(m.row(i).1.iter().map(|v| v * v).sum()))
                    .collect();
                Normalized::Sparse { matrix: m, scales }
            }
            FeatureMatrix::Dense(m) => {
                let mut normed = m.as_standard_layout().into_owned();
                for mut row in normed.rows_mut() {
                    let scale = inverse_norm(row.dot(&row));
                    row.mapv_inplace(|v| v * scale);
                }
                Normalized::Dense(normed)
            }
        }
    }

    /// Fill `out` (one full output row) with the similarities of row `i`.
    fn fill_row(&self, i: usize, out: &mut [f32], scratch: &mut Vec<f64>) {
        match self {
            Normalized::Sparse { matrix, scales } => {
                // Scatter row i, then gather against every other row
                let (cols_i, vals_i) = matrix.row(i);
                scratch.clear();
                scratch.resize(matrix.shape().1, 0.0);
                for (&c, &v) in cols_i.iter().zip(vals_i) {
                    scratch[c] = v;
                }
                for (j, cell) in out.iter_mut().enumerate() {
                    let (cols_j, vals_j) = matrix.row(j);
                    let mut dot = 0.0f64;
                    for (&c, &v) in cols_j.iter().zip(vals_j) {
                        dot += scratch[c] * v;
                    }
                    *cell = to_score(dot * (scales[i] * scales[j]));
                }
                for &c in cols_i {
                    scratch[c] = 0.0;
                }
            }
            Normalized::Dense(m) => {
                let row_i: ArrayView1<f64> = m.row(i);
                for (cell, row_j) in out.iter_mut().zip(m.rows()) {
                    *cell = to_score(row_i.dot(&row_j));
                }
            }
        }
    }
}

fn inverse_norm(squared: f64) -> f64 {
    if squared > 0.0 { 1.0 / squared.sqrt() } else { 0.0 }
}

fn to_score(value: f64) -> f32 {
    value.clamp(-1.0, 1.0) as f32
}

/// Cosine similarity of every pair of rows, as a dense `n x n` f32 matrix.
///
/// Above `chunk_threshold` rows the work is split into blocks of
/// `chunk_size` rows; rows inside a block are computed in parallel.
#[instrument(skip_all, fields(rows = features.n_rows(), cols = features.n_cols()))]
pub fn cosine_similarity(features: &FeatureMatrix, config: &SimilarityConfig) -> SimilarityMatrix {
    let n = features.n_rows();
    let normalized = Normalized::new(features);
    let mut output = SimilarityMatrix::zeros(n);
    if n == 0 {
        return output;
    }

    let block_rows = if n > config.chunk_threshold {
        config.chunk_size.max(1)
    } else {
        n
    };
    let n_chunks = n.div_ceil(block_rows);
    if n_chunks > 1 {
        info!("Computing similarity in {} chunks of {} rows", n_chunks, block_rows);
    } else {
        info!("Computing cosine similarity");
    }

    for (chunk, block) in output.values_mut().chunks_mut(block_rows * n).enumerate() {
        let start = chunk * block_rows;
        block
            .par_chunks_mut(n)
            .enumerate()
            .for_each_init(Vec::new, |scratch, (offset, out_row)| {
                normalized.fill_row(start + offset, out_row, scratch);
            });
        if (chunk + 1) % 5 == 0 {
            info!("Processed {}/{} chunks", chunk + 1, n_chunks);
        }
    }

    output
}
