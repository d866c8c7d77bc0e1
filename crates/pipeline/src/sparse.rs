//! Compressed sparse row matrix for the term-weight matrix.
//!
//! Only the operations the pipeline needs are here: row access, products with
//! a dense block (for the randomized SVD) and per-column variance.

use ndarray::Array2;
use rayon::prelude::*;

/// Row-major sparse matrix; column indices are sorted within each row.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    rows: usize,
    cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Build from per-row `(column, value)` lists. Entries are sorted by column.
    pub fn from_rows(cols: usize, rows: Vec<Vec<(usize, f64)>>) -> Self {
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        let mut values = Vec::new();
        indptr.push(0);

        let n_rows = rows.len();
        for mut row in rows {
            row.sort_by_key(|(col, _)| *col);
            for (col, value) in row {
                debug_assert!(col < cols);
                indices.push(col);
                values.push(value);
            }
            indptr.push(values.len());
        }

        Self {
            rows: n_rows,
            cols,
            indptr,
            indices,
            values,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Percentage of cells that are not stored
    pub fn sparsity(&self) -> f64 {
        let cells = self.rows * self.cols;
        if cells == 0 {
            return 100.0;
        }
        (1.0 - self.nnz() as f64 / cells as f64) * 100.0
    }

    /// Column indices and values of row `i`
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let range = self.indptr[i]..self.indptr[i + 1];
        (&self.indices[range.clone()], &self.values[range])
    }

    /// `self * dense`, where `dense` is `cols x k`
    pub fn dot_dense(&self, dense: &Array2<f64>) -> Array2<f64> {
        let k = dense.ncols();
        let mut out = Array2::<f64>::zeros((self.rows, k));
        if let Some(slice) = out.as_slice_mut() {
            slice.par_chunks_mut(k.max(1)).enumerate().for_each(|(i, out_row)| {
                let (cols, vals) = self.row(i);
                for (&c, &v) in cols.iter().zip(vals) {
                    for (o, d) in out_row.iter_mut().zip(dense.row(c)) {
                        *o += v * d;
                    }
                }
            });
        }
        out
    }

    /// `self^T * dense`, where `dense` is `rows x k`
    pub fn transpose_dot_dense(&self, dense: &Array2<f64>) -> Array2<f64> {
        let k = dense.ncols();
        let mut out = Array2::<f64>::zeros((self.cols, k));
        for i in 0..self.rows {
            let (cols, vals) = self.row(i);
            let dense_row = dense.row(i);
            for (&c, &v) in cols.iter().zip(vals) {
                let mut out_row = out.row_mut(c);
                out_row.scaled_add(v, &dense_row);
            }
        }
        out
    }

    /// Sum over columns of the population variance of each column
    pub fn total_column_variance(&self) -> f64 {
        if self.rows == 0 {
            return 0.0;
        }
        let n = self.rows as f64;
        let mut sums = vec![0.0f64; self.cols];
        let mut squares = vec![0.0f64; self.cols];
        for (&c, &v) in self.indices.iter().zip(&self.values) {
            sums[c] += v;
            squares[c] += v * v;
        }
        sums.iter()
            .zip(&squares)
            .map(|(s, sq)| {
                let mean = s / n;
                sq / n - mean * mean
            })
            .sum()
    }
}
