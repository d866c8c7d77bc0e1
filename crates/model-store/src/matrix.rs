//! Similarity matrix and its two on-disk encodings.
//!
//! In memory the matrix is always dense, row-major `f32`. On disk it is
//! written either dense or as CSR (non-zero entries only); the loader turns
//! both back into the same dense [`SimilarityMatrix`].

use crate::error::{Result, StoreError};
use data_loader::MovieIndex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Dense, row-major matrix of cosine similarities.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f32>,
}

impl SimilarityMatrix {
    /// Wrap row-major values. `values.len()` must equal `rows * cols`.
    pub fn new(rows: usize, cols: usize, values: Vec<f32>) -> Result<Self> {
        if element_count(rows, cols) != Some(values.len()) {
            return Err(StoreError::ShapeMismatch {
                artifact: "similarity matrix".to_string(),
                expected: format!("{}x{} values", rows, cols),
                found: format!("{} values", values.len()),
            });
        }
        Ok(Self { rows, cols, values })
    }

    /// Square matrix of zeros, ready to be filled row range by row range.
    pub fn zeros(n: usize) -> Self {
        Self {
            rows: n,
            cols: n,
            values: vec![0.0; n * n],
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of stored elements (`rows * cols`)
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Similarities of movie `i` against every movie in the corpus
    pub fn row(&self, i: MovieIndex) -> &[f32] {
        &self.values[i * self.cols..(i + 1) * self.cols]
    }

    pub fn get(&self, i: MovieIndex, j: MovieIndex) -> f32 {
        self.values[i * self.cols + j]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Mutable access for writers that fill disjoint row ranges
    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// Count of entries that are not exactly zero
    pub fn nnz(&self) -> usize {
        self.values.iter().filter(|v| **v != 0.0).count()
    }

    /// Size of the in-memory values in bytes
    pub fn nbytes(&self) -> usize {
        self.values.len() * std::mem::size_of::<f32>()
    }
}

/// `rows * cols`, or `None` when that many `f32`s cannot be allocated
fn element_count(rows: usize, cols: usize) -> Option<usize> {
    let n = rows.checked_mul(cols)?;
    let bytes = n.checked_mul(std::mem::size_of::<f32>())?;
    (bytes <= isize::MAX as usize).then_some(n)
}

// =============================================================================
// Storage formats
// =============================================================================

/// How the similarity matrix is encoded on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatrixFormat {
    Dense,
    Sparse,
}

impl MatrixFormat {
    /// Sparse above `sparse_threshold` elements, dense otherwise
    pub fn for_matrix(matrix: &SimilarityMatrix, sparse_threshold: usize) -> Self {
        if matrix.len() > sparse_threshold {
            MatrixFormat::Sparse
        } else {
            MatrixFormat::Dense
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            MatrixFormat::Dense => "similarity_matrix.bin",
            MatrixFormat::Sparse => "similarity_matrix.sparse.bin",
        }
    }
}

#[derive(Serialize)]
struct DenseRef<'a> {
    rows: usize,
    cols: usize,
    values: &'a [f32],
}

#[derive(Deserialize)]
struct DenseOwned {
    rows: usize,
    cols: usize,
    values: Vec<f32>,
}

/// Compressed sparse row encoding; exact zeros are not stored.
#[derive(Serialize, Deserialize)]
struct SparseEncoded {
    rows: usize,
    cols: usize,
    indptr: Vec<u64>,
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl SparseEncoded {
    fn from_dense(matrix: &SimilarityMatrix) -> Self {
        let mut indptr = Vec::with_capacity(matrix.rows + 1);
        let mut indices = Vec::new();
        let mut values = Vec::new();
        indptr.push(0);

        for i in 0..matrix.rows {
            for (j, &v) in matrix.row(i).iter().enumerate() {
                if v != 0.0 {
                    indices.push(j as u32);
                    values.push(v);
                }
            }
            indptr.push(values.len() as u64);
        }

        Self {
            rows: matrix.rows,
            cols: matrix.cols,
            indptr,
            indices,
            values,
        }
    }

    fn into_dense(self) -> Result<SimilarityMatrix> {
        let malformed = |found: String| StoreError::ShapeMismatch {
            artifact: MatrixFormat::Sparse.file_name().to_string(),
            expected: format!("CSR layout for {}x{}", self.rows, self.cols),
            found,
        };
        let Some(len) = element_count(self.rows, self.cols) else {
            return Err(malformed("a header too large to allocate".to_string()));
        };
        if self.rows.checked_add(1) != Some(self.indptr.len())
            || self.indices.len() != self.values.len()
        {
            return Err(malformed(format!(
                "{} row pointers, {} indices, {} values",
                self.indptr.len(),
                self.indices.len(),
                self.values.len()
            )));
        }

        let mut dense = vec![0.0f32; len];
        for i in 0..self.rows {
            let start = self.indptr[i] as usize;
            let end = self.indptr[i + 1] as usize;
            if start > end || end > self.values.len() {
                return Err(malformed(format!("row {} spans {}..{}", i, start, end)));
            }
            for k in start..end {
                let j = self.indices[k] as usize;
                if j >= self.cols {
                    return Err(malformed(format!("column {} in row {}", j, i)));
                }
                dense[i * self.cols + j] = self.values[k];
            }
        }
        SimilarityMatrix::new(self.rows, self.cols, dense)
    }
}

/// Write `matrix` into `dir` in the given format; returns the file size in bytes.
pub fn write_matrix(dir: &Path, matrix: &SimilarityMatrix, format: MatrixFormat) -> Result<u64> {
    let path = dir.join(format.file_name());
    let mut writer = BufWriter::new(File::create(&path)?);
    match format {
        MatrixFormat::Dense => bincode::serialize_into(
            &mut writer,
            &DenseRef {
                rows: matrix.rows,
                cols: matrix.cols,
                values: &matrix.values,
            },
        )?,
        MatrixFormat::Sparse => {
            bincode::serialize_into(&mut writer, &SparseEncoded::from_dense(matrix))?
        }
    }
    writer.flush()?;
    Ok(std::fs::metadata(&path)?.len())
}

/// Read the similarity matrix from `dir`, probing for the sparse file first.
pub fn read_matrix(dir: &Path) -> Result<(SimilarityMatrix, MatrixFormat)> {
    let sparse_path = dir.join(MatrixFormat::Sparse.file_name());
    if sparse_path.is_file() {
        let reader = BufReader::new(File::open(&sparse_path)?);
        let encoded: SparseEncoded = bincode::deserialize_from(reader)?;
        return Ok((encoded.into_dense()?, MatrixFormat::Sparse));
    }

    let dense_path = dir.join(MatrixFormat::Dense.file_name());
    if !dense_path.is_file() {
        return Err(StoreError::ArtifactMissing {
            path: dense_path.display().to_string(),
        });
    }
    let reader = BufReader::new(File::open(&dense_path)?);
    let owned: DenseOwned = bincode::deserialize_from(reader)?;
    let matrix = SimilarityMatrix::new(owned.rows, owned.cols, owned.values)?;
    Ok((matrix, MatrixFormat::Dense))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SimilarityMatrix {
        SimilarityMatrix::new(
            3,
            3,
            vec![1.0, 0.5, 0.0, 0.5, 1.0, 0.25, 0.0, 0.25, 1.0],
        )
        .unwrap()
    }

    #[test]
    fn test_shape_checked() {
        assert!(SimilarityMatrix::new(2, 2, vec![1.0; 3]).is_err());
        let m = sample();
        assert_eq!(m.shape(), (3, 3));
        assert_eq!(m.row(1), &[0.5, 1.0, 0.25]);
        assert_eq!(m.get(2, 1), 0.25);
        assert_eq!(m.nnz(), 7);
        assert_eq!(m.nbytes(), 36);
    }

    #[test]
    fn test_format_selection() {
        let m = sample();
        assert_eq!(MatrixFormat::for_matrix(&m, 9), MatrixFormat::Dense);
        assert_eq!(MatrixFormat::for_matrix(&m, 8), MatrixFormat::Sparse);
    }

    #[test]
    fn test_dense_and_sparse_load_identically() {
        let m = sample();
        let dense_dir = tempfile::tempdir().unwrap();
        let sparse_dir = tempfile::tempdir().unwrap();

        write_matrix(dense_dir.path(), &m, MatrixFormat::Dense).unwrap();
        write_matrix(sparse_dir.path(), &m, MatrixFormat::Sparse).unwrap();

        let (from_dense, f1) = read_matrix(dense_dir.path()).unwrap();
        let (from_sparse, f2) = read_matrix(sparse_dir.path()).unwrap();
        assert_eq!(f1, MatrixFormat::Dense);
        assert_eq!(f2, MatrixFormat::Sparse);
        assert_eq!(from_dense, m);
        assert_eq!(from_sparse, m);
    }

    #[test]
    fn test_sparse_probed_first() {
        let dir = tempfile::tempdir().unwrap();
        let other = SimilarityMatrix::zeros(3);
        write_matrix(dir.path(), &other, MatrixFormat::Dense).unwrap();
        write_matrix(dir.path(), &sample(), MatrixFormat::Sparse).unwrap();

        let (loaded, format) = read_matrix(dir.path()).unwrap();
        assert_eq!(format, MatrixFormat::Sparse);
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_oversized_sparse_header_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for (rows, cols) in [(1, usize::MAX / 2), (2, usize::MAX)] {
            let encoded = SparseEncoded {
                rows,
                cols,
                indptr: vec![0; 2],
                indices: vec![],
                values: vec![],
            };
            let path = dir.path().join(MatrixFormat::Sparse.file_name());
            bincode::serialize_into(File::create(&path).unwrap(), &encoded).unwrap();

            assert!(matches!(
                read_matrix(dir.path()),
                Err(StoreError::ShapeMismatch { .. })
            ));
        }
    }

    #[test]
    fn test_missing_matrix() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_matrix(dir.path()),
            Err(StoreError::ArtifactMissing { .. })
        ));
    }
}
