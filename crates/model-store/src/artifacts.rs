//! The persisted bundle produced by training and read by the recommender.
//!
//! Layout of a model directory:
//! - `config.json`: [`ModelConfig`], read first by anything validating an artifact set
//! - `movie_metadata.json`: one [`MovieMetadata`] per corpus position
//! - `title_to_idx.json`: flat `{ "title": index }` object
//! - `similarity_matrix.bin` or `similarity_matrix.sparse.bin`

use crate::error::{Result, StoreError};
use crate::matrix::{self, MatrixFormat, SimilarityMatrix};
use data_loader::{MovieIndex, MovieMetadata, QualityTier};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

pub const CONFIG_FILE: &str = "config.json";
pub const METADATA_FILE: &str = "movie_metadata.json";
pub const TITLE_INDEX_FILE: &str = "title_to_idx.json";

/// Element count above which the matrix is written sparse
pub const DEFAULT_SPARSE_THRESHOLD: usize = 10_000_000;

/// Settings for writing an artifact set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub sparse_threshold: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sparse_threshold: DEFAULT_SPARSE_THRESHOLD,
        }
    }
}

/// Description of a trained model, written as `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub n_movies: usize,
    pub use_reduction: bool,
    /// Rank actually used by the reducer; `None` when reduction was skipped
    pub n_components: Option<usize>,
    pub matrix_shape: (usize, usize),
    pub dataset: String,
    pub quality_tier: QualityTier,
    pub vocabulary_size: usize,
    pub explained_variance: Option<f64>,
}

/// What `save` wrote
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub matrix_format: MatrixFormat,
    /// (file name, size in bytes) for every artifact written
    pub files: Vec<(String, u64)>,
}

impl SaveReport {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|(_, size)| size).sum()
    }
}

/// Metadata table, similarity matrix, title index and config of one trained model.
///
/// Immutable once built: the serving side only ever reads from it.
#[derive(Debug, Clone)]
pub struct ModelArtifactSet {
    metadata: Vec<MovieMetadata>,
    similarity: SimilarityMatrix,
    title_index: HashMap<String, MovieIndex>,
    config: ModelConfig,
}

impl ModelArtifactSet {
    /// Assemble an artifact set, deriving the title index from `metadata`.
    ///
    /// Fails when the matrix is not `n x n` for `n = metadata.len()`.
    pub fn new(
        metadata: Vec<MovieMetadata>,
        similarity: SimilarityMatrix,
        config: ModelConfig,
    ) -> Result<Self> {
        let mut title_index = HashMap::with_capacity(metadata.len());
        for (idx, movie) in metadata.iter().enumerate() {
            title_index.entry(movie.title.clone()).or_insert(idx);
        }
        let set = Self {
            metadata,
            similarity,
            title_index,
            config,
        };
        set.validate()?;
        Ok(set)
    }

    /// True when `dir` holds an artifact set (its config file exists)
    pub fn exists(dir: &Path) -> bool {
        dir.join(CONFIG_FILE).is_file()
    }

    pub fn metadata(&self) -> &[MovieMetadata] {
        &self.metadata
    }

    pub fn movie(&self, idx: MovieIndex) -> Option<&MovieMetadata> {
        self.metadata.get(idx)
    }

    pub fn similarity(&self) -> &SimilarityMatrix {
        &self.similarity
    }

    pub fn title_index(&self) -> &HashMap<String, MovieIndex> {
        &self.title_index
    }

    /// Exact title lookup
    pub fn index_of(&self, title: &str) -> Option<MovieIndex> {
        self.title_index.get(title).copied()
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    fn validate(&self) -> Result<()> {
        let n = self.metadata.len();
        if self.config.n_movies != n {
            return Err(shape_mismatch(CONFIG_FILE, n, self.config.n_movies));
        }
        if self.similarity.shape() != (n, n) {
            let (rows, cols) = self.similarity.shape();
            return Err(StoreError::ShapeMismatch {
                artifact: "similarity matrix".to_string(),
                expected: format!("{}x{}", n, n),
                found: format!("{}x{}", rows, cols),
            });
        }
        if let Some((title, &idx)) = self.title_index.iter().find(|(_, idx)| **idx >= n) {
            return Err(StoreError::ShapeMismatch {
                artifact: TITLE_INDEX_FILE.to_string(),
                expected: format!("index < {}", n),
                found: format!("{} -> {}", title, idx),
            });
        }
        Ok(())
    }

    /// Write every artifact into `dir` (created if needed).
    ///
    /// A matrix file of the other format left over from a previous run is
    /// removed so the loader's sparse-first probe cannot pick up stale data.
    pub fn save(&self, dir: &Path, store: &StoreConfig) -> Result<SaveReport> {
        fs::create_dir_all(dir)?;
        info!("Saving model artifacts to {:?}", dir);

        // A run that fails part way must not leave an older config behind
        let config_path = dir.join(CONFIG_FILE);
        if config_path.is_file() {
            fs::remove_file(&config_path)?;
        }

        let mut files = Vec::new();
        files.push((METADATA_FILE.to_string(), write_json(dir, METADATA_FILE, &self.metadata)?));
        files.push((
            TITLE_INDEX_FILE.to_string(),
            write_json(dir, TITLE_INDEX_FILE, &self.title_index)?,
        ));

        let format = MatrixFormat::for_matrix(&self.similarity, store.sparse_threshold);
        let stale = match format {
            MatrixFormat::Dense => MatrixFormat::Sparse,
            MatrixFormat::Sparse => MatrixFormat::Dense,
        };
        let stale_path = dir.join(stale.file_name());
        if stale_path.is_file() {
            debug!("Removing stale {:?}", stale_path);
            fs::remove_file(&stale_path)?;
        }
        let matrix_bytes = matrix::write_matrix(dir, &self.similarity, format)?;
        info!(
            "Saved similarity matrix as {:?} ({} non-zero, {:.1} MB)",
            format,
            self.similarity.nnz(),
            matrix_bytes as f64 / 1024.0 / 1024.0
        );
        files.push((format.file_name().to_string(), matrix_bytes));

        // Config last: its presence marks the directory as a complete artifact set
        files.push((CONFIG_FILE.to_string(), write_json(dir, CONFIG_FILE, &self.config)?));

        let report = SaveReport {
            matrix_format: format,
            files,
        };
        for (name, size) in &report.files {
            debug!("  {} ({} bytes)", name, size);
        }
        info!(
            "Total model size: {:.1} MB",
            report.total_bytes() as f64 / 1024.0 / 1024.0
        );
        Ok(report)
    }

    /// Read an artifact set back from `dir`.
    ///
    /// Every file must be present and mutually consistent; nothing partial is
    /// ever returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config: ModelConfig = read_json(dir, CONFIG_FILE)?;
        let metadata: Vec<MovieMetadata> = read_json(dir, METADATA_FILE)?;
        let title_index: HashMap<String, MovieIndex> = read_json(dir, TITLE_INDEX_FILE)?;
        let (similarity, format) = matrix::read_matrix(dir)?;
        debug!("Loaded {:?} similarity matrix {:?}", format, similarity.shape());

        let set = Self {
            metadata,
            similarity,
            title_index,
            config,
        };
        set.validate()?;
        info!(
            "Loaded {} movies from {}",
            set.config.n_movies, set.config.dataset
        );
        Ok(set)
    }
}

fn shape_mismatch(artifact: &str, expected: usize, found: usize) -> StoreError {
    StoreError::ShapeMismatch {
        artifact: artifact.to_string(),
        expected: format!("{} movies", expected),
        found: format!("{} movies", found),
    }
}

fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<u64> {
    let path = dir.join(name);
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(fs::metadata(&path)?.len())
}

fn read_json<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T> {
    let path = dir.join(name);
    if !path.is_file() {
        return Err(StoreError::ArtifactMissing {
            path: path.display().to_string(),
        });
    }
    let reader = BufReader::new(File::open(&path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(title: &str) -> MovieMetadata {
        MovieMetadata {
            id: Some(1),
            title: title.to_string(),
            release_date: None,
            primary_company: None,
            genres: vec!["drama".to_string()],
            vote_average: Some(7.0),
            vote_count: 100,
            popularity: None,
            overview: None,
            imdb_id: None,
            poster_path: None,
        }
    }

    fn config(n: usize) -> ModelConfig {
        ModelConfig {
            n_movies: n,
            use_reduction: false,
            n_components: None,
            matrix_shape: (n, n),
            dataset: "test".to_string(),
            quality_tier: QualityTier::Low,
            vocabulary_size: 10,
            explained_variance: None,
        }
    }

    fn artifact_set() -> ModelArtifactSet {
        let similarity =
            SimilarityMatrix::new(2, 2, vec![1.0, 0.3, 0.3, 1.0]).unwrap();
        ModelArtifactSet::new(vec![movie("Heat"), movie("Ronin")], similarity, config(2)).unwrap()
    }

    #[test]
    fn test_title_index_derived() {
        let set = artifact_set();
        assert_eq!(set.index_of("Ronin"), Some(1));
        assert_eq!(set.index_of("ronin"), None);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let similarity = SimilarityMatrix::zeros(3);
        let err = ModelArtifactSet::new(vec![movie("Heat"), movie("Ronin")], similarity, config(2));
        assert!(matches!(err, Err(StoreError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_round_trip_dense_and_sparse() {
        let set = artifact_set();
        for threshold in [DEFAULT_SPARSE_THRESHOLD, 1] {
            let dir = tempfile::tempdir().unwrap();
            let report = set
                .save(dir.path(), &StoreConfig { sparse_threshold: threshold })
                .unwrap();
            assert_eq!(report.files.len(), 4);
            assert!(report.total_bytes() > 0);
            assert!(ModelArtifactSet::exists(dir.path()));

            let loaded = ModelArtifactSet::load(dir.path()).unwrap();
            assert_eq!(loaded.len(), 2);
            assert_eq!(loaded.similarity(), set.similarity());
            assert_eq!(loaded.config(), set.config());
            assert_eq!(loaded.metadata(), set.metadata());
            assert_eq!(loaded.index_of("Heat"), Some(0));
        }
    }

    #[test]
    fn test_resave_replaces_other_format() {
        let set = artifact_set();
        let dir = tempfile::tempdir().unwrap();
        set.save(dir.path(), &StoreConfig { sparse_threshold: 1 }).unwrap();
        let report = set.save(dir.path(), &StoreConfig::default()).unwrap();

        assert_eq!(report.matrix_format, MatrixFormat::Dense);
        assert!(!dir.path().join(MatrixFormat::Sparse.file_name()).exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_write_is_reported() {
        let set = artifact_set();
        let dir = tempfile::tempdir().unwrap();
        set.save(dir.path(), &StoreConfig::default()).unwrap();
        assert!(ModelArtifactSet::exists(dir.path()));

        // Every write to /dev/full fails with ENOSPC once the buffer is flushed
        let index_path = dir.path().join(TITLE_INDEX_FILE);
        fs::remove_file(&index_path).unwrap();
        std::os::unix::fs::symlink("/dev/full", &index_path).unwrap();

        assert!(matches!(
            set.save(dir.path(), &StoreConfig::default()),
            Err(StoreError::Io(_))
        ));
        assert!(!ModelArtifactSet::exists(dir.path()));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_matrix_write_is_reported() {
        let set = artifact_set();
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(
            "/dev/full",
            dir.path().join(MatrixFormat::Dense.file_name()),
        )
        .unwrap();

        assert!(set.save(dir.path(), &StoreConfig::default()).is_err());
        assert!(!ModelArtifactSet::exists(dir.path()));
    }

    #[test]
    fn test_missing_artifact() {
        let set = artifact_set();
        let dir = tempfile::tempdir().unwrap();
        set.save(dir.path(), &StoreConfig::default()).unwrap();
        fs::remove_file(dir.path().join(TITLE_INDEX_FILE)).unwrap();

        assert!(matches!(
            ModelArtifactSet::load(dir.path()),
            Err(StoreError::ArtifactMissing { .. })
        ));
        let empty = tempfile::tempdir().unwrap();
        assert!(!ModelArtifactSet::exists(empty.path()));
        assert!(ModelArtifactSet::load(empty.path()).is_err());
    }
}
