//! # Model Store Crate
//!
//! Persists and reloads the artifact set produced by training: the movie
//! metadata table, the similarity matrix, the title -> index map and a config
//! record other tools can inspect before using a model directory.
//!
//! The similarity matrix is written dense or sparse depending on its size,
//! but always comes back as the same dense [`SimilarityMatrix`].

pub mod artifacts;
pub mod error;
pub mod matrix;

pub use artifacts::{
    CONFIG_FILE, DEFAULT_SPARSE_THRESHOLD, METADATA_FILE, ModelArtifactSet, ModelConfig,
    SaveReport, StoreConfig, TITLE_INDEX_FILE,
};
pub use error::{Result, StoreError};
pub use matrix::{MatrixFormat, SimilarityMatrix};
