//! Error types for the model-store crate.

use thiserror::Error;

/// Errors raised while writing or reading an artifact set
#[derive(Error, Debug)]
pub enum StoreError {
    /// A required artifact file is absent from the model directory
    #[error("Model artifact missing: {path}")]
    ArtifactMissing { path: String },

    /// I/O error while reading or writing an artifact
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON artifact (config, metadata, title index) could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary matrix artifact could not be (de)serialized
    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    /// Artifacts disagree about the number of movies or the matrix shape
    #[error("Shape mismatch in {artifact}: expected {expected}, found {found}")]
    ShapeMismatch {
        artifact: String,
        expected: String,
        found: String,
    },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, StoreError>;
