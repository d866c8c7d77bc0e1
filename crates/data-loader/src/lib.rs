//! # Data Loader Crate
//!
//! This crate reads the raw TMDB-style movie dataset into typed rows.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (RawMovie, MovieRecord, MovieMetadata, QualityTier)
//! - **parser**: Cell-level parsers (list-like columns, numbers, text)
//! - **dataset**: CSV loading with per-field fallbacks and a LoadReport
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::load_dataset;
//! use std::path::Path;
//!
//! let (movies, report) = load_dataset(Path::new("data/TMDB_movie_dataset_v11.csv"))?;
//! println!("{} rows, {} degraded cells", report.rows_read, report.field_fallbacks);
//! ```
//!
//! Malformed cells never abort a load: lists degrade to empty, scalars to
//! `None`. Only an unreadable file or a header without `title` is an error.

// Public modules
pub mod dataset;
pub mod error;
pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use dataset::{DEFAULT_DATASET_FILE, LoadReport, load_dataset, read_movies, resolve_dataset_path};
pub use error::{DataLoadError, Result};
pub use types::{
    // Type aliases
    MovieId,
    MovieIndex,
    // Core types
    MovieMetadata,
    MovieRecord,
    QualityTier,
    RawMovie,
    // Helpers
    normalize_token,
    quality_score,
};
