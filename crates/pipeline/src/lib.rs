//! Offline training pipeline for the content-based recommender.
//!
//! This crate provides:
//! - FeatureBuilder for turning raw rows into a deduplicated, quality-ordered corpus
//! - TfidfVectorizer for weighting each movie's feature soup
//! - A randomized truncated SVD for optional dimensionality reduction
//! - A chunked all-pairs cosine similarity engine
//! - Trainer for running all of the above and writing the model artifacts
//!
//! ## Architecture
//! A training run processes the corpus in stages:
//! 1. Rows are filtered, their soups built, then deduplicated by title
//! 2. Soups are vectorized into a sparse TF-IDF matrix
//! 3. Large corpora are reduced to dense vectors
//! 4. The similarity matrix is computed and persisted with the metadata
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{Trainer, TrainingConfig};
//! use std::path::Path;
//!
//! let trainer = Trainer::new(TrainingConfig::default());
//! let (output, saved) = trainer.train(Path::new("data"), Path::new("models"))?;
//! println!("{} movies, {} bytes", output.artifacts.len(), saved.total_bytes());
//! ```

pub mod config;
pub mod features;
pub mod reducer;
pub mod similarity;
pub mod sparse;
pub mod stop_words;
pub mod trainer;
pub mod vectorizer;

// Re-export main types
pub use config::{ReducerConfig, SimilarityConfig, TrainingConfig, VectorizerConfig};
pub use features::{BuildReport, FeatureBuilder};
pub use reducer::{Reduction, target_rank, truncated_svd};
pub use similarity::{FeatureMatrix, cosine_similarity};
pub use sparse::CsrMatrix;
pub use trainer::{Trainer, TrainingOutput, TrainingReport};
pub use vectorizer::TfidfVectorizer;
