//! Serving side of the content-based movie recommender.
//!
//! This crate contains the recommendation engine that answers queries
//! against a trained artifact set, and the handle that loads that set once
//! per process.
//!
//! ## Example Usage
//! ```ignore
//! use server::{EngineConfig, ModelHandle, RecommendFilters};
//!
//! let handle = ModelHandle::new("models", EngineConfig::default());
//! let engine = handle.recommender().await?;
//! let outcome = engine.recommend("Inception", 10, &RecommendFilters::default());
//! ```

pub mod config;
pub mod filter_pipeline;
pub mod filters;
pub mod format;
pub mod fuzzy;
pub mod handle;
pub mod recommender;
pub mod traits;
pub mod types;

pub use config::EngineConfig;
pub use filter_pipeline::FilterPipeline;
pub use handle::ModelHandle;
pub use recommender::{Recommender, Resolved};
pub use traits::{Candidate, Filter};
pub use types::{
    HealthStatus, MovieDetails, QueryDetails, RecommendFilters, RecommendOutcome, Recommendation,
    RecommendationResult, ServiceState, TopRatedMovie,
};
