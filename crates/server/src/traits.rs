//! Core traits for candidate filtering.
//!
//! Filters judge one ranked candidate at a time so the engine can stop
//! walking the ranking as soon as enough candidates were accepted.

use data_loader::{MovieIndex, MovieMetadata};

/// A movie taken from the similarity ranking
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub index: MovieIndex,
    pub movie: &'a MovieMetadata,
    /// Similarity to the query movie
    pub score: f32,
}

/// Core trait for filtering candidates.
///
/// `Send + Sync` so a pipeline can be shared by concurrent requests.
pub trait Filter: Send + Sync {
    /// Returns the name of this filter (for logging/debugging)
    fn name(&self) -> &str;

    /// Whether `candidate` may be recommended for the `query` movie
    fn accepts(&self, candidate: &Candidate<'_>, query: &MovieMetadata) -> bool;
}
