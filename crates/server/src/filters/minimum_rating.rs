//! Filter to ensure a minimum quality threshold.

use crate::traits::{Candidate, Filter};
use data_loader::MovieMetadata;

/// Removes movies whose vote average is below `min_rating`.
///
/// A movie without a vote average never passes.
pub struct MinimumRatingFilter {
    min_rating: f32,
}

impl MinimumRatingFilter {
    pub fn new(min_rating: f32) -> Self {
        Self { min_rating }
    }
}

impl Filter for MinimumRatingFilter {
    fn name(&self) -> &str {
        "MinimumRatingFilter"
    }

    fn accepts(&self, candidate: &Candidate<'_>, _query: &MovieMetadata) -> bool {
        candidate
            .movie
            .vote_average
            .is_some_and(|avg| avg >= self.min_rating)
    }
}
