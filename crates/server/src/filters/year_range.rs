//! Filter for a release-year window.

use crate::traits::{Candidate, Filter};
use data_loader::MovieMetadata;

/// Keeps movies released within `[min_year, max_year]` (either bound optional).
///
/// The year is the leading `YYYY` of the release date; a movie whose year
/// cannot be read is rejected whenever a bound is set.
pub struct YearRangeFilter {
    min_year: Option<i32>,
    max_year: Option<i32>,
}

impl YearRangeFilter {
    pub fn new(min_year: Option<i32>, max_year: Option<i32>) -> Self {
        Self { min_year, max_year }
    }
}

impl Filter for YearRangeFilter {
    fn name(&self) -> &str {
        "YearRangeFilter"
    }

    fn accepts(&self, candidate: &Candidate<'_>, _query: &MovieMetadata) -> bool {
        if self.min_year.is_none() && self.max_year.is_none() {
            return true;
        }
        let Some(year) = candidate.movie.release_year() else {
            return false;
        };
        self.min_year.is_none_or(|min| year >= min) && self.max_year.is_none_or(|max| year <= max)
    }
}
