//! The FilterPipeline chains candidate filters.
//!
//! Filters run against the similarity ranking in order, so they reduce
//! recall instead of re-ranking: the walk stops once enough candidates pass.

use crate::filters::{GenreFilter, MinimumRatingFilter, SameCompanyFilter, YearRangeFilter};
use crate::traits::{Candidate, Filter};
use crate::types::RecommendFilters;
use data_loader::MovieMetadata;

/// Chains multiple filters together using the builder pattern.
///
/// ## Usage
/// ```ignore
/// let pipeline = FilterPipeline::new()
///     .add_filter(YearRangeFilter::new(Some(2000), None))
///     .add_filter(MinimumRatingFilter::new(7.0));
///
/// let accepted = pipeline.select(ranked, query_movie, 10);
/// ```
pub struct FilterPipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterPipeline {
    /// Create a new empty FilterPipeline.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the pipeline (builder pattern).
    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Pipeline for the request filters; unset constraints add no filter.
    pub fn from_filters(filters: &RecommendFilters) -> Self {
        let mut pipeline = Self::new();
        if filters.min_year.is_some() || filters.max_year.is_some() {
            pipeline = pipeline.add_filter(YearRangeFilter::new(filters.min_year, filters.max_year));
        }
        if let Some(min_rating) = filters.min_rating {
            pipeline = pipeline.add_filter(MinimumRatingFilter::new(min_rating));
        }
        if !filters.genres.is_empty() {
            pipeline = pipeline.add_filter(GenreFilter::new(&filters.genres));
        }
        if filters.exclude_same_company {
            pipeline = pipeline.add_filter(SameCompanyFilter);
        }
        pipeline
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Walk `ranked` in order and keep the first `limit` accepted candidates.
    ///
    /// ## Algorithm
    /// 1. For each candidate, find the first filter rejecting it
    /// 2. Count the rejection against that filter, or accept the candidate
    /// 3. Stop as soon as `limit` candidates were accepted
    pub fn select<'a, I>(&self, ranked: I, query: &MovieMetadata, limit: usize) -> Vec<Candidate<'a>>
    where
        I: IntoIterator<Item = Candidate<'a>>,
    {
        let mut accepted = Vec::with_capacity(limit);
        if limit == 0 {
            return accepted;
        }
        let mut rejected = vec![0usize; self.filters.len()];

        for candidate in ranked {
            match self.filters.iter().position(|f| !f.accepts(&candidate, query)) {
                Some(i) => rejected[i] += 1,
                None => {
                    accepted.push(candidate);
                    if accepted.len() >= limit {
                        break;
                    }
                }
            }
        }

        for (filter, count) in self.filters.iter().zip(&rejected) {
            tracing::debug!("Filter {} rejected {} candidates", filter.name(), count);
        }
        accepted
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}
