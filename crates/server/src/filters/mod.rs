//! Filter implementations for the candidate pipeline.
//!
//! This module contains all the concrete filter implementations
//! that can be composed into a FilterPipeline.

pub mod genre;
pub mod minimum_rating;
pub mod same_company;
pub mod year_range;

// Re-export for convenience
pub use genre::GenreFilter;
pub use minimum_rating::MinimumRatingFilter;
pub use same_company::SameCompanyFilter;
pub use year_range::YearRangeFilter;

#[cfg(test)]
pub(crate) fn test_movie(title: &str, vote_average: f32, release_date: &str) -> data_loader::MovieMetadata {
    data_loader::MovieMetadata {
        id: Some(1),
        title: title.to_string(),
        release_date: Some(release_date.to_string()),
        primary_company: Some("Studio".to_string()),
        genres: vec!["drama".to_string()],
        vote_average: Some(vote_average),
        vote_count: 100,
        popularity: None,
        overview: None,
        imdb_id: None,
        poster_path: None,
    }
}
