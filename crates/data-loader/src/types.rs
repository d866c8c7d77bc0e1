//! Core domain types for the movie catalog.
//!
//! Three stages of the same movie flow through the system:
//! - [`RawMovie`]: one decoded dataset row, list fields already parsed
//! - [`MovieRecord`]: a retained, normalized row carrying its feature soup
//! - [`MovieMetadata`]: the slice of a record persisted next to the model

use crate::error::DataLoadError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Type Aliases
// =============================================================================

/// Catalog identifier of a movie (the TMDB id)
pub type MovieId = i64;

/// Position of a movie in the trained corpus (row/column of the similarity matrix)
pub type MovieIndex = usize;

// =============================================================================
// Quality Tier
// =============================================================================

/// Named vote-count threshold applied before training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityTier {
    /// Minimum vote count a movie needs to survive this tier
    pub fn min_votes(self) -> u32 {
        match self {
            QualityTier::Low => 5,
            QualityTier::Medium => 50,
            QualityTier::High => 500,
        }
    }
}

impl FromStr for QualityTier {
    type Err = DataLoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(QualityTier::Low),
            "medium" => Ok(QualityTier::Medium),
            "high" => Ok(QualityTier::High),
            _ => Err(DataLoadError::InvalidValue {
                field: "quality_tier".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Raw rows
// =============================================================================

/// One row of the source dataset after decoding.
///
/// Every scalar is optional because the dataset is not trusted: a missing or
/// malformed value simply ends up as `None`. List-like columns are already
/// parsed into plain strings (un-normalized, in source order).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMovie {
    pub id: Option<MovieId>,
    pub title: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f32>,
    pub vote_count: Option<u32>,
    pub popularity: Option<f32>,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub genres: Vec<String>,
    pub keywords: Vec<String>,
    pub production_companies: Vec<String>,
    pub production_countries: Vec<String>,
    pub status: Option<String>,
    pub poster_path: Option<String>,
    pub imdb_id: Option<String>,
}

impl RawMovie {
    /// True when the row is marked as released
    pub fn is_released(&self) -> bool {
        self.status.as_deref().map(str::trim) == Some("Released")
    }
}

// =============================================================================
// Retained records
// =============================================================================

/// A movie that survived feature building.
///
/// `genres` are normalized (lowercase, no spaces), `keywords` are stemmed and
/// capped, and `soup` is the text handed to the vectorizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: Option<MovieId>,
    pub title: String,
    pub release_date: Option<String>,
    pub primary_company: Option<String>,
    pub genres: Vec<String>,
    pub keywords: Vec<String>,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub vote_average: Option<f32>,
    pub vote_count: u32,
    pub popularity: Option<f32>,
    pub imdb_id: Option<String>,
    pub poster_path: Option<String>,
    pub soup: String,
}

impl MovieRecord {
    /// Ranking key used to order the corpus: `vote_average * ln(1 + vote_count)`.
    pub fn quality_score(&self) -> f64 {
        quality_score(self.vote_average, self.vote_count)
    }
}

/// `vote_average * ln(1 + vote_count)`; a missing average scores 0.
pub fn quality_score(vote_average: Option<f32>, vote_count: u32) -> f64 {
    let average = vote_average.map(f64::from).unwrap_or(0.0);
    average * (vote_count as f64).ln_1p()
}

// =============================================================================
// Persisted metadata
// =============================================================================

/// The per-movie row stored in the artifact set and served at inference time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieMetadata {
    pub id: Option<MovieId>,
    pub title: String,
    pub release_date: Option<String>,
    pub primary_company: Option<String>,
    pub genres: Vec<String>,
    pub vote_average: Option<f32>,
    pub vote_count: u32,
    pub popularity: Option<f32>,
    pub overview: Option<String>,
    pub imdb_id: Option<String>,
    pub poster_path: Option<String>,
}

impl MovieMetadata {
    /// Release year taken from the leading `YYYY` of the release date
    pub fn release_year(&self) -> Option<i32> {
        let date = self.release_date.as_deref()?.trim();
        let year = date.get(..4)?;
        if !year.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        year.parse().ok()
    }
}

impl From<&MovieRecord> for MovieMetadata {
    fn from(record: &MovieRecord) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            release_date: record.release_date.clone(),
            primary_company: record.primary_company.clone(),
            genres: record.genres.clone(),
            vote_average: record.vote_average,
            vote_count: record.vote_count,
            popularity: record.popularity,
            overview: record.overview.clone(),
            imdb_id: record.imdb_id.clone(),
            poster_path: record.poster_path.clone(),
        }
    }
}

/// Lowercase a genre/company/country name and strip its spaces.
///
/// Example: "Science Fiction" -> "sciencefiction"
pub fn normalize_token(s: &str) -> String {
    s.to_lowercase().replace(' ', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata_with_date(date: Option<&str>) -> MovieMetadata {
        MovieMetadata {
            id: Some(1),
            title: "Heat".to_string(),
            release_date: date.map(str::to_string),
            primary_company: None,
            genres: vec![],
            vote_average: Some(7.9),
            vote_count: 6000,
            popularity: None,
            overview: None,
            imdb_id: None,
            poster_path: None,
        }
    }

    #[test]
    fn test_quality_tier_thresholds() {
        assert_eq!(QualityTier::Low.min_votes(), 5);
        assert_eq!(QualityTier::Medium.min_votes(), 50);
        assert_eq!(QualityTier::High.min_votes(), 500);
        assert_eq!(QualityTier::default(), QualityTier::Medium);
    }

    #[test]
    fn test_quality_tier_from_str() {
        assert_eq!("HIGH".parse::<QualityTier>().unwrap(), QualityTier::High);
        assert_eq!(" low ".parse::<QualityTier>().unwrap(), QualityTier::Low);
        assert!("extreme".parse::<QualityTier>().is_err());
        assert_eq!(QualityTier::Medium.to_string(), "medium");
    }

    #[test]
    fn test_release_year() {
        assert_eq!(metadata_with_date(Some("1995-12-15")).release_year(), Some(1995));
        assert_eq!(metadata_with_date(Some("2001")).release_year(), Some(2001));
        assert_eq!(metadata_with_date(Some("12/15/95")).release_year(), None);
        assert_eq!(metadata_with_date(Some("")).release_year(), None);
        assert_eq!(metadata_with_date(None).release_year(), None);
    }

    #[test]
    fn test_quality_score() {
        assert_eq!(quality_score(None, 1000), 0.0);
        assert_eq!(quality_score(Some(8.0), 0), 0.0);
        let strong = quality_score(Some(8.0), 1000);
        let weak = quality_score(Some(8.0), 10);
        assert!(strong > weak);
    }

    #[test]
    fn test_normalize_token() {
        assert_eq!(normalize_token("Science Fiction"), "sciencefiction");
        assert_eq!(normalize_token("Warner Bros. Pictures"), "warnerbros.pictures");
    }

    #[test]
    fn test_is_released() {
        let mut raw = RawMovie::default();
        assert!(!raw.is_released());
        raw.status = Some("Released".to_string());
        assert!(raw.is_released());
        raw.status = Some("Post Production".to_string());
        assert!(!raw.is_released());
    }
}
