//! Values returned by the recommendation engine.
//!
//! Everything here is display-ready (ratings, vote counts and links are
//! already formatted) and serializable, so callers can print or emit JSON
//! without touching the model.

use data_loader::{MovieId, MovieMetadata};
use serde::{Deserialize, Serialize};

use crate::format;

/// Optional constraints applied while walking the ranked candidates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendFilters {
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub min_rating: Option<f32>,
    /// Any overlap qualifies; compared case- and space-insensitively
    pub genres: Vec<String>,
    /// Skip movies from the query's primary production company
    pub exclude_same_company: bool,
}

/// One recommended movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// 1-based position in the result list
    pub rank: usize,
    pub title: String,
    pub production: String,
    pub release_date: String,
    pub genres: Vec<String>,
    pub rating: String,
    pub votes: String,
    pub similarity_score: f32,
    pub tmdb_id: Option<MovieId>,
    pub imdb_id: Option<String>,
    pub poster_url: Option<String>,
    pub google_search: String,
    pub imdb_link: String,
}

impl Recommendation {
    pub fn new(rank: usize, movie: &MovieMetadata, similarity_score: f32) -> Self {
        Self {
            rank,
            title: movie.title.clone(),
            production: format::production(movie),
            release_date: format::release_date(movie),
            genres: movie.genres.clone(),
            rating: format::rating(movie.vote_average),
            votes: format::votes(movie.vote_count),
            similarity_score,
            tmdb_id: movie.id,
            imdb_id: movie.imdb_id.clone(),
            poster_url: format::poster_url(movie.poster_path.as_deref()),
            google_search: format::google_search_url(&movie.title),
            imdb_link: format::imdb_url(movie.imdb_id.as_deref(), &movie.title),
        }
    }
}

/// Summary of the movie a query resolved to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDetails {
    pub production: String,
    pub genres: Vec<String>,
    pub rating: String,
    pub release_date: String,
}

impl From<&MovieMetadata> for QueryDetails {
    fn from(movie: &MovieMetadata) -> Self {
        Self {
            production: format::production(movie),
            genres: movie.genres.clone(),
            rating: format::rating(movie.vote_average),
            release_date: format::release_date(movie),
        }
    }
}

/// Recommendations for a resolved query; may hold zero entries when every
/// candidate was filtered out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    /// Title the query resolved to
    pub query_movie: String,
    /// True when the query only matched approximately
    pub fuzzy_match: bool,
    pub query_details: QueryDetails,
    pub total_recommendations: usize,
    pub recommendations: Vec<Recommendation>,
}

impl RecommendationResult {
    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }
}

/// Outcome of a recommendation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecommendOutcome {
    Found(RecommendationResult),
    NotFound {
        query: String,
        /// Titles containing the query, at most the configured limit
        suggestions: Vec<String>,
    },
}

impl RecommendOutcome {
    pub fn found(&self) -> Option<&RecommendationResult> {
        match self {
            RecommendOutcome::Found(result) => Some(result),
            RecommendOutcome::NotFound { .. } => None,
        }
    }
}

/// Full description of a single movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub title: String,
    pub release_date: String,
    pub production: String,
    pub genres: Vec<String>,
    pub rating: String,
    pub votes: String,
    pub popularity: String,
    pub overview: String,
    pub imdb_id: String,
    pub poster_url: Option<String>,
}

impl From<&MovieMetadata> for MovieDetails {
    fn from(movie: &MovieMetadata) -> Self {
        Self {
            title: movie.title.clone(),
            release_date: format::release_date(movie),
            production: format::production(movie),
            genres: movie.genres.clone(),
            rating: format::rating(movie.vote_average),
            votes: format::votes(movie.vote_count),
            popularity: format::popularity(movie.popularity),
            overview: format::overview(movie.overview.as_deref()),
            imdb_id: movie
                .imdb_id
                .clone()
                .unwrap_or_else(|| format::NOT_AVAILABLE.to_string()),
            poster_url: format::poster_url(movie.poster_path.as_deref()),
        }
    }
}

/// Entry of the top-rated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopRatedMovie {
    pub title: String,
    pub rating: String,
    pub votes: String,
    pub release_date: String,
    pub genres: Vec<String>,
    pub production: String,
}

impl From<&MovieMetadata> for TopRatedMovie {
    fn from(movie: &MovieMetadata) -> Self {
        Self {
            title: movie.title.clone(),
            rating: format::rating(movie.vote_average),
            votes: format::votes(movie.vote_count),
            release_date: format::release_date(movie),
            genres: movie.genres.clone(),
            production: format::production(movie),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Healthy,
    Unhealthy,
}

/// Health report for the serving layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: ServiceState,
    pub movies_loaded: usize,
    pub model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == ServiceState::Healthy
    }
}
