//! # Recommendation Engine
//!
//! Serves every read-only query against a loaded artifact set:
//! 1. Resolve the query title (exact, then fuzzy)
//! 2. Rank all other movies by similarity to it
//! 3. Walk the ranking through the request filters
//! 4. Format the accepted movies
//!
//! Alongside plain ranking it offers MMR diversity re-ranking, a top-rated
//! listing, movie details and title search.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, info};

use data_loader::{MovieIndex, MovieMetadata, normalize_token};
use model_store::ModelArtifactSet;

use crate::config::EngineConfig;
use crate::filter_pipeline::FilterPipeline;
use crate::filters::genre::genres_overlap;
use crate::fuzzy;
use crate::traits::Candidate;
use crate::types::{
    MovieDetails, QueryDetails, RecommendFilters, RecommendOutcome, Recommendation,
    RecommendationResult, TopRatedMovie,
};

/// A query title resolved to a corpus position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub index: MovieIndex,
    /// False when the title only matched approximately
    pub exact: bool,
}

/// Read-only recommendation engine over one artifact set.
#[derive(Debug, Clone)]
pub struct Recommender {
    artifacts: Arc<ModelArtifactSet>,
    config: EngineConfig,
}

impl Recommender {
    pub fn new(artifacts: Arc<ModelArtifactSet>, config: EngineConfig) -> Self {
        Self { artifacts, config }
    }

    pub fn artifacts(&self) -> &ModelArtifactSet {
        &self.artifacts
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Exact title lookup, then the best fuzzy match above the threshold.
    pub fn resolve(&self, title: &str) -> Option<Resolved> {
        if let Some(index) = self.artifacts.index_of(title) {
            return Some(Resolved { index, exact: true });
        }
        let titles = self.artifacts.metadata().iter().map(|m| m.title.as_str());
        let (matched, score) = fuzzy::best_match(title, titles, self.config.fuzzy_threshold)?;
        info!("Found closest match: '{}' for '{}' ({:.2})", matched, title, score);
        let index = self.artifacts.index_of(matched)?;
        Some(Resolved { index, exact: false })
    }

    /// Top `n` movies similar to `title` that pass `filters`.
    ///
    /// Filters are applied while walking the ranking, so a restrictive filter
    /// yields fewer results rather than lower-ranked ones.
    pub fn recommend(&self, title: &str, n: usize, filters: &RecommendFilters) -> RecommendOutcome {
        let Some(resolved) = self.resolve(title) else {
            return self.not_found(title);
        };
        let Some(query) = self.artifacts.movie(resolved.index) else {
            return self.not_found(title);
        };

        let pipeline = FilterPipeline::from_filters(filters);
        let ranked = self.ranked(resolved.index);
        let candidates = ranked.iter().filter_map(|&(index, score)| {
            Some(Candidate {
                index,
                movie: self.artifacts.movie(index)?,
                score,
            })
        });
        let accepted = pipeline.select(candidates, query, n);
        debug!(
            "{} of {} requested recommendations survived {} filters",
            accepted.len(),
            n,
            pipeline.len()
        );

        let recommendations = accepted
            .iter()
            .enumerate()
            .map(|(rank, c)| Recommendation::new(rank + 1, c.movie, c.score))
            .collect();
        RecommendOutcome::Found(self.result(query, resolved, recommendations))
    }

    /// Maximal Marginal Relevance re-ranking.
    ///
    /// ## Algorithm
    /// Repeat up to `n` times over the unselected candidates (every movie but
    /// the query): score each as
    /// `(1 - diversity) * sim(candidate, query) - diversity * max sim(candidate, selected)`
    /// (the max is 0 while nothing is selected) and select the first highest.
    /// A diversity of 0 reproduces the plain ranking.
    pub fn diverse_recommendations(&self, title: &str, n: usize, diversity: f32) -> RecommendOutcome {
        let Some(resolved) = self.resolve(title) else {
            return self.not_found(title);
        };
        let Some(query) = self.artifacts.movie(resolved.index) else {
            return self.not_found(title);
        };
        let diversity = diversity.clamp(0.0, 1.0);
        let similarity = self.artifacts.similarity();
        let relevance = similarity.row(resolved.index);

        let mut remaining: Vec<MovieIndex> =
            (0..self.artifacts.len()).filter(|&i| i != resolved.index).collect();
        // Highest similarity of every movie to the selected set so far
        let mut redundancy = vec![0.0f32; self.artifacts.len()];
        let mut selected: Vec<MovieIndex> = Vec::with_capacity(n.min(remaining.len()));

        while selected.len() < n && !remaining.is_empty() {
            let mut best: Option<(usize, f32)> = None;
            for (pos, &candidate) in remaining.iter().enumerate() {
                let score =
                    (1.0 - diversity) * relevance[candidate] - diversity * redundancy[candidate];
                if best.is_none_or(|(_, top)| score > top) {
                    best = Some((pos, score));
                }
            }
            let Some((pos, _)) = best else {
                break;
            };
            let chosen = remaining.remove(pos);
            for (candidate, slot) in redundancy.iter_mut().enumerate() {
                let sim = similarity.get(candidate, chosen);
                if selected.is_empty() || sim > *slot {
                    *slot = sim;
                }
            }
            selected.push(chosen);
        }

        let recommendations = selected
            .iter()
            .enumerate()
            .filter_map(|(rank, &index)| {
                let movie = self.artifacts.movie(index)?;
                Some(Recommendation::new(rank + 1, movie, relevance[index]))
            })
            .collect();
        RecommendOutcome::Found(self.result(query, resolved, recommendations))
    }

    /// The `n` best-rated movies with at least `min_votes` votes.
    ///
    /// When `genres` is non-empty a movie must share one of them. Movies
    /// without a vote average are skipped; equal averages keep store order.
    pub fn top_rated(&self, n: usize, min_votes: u32, genres: &[String]) -> Vec<TopRatedMovie> {
        let wanted: Vec<String> = genres.iter().map(|g| normalize_token(g)).collect();
        let mut eligible: Vec<(&MovieMetadata, f32)> = self
            .artifacts
            .metadata()
            .iter()
            .filter(|m| m.vote_count >= min_votes)
            .filter(|m| wanted.is_empty() || genres_overlap(&m.genres, &wanted))
            .filter_map(|m| Some((m, m.vote_average?)))
            .collect();

        // Stable sort: ties keep store order
        eligible.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        eligible
            .into_iter()
            .take(n)
            .map(|(movie, _)| TopRatedMovie::from(movie))
            .collect()
    }

    /// Details of the movie `title` resolves to.
    pub fn movie_details(&self, title: &str) -> Option<MovieDetails> {
        let resolved = self.resolve(title)?;
        self.artifacts.movie(resolved.index).map(MovieDetails::from)
    }

    /// Titles containing `query` (case-insensitive), in store order.
    ///
    /// With `min_rating`, movies rated lower (or unrated) are skipped.
    pub fn search_titles(&self, query: &str, limit: usize, min_rating: Option<f32>) -> Vec<String> {
        let needle = query.to_lowercase();
        self.artifacts
            .metadata()
            .iter()
            .filter(|m| m.title.to_lowercase().contains(&needle))
            .filter(|m| min_rating.is_none_or(|floor| m.vote_average.is_some_and(|avg| avg >= floor)))
            .take(limit)
            .map(|m| m.title.clone())
            .collect()
    }

    /// Title autocomplete: nothing below the minimum query length, capped results.
    pub fn autocomplete(&self, query: &str) -> Vec<String> {
        let query = query.trim();
        if query.chars().count() < self.config.min_search_len {
            return Vec::new();
        }
        self.search_titles(query, self.config.search_limit, None)
    }

    /// Every other movie with its similarity to `index`, best first.
    ///
    /// The query is excluded by position; equal scores keep index order.
    fn ranked(&self, index: MovieIndex) -> Vec<(MovieIndex, f32)> {
        let mut scores: Vec<(MovieIndex, f32)> = self
            .artifacts
            .similarity()
            .row(index)
            .iter()
            .copied()
            .enumerate()
            .filter(|&(j, _)| j != index)
            .collect();
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scores
    }

    fn not_found(&self, title: &str) -> RecommendOutcome {
        info!("Movie '{}' not found", title);
        RecommendOutcome::NotFound {
            query: title.to_string(),
            suggestions: self.search_titles(title, self.config.suggestion_limit, None),
        }
    }

    fn result(
        &self,
        query: &MovieMetadata,
        resolved: Resolved,
        recommendations: Vec<Recommendation>,
    ) -> RecommendationResult {
        RecommendationResult {
            query_movie: query.title.clone(),
            fuzzy_match: !resolved.exact,
            query_details: QueryDetails::from(query),
            total_recommendations: recommendations.len(),
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::QualityTier;
    use model_store::{ModelConfig, SimilarityMatrix};

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    fn movie(title: &str, genres: &[&str], average: f32, votes: u32, date: &str, company: &str) -> MovieMetadata {
        MovieMetadata {
            id: Some(title.len() as i64),
            title: title.to_string(),
            release_date: Some(date.to_string()),
            primary_company: Some(company.to_string()),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            vote_average: Some(average),
            vote_count: votes,
            popularity: Some(10.0),
            overview: Some("Plot".to_string()),
            imdb_id: None,
            poster_path: None,
        }
    }

    /// Three-movie corpus: A and B share a genre, C does not
    fn three_movies() -> Recommender {
        let metadata = vec![
            movie("A", &["action"], 8.0, 1000, "2001-01-01", "Studio One"),
            movie("B", &["action"], 7.0, 500, "2002-01-01", "Studio Two"),
            movie("C", &["drama"], 9.0, 2000, "2003-01-01", "Studio Three"),
        ];
        let similarity = SimilarityMatrix::new(
            3,
            3,
            vec![
                1.0, 0.8, 0.1, //
                0.8, 1.0, 0.2, //
                0.1, 0.2, 1.0,
            ],
        )
        .unwrap();
        build(metadata, similarity)
    }

    /// Five movies where 1 and 2 are near-duplicates of each other
    fn clustered() -> Recommender {
        let metadata = vec![
            movie("Query", &["action"], 7.0, 100, "2000-01-01", "Q Films"),
            movie("Twin One", &["action"], 7.0, 100, "2000-01-01", "Q Films"),
            movie("Twin Two", &["action"], 7.0, 100, "2000-01-01", "Q Films"),
            movie("Cousin", &["thriller"], 7.0, 100, "1990-01-01", "Other"),
            movie("Stranger", &["comedy"], 7.0, 100, "1990-01-01", "Other"),
        ];
        let similarity = SimilarityMatrix::new(
            5,
            5,
            vec![
                1.00, 0.90, 0.85, 0.60, 0.10, //
                0.90, 1.00, 0.99, 0.20, 0.05, //
                0.85, 0.99, 1.00, 0.20, 0.05, //
                0.60, 0.20, 0.20, 1.00, 0.10, //
                0.10, 0.05, 0.05, 0.10, 1.00,
            ],
        )
        .unwrap();
        build(metadata, similarity)
    }

    fn build(metadata: Vec<MovieMetadata>, similarity: SimilarityMatrix) -> Recommender {
        let n = metadata.len();
        let config = ModelConfig {
            n_movies: n,
            use_reduction: false,
            n_components: None,
            matrix_shape: (n, n),
            dataset: "fixture".to_string(),
            quality_tier: QualityTier::Low,
            vocabulary_size: 0,
            explained_variance: None,
        };
        let artifacts = ModelArtifactSet::new(metadata, similarity, config).unwrap();
        Recommender::new(Arc::new(artifacts), EngineConfig::default())
    }

    fn titles(outcome: &RecommendOutcome) -> Vec<String> {
        outcome
            .found()
            .map(|r| r.recommendations.iter().map(|x| x.title.clone()).collect())
            .unwrap_or_default()
    }

    // ============================================================================
    // Recommend
    // ============================================================================

    #[test]
    fn test_recommend_ranks_by_similarity() {
        let engine = three_movies();
        let outcome = engine.recommend("A", 2, &RecommendFilters::default());
        assert_eq!(titles(&outcome), vec!["B", "C"]);

        let result = outcome.found().unwrap();
        assert_eq!(result.query_movie, "A");
        assert!(!result.fuzzy_match);
        assert_eq!(result.total_recommendations, 2);
        assert_eq!(result.recommendations[0].rank, 1);
        assert_eq!(result.recommendations[0].similarity_score, 0.8);
        assert_eq!(result.recommendations[0].rating, "7.0/10");
        assert_eq!(result.recommendations[0].votes, "500");
        assert_eq!(result.query_details.rating, "8.0/10");
    }

    #[test]
    fn test_recommend_never_returns_query() {
        let engine = clustered();
        for title in ["Query", "Twin One", "Stranger"] {
            let outcome = engine.recommend(title, 10, &RecommendFilters::default());
            let found = titles(&outcome);
            assert_eq!(found.len(), 4);
            assert!(!found.iter().any(|t| t == title));
        }
    }

    #[test]
    fn test_recommend_fuzzy_match() {
        let engine = clustered();
        let outcome = engine.recommend("Twin On", 1, &RecommendFilters::default());
        let result = outcome.found().unwrap();
        assert_eq!(result.query_movie, "Twin One");
        assert!(result.fuzzy_match);
        assert_eq!(titles(&outcome), vec!["Twin Two"]);
    }

    #[test]
    fn test_recommend_not_found_with_suggestions() {
        let engine = three_movies();
        let outcome = engine.recommend("Unknown Film", 5, &RecommendFilters::default());
        match outcome {
            RecommendOutcome::NotFound { query, suggestions } => {
                assert_eq!(query, "Unknown Film");
                assert!(suggestions.len() <= 5);
            }
            RecommendOutcome::Found(_) => panic!("expected NotFound"),
        }
    }

    #[test]
    fn test_filters_reduce_recall() {
        let engine = clustered();
        let filters = RecommendFilters {
            exclude_same_company: true,
            ..RecommendFilters::default()
        };
        assert_eq!(titles(&engine.recommend("Query", 10, &filters)), vec!["Cousin", "Stranger"]);

        let filters = RecommendFilters {
            max_year: Some(1995),
            genres: vec!["Comedy".to_string()],
            ..RecommendFilters::default()
        };
        assert_eq!(titles(&engine.recommend("Query", 10, &filters)), vec!["Stranger"]);
    }

    #[test]
    fn test_everything_filtered_is_empty_result() {
        let engine = three_movies();
        let filters = RecommendFilters {
            min_rating: Some(9.5),
            ..RecommendFilters::default()
        };
        let outcome = engine.recommend("A", 5, &filters);
        let result = outcome.found().unwrap();
        assert!(result.is_empty());
        assert_eq!(result.total_recommendations, 0);
    }

    // ============================================================================
    // Diversity
    // ============================================================================

    #[test]
    fn test_mmr_without_diversity_matches_ranking() {
        let engine = clustered();
        let plain = engine.recommend("Query", 4, &RecommendFilters::default());
        let mmr = engine.diverse_recommendations("Query", 4, 0.0);
        assert_eq!(titles(&plain), titles(&mmr));
    }

    #[test]
    fn test_mmr_diversity_skips_near_duplicates() {
        let engine = clustered();
        // 0.5 * 0.85 - 0.5 * 0.99 for the second twin loses to the cousin
        let mmr = engine.diverse_recommendations("Query", 2, 0.5);
        assert_eq!(titles(&mmr), vec!["Twin One", "Cousin"]);
        let result = mmr.found().unwrap();
        assert_eq!(result.recommendations[1].similarity_score, 0.6);
    }

    #[test]
    fn test_mmr_full_diversity_minimizes_redundancy() {
        let engine = clustered();
        let mmr = engine.diverse_recommendations("Query", 2, 1.0);
        // First pick: every score is 0, so the first candidate wins;
        // then the least similar movie to it
        assert_eq!(titles(&mmr), vec!["Twin One", "Stranger"]);
    }

    #[test]
    fn test_mmr_caps_at_corpus_size() {
        let engine = three_movies();
        let mmr = engine.diverse_recommendations("A", 10, 0.3);
        assert_eq!(titles(&mmr).len(), 2);
    }

    // ============================================================================
    // Top rated, details, search
    // ============================================================================

    #[test]
    fn test_top_rated() {
        let engine = three_movies();
        let top = engine.top_rated(1, 1000, &[]);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].title, "C");
        assert_eq!(top[0].rating, "9.0/10");
        assert_eq!(top[0].votes, "2,000");

        let action = engine.top_rated(5, 0, &["Action".to_string()]);
        let names: Vec<&str> = action.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_top_rated_ties_keep_store_order() {
        let engine = clustered();
        let top = engine.top_rated(3, 0, &[]);
        let names: Vec<&str> = top.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(names, vec!["Query", "Twin One", "Twin Two"]);
    }

    #[test]
    fn test_movie_details() {
        let engine = three_movies();
        let details = engine.movie_details("C").unwrap();
        assert_eq!(details.rating, "9.0/10");
        assert_eq!(details.votes, "2,000");
        assert_eq!(details.popularity, "10.0");
        assert_eq!(details.imdb_id, "N/A");
        assert_eq!(details.poster_url, None);
        assert!(engine.movie_details("Nothing Like It").is_none());
    }

    #[test]
    fn test_search_titles() {
        let engine = clustered();
        assert_eq!(engine.search_titles("twin", 20, None), vec!["Twin One", "Twin Two"]);
        assert_eq!(engine.search_titles("twin", 1, None), vec!["Twin One"]);
        assert_eq!(engine.search_titles("twin", 20, Some(7.5)), Vec::<String>::new());
    }

    #[test]
    fn test_autocomplete_minimum_length() {
        let engine = clustered();
        assert!(engine.autocomplete("t").is_empty());
        assert_eq!(engine.autocomplete("tw"), vec!["Twin One", "Twin Two"]);
    }
}
