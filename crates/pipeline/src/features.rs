//! Feature building: raw dataset rows -> normalized corpus with one soup per movie.
//!
//! The soup is the text the vectorizer sees. Its token mix is weighted by
//! repetition: genres and the primary production company appear twice.

use data_loader::{MovieRecord, QualityTier, RawMovie, normalize_token};
use rayon::prelude::*;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Overview words kept in the soup
const OVERVIEW_WORDS: usize = 50;
/// Keywords kept (in source order) before stemming
const MAX_KEYWORDS: usize = 15;
const MAX_COMPANIES: usize = 3;
const MAX_COUNTRIES: usize = 2;
/// A soup must be strictly longer than this many characters
const MIN_SOUP_CHARS: usize = 20;

/// How many rows each stage of feature building removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub rows_in: usize,
    pub below_vote_threshold: usize,
    pub unreleased: usize,
    pub missing_title: usize,
    pub short_soup: usize,
    pub duplicate_titles: usize,
    pub retained: usize,
}

/// Turns raw rows into the ordered, deduplicated corpus used for training.
///
/// ## Algorithm
/// 1. Drop rows below the tier's vote threshold or not marked released
/// 2. Build each movie's soup (in parallel, order preserved)
/// 3. Drop rows without a title or with a soup of 20 characters or less
/// 4. Stable-sort by quality score descending, keep the first row per title
///
/// Keywords are reduced with the Snowball English stemmer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the corpus. Position in the returned Vec is the movie's index.
    #[instrument(skip_all, fields(rows = raw.len(), tier = %tier))]
    pub fn build_corpus(
        &self,
        raw: Vec<RawMovie>,
        tier: QualityTier,
    ) -> (Vec<MovieRecord>, BuildReport) {
        let mut report = BuildReport {
            rows_in: raw.len(),
            ..BuildReport::default()
        };

        let min_votes = tier.min_votes();
        let eligible: Vec<RawMovie> = raw
            .into_iter()
            .filter(|movie| {
                if movie.vote_count.is_none_or(|votes| votes < min_votes) {
                    report.below_vote_threshold += 1;
                    false
                } else if !movie.is_released() {
                    report.unreleased += 1;
                    false
                } else {
                    true
                }
            })
            .collect();
        info!(
            "Filtered to {} released movies with {}+ votes",
            eligible.len(),
            min_votes
        );

        let built: Vec<Option<MovieRecord>> = eligible
            .into_par_iter()
            .map(|movie| self.build_record(movie))
            .collect();

        let mut records = Vec::with_capacity(built.len());
        for record in built {
            match record {
                None => report.missing_title += 1,
                Some(r) if r.soup.chars().count() <= MIN_SOUP_CHARS => report.short_soup += 1,
                Some(r) => records.push(r),
            }
        }

        // Stable sort: equal scores keep their source order
        records.sort_by(|a, b| b.quality_score().total_cmp(&a.quality_score()));

        let mut seen = HashSet::with_capacity(records.len());
        records.retain(|r| {
            let first = seen.insert(r.title.clone());
            if !first {
                debug!("Dropping duplicate title {:?}", r.title);
                report.duplicate_titles += 1;
            }
            first
        });
        report.retained = records.len();

        info!(
            "Processed {} valid movies ({} short soups, {} missing titles, {} duplicates)",
            report.retained, report.short_soup, report.missing_title, report.duplicate_titles
        );
        (records, report)
    }

    /// Normalize one row. `None` when the row has no title.
    pub fn build_record(&self, movie: RawMovie) -> Option<MovieRecord> {
        let title = movie.title?;

        let stemmer = Stemmer::create(Algorithm::English);
        let keywords: Vec<String> = movie
            .keywords
            .iter()
            .take(MAX_KEYWORDS)
            .map(|kw| stemmer.stem(&normalize_token(kw)).into_owned())
            .collect();
        let genres: Vec<String> = movie.genres.iter().map(|g| normalize_token(g)).collect();
        let primary_company = movie.production_companies.first().cloned();

        let overview_words = movie
            .overview
            .as_deref()
            .map(|text| lowercase_words(text, Some(OVERVIEW_WORDS)))
            .unwrap_or_default();
        let tagline_words = movie
            .tagline
            .as_deref()
            .map(|text| lowercase_words(text, None))
            .unwrap_or_default();

        let mut tokens: Vec<String> = Vec::new();
        tokens.extend(keywords.iter().cloned());
        tokens.extend(genres.iter().cloned());
        tokens.extend(genres.iter().cloned());
        if let Some(company) = &primary_company {
            let token = normalize_token(company);
            tokens.push(token.clone());
            tokens.push(token);
        }
        tokens.extend(
            movie
                .production_companies
                .iter()
                .take(MAX_COMPANIES)
                .map(|c| normalize_token(c)),
        );
        tokens.extend(
            movie
                .production_countries
                .iter()
                .take(MAX_COUNTRIES)
                .map(|c| normalize_token(c)),
        );
        tokens.extend(overview_words);
        tokens.extend(tagline_words);

        Some(MovieRecord {
            id: movie.id,
            title,
            release_date: movie.release_date,
            primary_company,
            genres,
            keywords,
            overview: movie.overview,
            tagline: movie.tagline,
            vote_average: movie.vote_average,
            vote_count: movie.vote_count.unwrap_or(0),
            popularity: movie.popularity,
            imdb_id: movie.imdb_id,
            poster_path: movie.poster_path,
            soup: tokens.join(" "),
        })
    }
}

fn lowercase_words(text: &str, limit: Option<usize>) -> Vec<String> {
    text.split_whitespace()
        .take(limit.unwrap_or(usize::MAX))
        .map(str::to_lowercase)
        .collect()
}
