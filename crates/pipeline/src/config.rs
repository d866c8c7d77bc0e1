//! Training configuration.
//!
//! Every knob of the offline pipeline lives here with the defaults the
//! production model was trained with. All structs are serde-friendly so a
//! config can be read from JSON or built from CLI flags.

use data_loader::QualityTier;
use model_store::StoreConfig;
use serde::{Deserialize, Serialize};

/// Settings for the TF-IDF vectorizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    /// Smallest and largest n-gram length (inclusive)
    pub ngram_range: (usize, usize),
    /// A term must occur in at least this many documents
    pub min_df: usize,
    /// A term may occur in at most this fraction of documents
    pub max_df: f64,
    /// Use `1 + ln(tf)` instead of raw counts
    pub sublinear_tf: bool,
    /// Drop English stop words before building n-grams
    pub stop_words: bool,
    /// Hard vocabulary cap; `None` picks one from the corpus size
    pub max_features: Option<usize>,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            ngram_range: (1, 2),
            min_df: 3,
            max_df: 0.7,
            sublinear_tf: true,
            stop_words: true,
            max_features: None,
        }
    }
}

impl VectorizerConfig {
    /// Vocabulary cap for a corpus of `n_docs` documents.
    ///
    /// 10k terms below 10k movies, 15k below 100k, 20k beyond.
    pub fn max_features_for(&self, n_docs: usize) -> usize {
        if let Some(cap) = self.max_features {
            return cap;
        }
        match n_docs {
            n if n < 10_000 => 10_000,
            n if n < 100_000 => 15_000,
            _ => 20_000,
        }
    }
}

/// Settings for the truncated SVD
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerConfig {
    /// Target rank before clamping to the matrix shape
    pub n_components: usize,
    /// Reduction only runs on corpora strictly larger than this
    pub min_rows: usize,
    pub n_oversamples: usize,
    /// Power iterations of the randomized range finder
    pub n_iter: usize,
    pub seed: u64,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            n_components: 500,
            min_rows: 1000,
            n_oversamples: 10,
            n_iter: 5,
            seed: 42,
        }
    }
}

/// Settings for the all-pairs similarity computation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Row count above which the matrix is computed block by block
    pub chunk_threshold: usize,
    /// Rows per block in chunked mode
    pub chunk_size: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            chunk_threshold: 50_000,
            chunk_size: 10_000,
        }
    }
}

/// Everything a training run needs besides the input and output paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub quality_tier: QualityTier,
    /// Keep only the best `max_movies` movies by quality score
    pub max_movies: Option<usize>,
    pub use_reduction: bool,
    /// Free-form label written into the model config
    pub dataset_label: String,
    pub vectorizer: VectorizerConfig,
    pub reducer: ReducerConfig,
    pub similarity: SimilarityConfig,
    pub store: StoreConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            quality_tier: QualityTier::default(),
            max_movies: None,
            use_reduction: true,
            dataset_label: "TMDB movies".to_string(),
            vectorizer: VectorizerConfig::default(),
            reducer: ReducerConfig::default(),
            similarity: SimilarityConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_cap_by_corpus_size() {
        let config = VectorizerConfig::default();
        assert_eq!(config.max_features_for(500), 10_000);
        assert_eq!(config.max_features_for(10_000), 15_000);
        assert_eq!(config.max_features_for(99_999), 15_000);
        assert_eq!(config.max_features_for(930_000), 20_000);

        let fixed = VectorizerConfig {
            max_features: Some(42),
            ..VectorizerConfig::default()
        };
        assert_eq!(fixed.max_features_for(930_000), 42);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: TrainingConfig =
            serde_json::from_str(r#"{"quality_tier": "high", "max_movies": 100}"#).unwrap();
        assert_eq!(config.quality_tier, QualityTier::High);
        assert_eq!(config.max_movies, Some(100));
        assert!(config.use_reduction);
        assert_eq!(config.reducer.n_components, 500);
        assert_eq!(config.similarity.chunk_size, 10_000);
    }
}
