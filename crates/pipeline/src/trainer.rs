//! # Training pipeline
//!
//! Coordinates one offline training run:
//! 1. Load the raw dataset
//! 2. Build the corpus (filters, soups, dedup, quality ordering)
//! 3. Cap the corpus to `max_movies`
//! 4. Vectorize the soups with TF-IDF
//! 5. Optionally reduce with a truncated SVD
//! 6. Compute the all-pairs similarity matrix
//! 7. Assemble (and optionally save) the artifact set
//!
//! Runs are batch jobs: callers must not point two runs at the same output
//! directory at once.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use data_loader::{LoadReport, MovieMetadata, MovieRecord, RawMovie, load_dataset};
use model_store::{ModelArtifactSet, ModelConfig, SaveReport};

use crate::config::TrainingConfig;
use crate::features::{BuildReport, FeatureBuilder};
use crate::reducer::{self, Reduction};
use crate::similarity::{FeatureMatrix, cosine_similarity};
use crate::vectorizer::TfidfVectorizer;

/// Diagnostics of one training run
#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    pub load: LoadReport,
    pub build: BuildReport,
    /// Movies dropped by the `max_movies` cap
    pub capped: usize,
    pub vocabulary_size: usize,
    /// Percentage of empty cells in the TF-IDF matrix
    pub sparsity: f64,
    pub n_components: Option<usize>,
    pub explained_variance: Option<f64>,
    pub elapsed: Duration,
}

/// A trained model and how it was obtained
#[derive(Debug, Clone)]
pub struct TrainingOutput {
    pub artifacts: ModelArtifactSet,
    pub report: TrainingReport,
}

/// Runs the training pipeline with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
    features: FeatureBuilder,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            features: FeatureBuilder::new(),
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train from the dataset at `data_path` and write the artifacts to `output_dir`.
    pub fn train(&self, data_path: &Path, output_dir: &Path) -> Result<(TrainingOutput, SaveReport)> {
        let output = self.train_in_memory(data_path)?;
        let saved = output
            .artifacts
            .save(output_dir, &self.config.store)
            .with_context(|| format!("Failed to save model artifacts to {:?}", output_dir))?;
        info!("Model saved to {:?}", output_dir);
        Ok((output, saved))
    }

    /// Train from the dataset at `data_path` without persisting anything.
    pub fn train_in_memory(&self, data_path: &Path) -> Result<TrainingOutput> {
        let (raw, load) = load_dataset(data_path)
            .with_context(|| format!("Failed to load dataset from {:?}", data_path))?;
        let mut output = self.fit(raw)?;
        output.report.load = load;
        Ok(output)
    }

    /// Run every stage after loading on already-decoded rows.
    pub fn fit(&self, raw: Vec<RawMovie>) -> Result<TrainingOutput> {
        let start_time = Instant::now();
        let mut report = TrainingReport::default();

        let (mut corpus, build) = self
            .features
            .build_corpus(raw, self.config.quality_tier);
        report.build = build;

        if let Some(max_movies) = self.config.max_movies {
            if corpus.len() > max_movies {
                report.capped = corpus.len() - max_movies;
                corpus.truncate(max_movies);
                info!("Limited to top {} movies by quality score", max_movies);
            }
        }
        if corpus.is_empty() {
            bail!(
                "No movies left after feature building (quality tier '{}')",
                self.config.quality_tier
            );
        }

        let features = self.vectorize_and_reduce(&corpus, &mut report)?;
        let similarity = cosine_similarity(&features, &self.config.similarity);
        info!(
            "Similarity matrix {:?} ({:.1} MB)",
            similarity.shape(),
            similarity.nbytes() as f64 / 1024.0 / 1024.0
        );

        let model_config = ModelConfig {
            n_movies: corpus.len(),
            use_reduction: self.config.use_reduction,
            n_components: report.n_components,
            matrix_shape: similarity.shape(),
            dataset: self.config.dataset_label.clone(),
            quality_tier: self.config.quality_tier,
            vocabulary_size: report.vocabulary_size,
            explained_variance: report.explained_variance,
        };
        let metadata: Vec<MovieMetadata> = corpus.iter().map(MovieMetadata::from).collect();
        let artifacts = ModelArtifactSet::new(metadata, similarity, model_config)
            .context("Trained artifacts are inconsistent")?;

        report.elapsed = start_time.elapsed();
        info!(
            "Training completed: {} movies in {:.2?}",
            artifacts.len(),
            report.elapsed
        );
        Ok(TrainingOutput { artifacts, report })
    }

    fn vectorize_and_reduce(
        &self,
        corpus: &[MovieRecord],
        report: &mut TrainingReport,
    ) -> Result<FeatureMatrix> {
        let soups: Vec<&str> = corpus.iter().map(|m| m.soup.as_str()).collect();
        let max_features = self.config.vectorizer.max_features_for(soups.len());
        info!("Using max_features={} for {} movies", max_features, soups.len());

        let (vectorizer, tfidf) = TfidfVectorizer::fit_transform(&self.config.vectorizer, &soups)
            .context("Failed to build the TF-IDF matrix")?;
        report.vocabulary_size = vectorizer.vocabulary_size();
        report.sparsity = tfidf.sparsity();

        if !self.config.use_reduction {
            info!("Dimensionality reduction disabled");
            return Ok(FeatureMatrix::Sparse(tfidf));
        }
        let Some(rank) = reducer::target_rank(&self.config.reducer, tfidf.shape()) else {
            info!(
                "Skipping dimensionality reduction for {} movies (needs more than {})",
                corpus.len(),
                self.config.reducer.min_rows
            );
            return Ok(FeatureMatrix::Sparse(tfidf));
        };
        if rank < self.config.reducer.n_components {
            warn!(
                "Requested {} components, clamped to {} by the matrix shape {:?}",
                self.config.reducer.n_components,
                rank,
                tfidf.shape()
            );
        }

        let Reduction {
            features,
            n_components,
            explained_variance_ratio,
        } = reducer::truncated_svd(&tfidf, rank, &self.config.reducer)
            .context("Truncated SVD failed")?;
        report.n_components = Some(n_components);
        report.explained_variance = Some(explained_variance_ratio);
        Ok(FeatureMatrix::Dense(features))
    }
}
