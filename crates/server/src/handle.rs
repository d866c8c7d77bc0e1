//! Lazily loaded, process-wide model handle.
//!
//! The serving layer owns one [`ModelHandle`] and passes it to whatever
//! answers requests. The first caller that needs the model triggers the load;
//! concurrent callers wait on that same load. A failed load leaves the handle
//! empty so a later call can retry, and nothing partial is ever cached.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use model_store::ModelArtifactSet;
use pipeline::{Trainer, TrainingConfig};

use crate::config::EngineConfig;
use crate::recommender::Recommender;
use crate::types::{HealthStatus, ServiceState};

/// Where the artifacts come from when the handle loads
#[derive(Debug, Clone)]
struct ModelSource {
    model_dir: PathBuf,
    /// Raw dataset trained in memory when `model_dir` holds no model
    fallback: Option<(PathBuf, TrainingConfig)>,
}

/// Shared, lazily initialized access to the recommendation engine.
#[derive(Debug)]
pub struct ModelHandle {
    source: ModelSource,
    engine: EngineConfig,
    cell: OnceCell<Arc<Recommender>>,
}

impl ModelHandle {
    /// Handle serving the artifact set stored in `model_dir`.
    pub fn new(model_dir: impl Into<PathBuf>, engine: EngineConfig) -> Self {
        Self {
            source: ModelSource {
                model_dir: model_dir.into(),
                fallback: None,
            },
            engine,
            cell: OnceCell::new(),
        }
    }

    /// Train from `data_path` in memory when the model directory is untrained.
    pub fn with_fallback_data(mut self, data_path: impl Into<PathBuf>, training: TrainingConfig) -> Self {
        self.source.fallback = Some((data_path.into(), training));
        self
    }

    /// Handle that is already loaded with `artifacts`.
    pub fn from_artifacts(artifacts: ModelArtifactSet, engine: EngineConfig) -> Self {
        let recommender = Arc::new(Recommender::new(Arc::new(artifacts), engine.clone()));
        Self {
            source: ModelSource {
                model_dir: PathBuf::new(),
                fallback: None,
            },
            engine,
            cell: OnceCell::new_with(Some(recommender)),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.source.model_dir
    }

    /// True once a load has succeeded
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// The engine, loading the model on first use.
    pub async fn recommender(&self) -> Result<Arc<Recommender>> {
        let recommender = self
            .cell
            .get_or_try_init(|| async {
                let source = self.source.clone();
                let artifacts = tokio::task::spawn_blocking(move || load_artifacts(&source))
                    .await
                    .context("Model load task panicked")??;
                Ok::<_, anyhow::Error>(Arc::new(Recommender::new(
                    Arc::new(artifacts),
                    self.engine.clone(),
                )))
            })
            .await?;
        Ok(recommender.clone())
    }

    /// Loads the model if needed and reports whether serving is possible.
    pub async fn health_check(&self) -> HealthStatus {
        match self.recommender().await {
            Ok(recommender) => HealthStatus {
                status: ServiceState::Healthy,
                movies_loaded: recommender.artifacts().len(),
                model_loaded: true,
                error: None,
            },
            Err(e) => {
                error!("Model unavailable: {:#}", e);
                HealthStatus {
                    status: ServiceState::Unhealthy,
                    movies_loaded: 0,
                    model_loaded: false,
                    error: Some(format!("{:#}", e)),
                }
            }
        }
    }
}

fn load_artifacts(source: &ModelSource) -> Result<ModelArtifactSet> {
    let start_time = Instant::now();
    let model_dir = &source.model_dir;

    if ModelArtifactSet::exists(model_dir) {
        let artifacts = ModelArtifactSet::load(model_dir)
            .with_context(|| format!("Failed to load model from {:?}", model_dir))?;
        info!(
            "Model ready: {} movies ({}) in {:.2?}",
            artifacts.len(),
            artifacts.config().dataset,
            start_time.elapsed()
        );
        return Ok(artifacts);
    }

    let Some((data_path, training)) = &source.fallback else {
        bail!("No trained model found in {:?}", model_dir);
    };
    warn!(
        "No trained model in {:?}; training in memory from {:?}",
        model_dir, data_path
    );
    let output = Trainer::new(training.clone())
        .train_in_memory(data_path)
        .context("Fallback training failed")?;
    info!(
        "Model ready: {} movies trained in {:.2?}",
        output.artifacts.len(),
        start_time.elapsed()
    );
    Ok(output.artifacts)
}
