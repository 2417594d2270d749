//! Shared application state

use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::Result;
use crate::export;
use crate::features::ModelPipeline;

/// Immutable bundle of the loaded model and its identity.
#[derive(Debug)]
pub struct LoadedModel {
    pub pipeline: ModelPipeline,
    pub version: String,
    pub run_id: String,
}

/// State shared across handlers.
///
/// The model slot is replaced wholesale on (re)load; request handlers clone
/// the `Arc` out of the guard and never mutate the bundle.
#[derive(Debug, Default)]
pub struct AppState {
    model: RwLock<Option<Arc<LoadedModel>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current model bundle, if one is loaded.
    pub async fn model(&self) -> Option<Arc<LoadedModel>> {
        self.model.read().await.clone()
    }

    /// Swap in a model bundle (tests use this with stub pipelines).
    pub async fn set_model(&self, model: Option<Arc<LoadedModel>>) {
        *self.model.write().await = model;
    }

    /// Load the exported artifact at `dir` and swap it in.
    pub async fn load_from(&self, dir: &Path) -> Result<Arc<LoadedModel>> {
        let (pipeline, metadata) = export::load_exported(dir)?;
        let loaded = Arc::new(LoadedModel {
            pipeline,
            version: metadata.model_name,
            run_id: metadata.run_id,
        });
        self.set_model(Some(loaded.clone())).await;
        Ok(loaded)
    }
}
