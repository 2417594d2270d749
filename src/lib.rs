//! heartml - heart disease classification pipeline
//!
//! An end-to-end MLOps reference: dataset loading and cleaning, a
//! column-type-aware feature pipeline, cross-validated hyperparameter search
//! over a small classifier catalog, experiment tracking, best-model export,
//! and an HTTP API serving the exported artifact.
//!
//! # Modules
//!
//! - [`data`] - CSV loading, schema normalization, cleaning, stratified splits
//! - [`features`] - impute/scale/encode pipeline composed with estimators
//! - [`training`] - estimators, stratified k-fold CV, grid search
//! - [`evaluate`] - classification metrics and diagnostic figures
//! - [`tracking`] - file-backed experiment runs
//! - [`export`] - model artifact export/load
//! - [`train`] - the training orchestrator
//! - [`serve`] - axum API with health/predict/metrics endpoints
//! - [`cli`] - command-line entry points

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluate;
pub mod export;
pub mod features;
pub mod serve;
pub mod tracking;
pub mod train;
pub mod training;

pub use error::{HeartError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::error::{HeartError, Result};
    pub use crate::evaluate::{evaluate_predictions, Figure};
    pub use crate::export::{export_model, load_exported, ExportMetadata};
    pub use crate::features::{FeaturePipeline, ModelPipeline};
    pub use crate::tracking::{RunStatus, Tracker};
    pub use crate::train::{model_catalog, run_training, select_best, TrainOptions};
    pub use crate::training::{
        ClassifierModel, DummyClassifier, Estimator, GridSearch, LogisticRegression, ModelKind,
        ParamGrid, ParamSet, ParamValue, RandomForest, StratifiedKFold,
    };
}
