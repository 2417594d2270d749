//! Training orchestration
//!
//! Walks the fixed model catalog: grid search per spec, held-out evaluation,
//! tracking-run logging, then best-model selection, export, and the summary
//! file. One spec's search failure aborts the whole invocation; this is a
//! reference pipeline, not a job scheduler.

use std::collections::BTreeMap;
use std::path::PathBuf;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Settings;
use crate::data;
use crate::error::{HeartError, Result};
use crate::evaluate::evaluate_predictions;
use crate::export::{export_model, ExportMetadata};
use crate::features::ModelPipeline;
use crate::tracking::Tracker;
use crate::training::{GridSearch, ModelKind, ParamGrid, ParamSet, ParamValue};

/// Options for one training invocation
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Reduced grids and 3-fold CV for fast iteration
    pub quick: bool,
    /// Held-out fraction for the test split
    pub test_size: f64,
    /// Explicit dataset path; otherwise processed, then raw, then sample
    pub data: Option<PathBuf>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            quick: false,
            test_size: 0.2,
            data: None,
        }
    }
}

/// Immutable catalog entry: name, estimator kind, and its search grid.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub name: &'static str,
    pub kind: ModelKind,
    pub grid: ParamGrid,
}

/// The fixed model catalog. Grids must stay as-is so results remain
/// comparable across runs and reimplementations.
pub fn model_catalog(quick: bool) -> Vec<ModelSpec> {
    let dummy_grid = ParamGrid::new().param("strategy", vec!["most_frequent".into()]);

    let log_reg_grid = if quick {
        ParamGrid::new()
            .param("C", vec![1.0.into()])
            .param("solver", vec!["liblinear".into()])
    } else {
        ParamGrid::new()
            .param("C", vec![0.1.into(), 1.0.into(), 10.0.into()])
            .param("penalty", vec!["l2".into()])
            .param("solver", vec!["liblinear".into(), "lbfgs".into()])
            .param("max_iter", vec![500i64.into()])
    };

    let forest_grid = if quick {
        ParamGrid::new()
            .param("n_estimators", vec![120i64.into()])
            .param("max_depth", vec![ParamValue::None, 8i64.into()])
    } else {
        ParamGrid::new()
            .param("n_estimators", vec![150i64.into(), 250i64.into()])
            .param("max_depth", vec![ParamValue::None, 8i64.into(), 12i64.into()])
            .param("min_samples_split", vec![2i64.into(), 5i64.into()])
            .param("min_samples_leaf", vec![1i64.into(), 2i64.into()])
    };

    vec![
        ModelSpec {
            name: "dummy",
            kind: ModelKind::Dummy,
            grid: dummy_grid,
        },
        ModelSpec {
            name: "log_reg",
            kind: ModelKind::LogReg,
            grid: log_reg_grid,
        },
        ModelSpec {
            name: "random_forest",
            kind: ModelKind::RandomForest,
            grid: forest_grid,
        },
    ]
}

/// Result of training one spec
#[derive(Debug)]
pub struct SpecResult {
    pub name: String,
    pub metrics: BTreeMap<String, f64>,
    pub params: ParamSet,
    pub run_id: String,
    pub plots: Vec<String>,
    pub pipeline: ModelPipeline,
}

/// Summary entry persisted to `training_summary.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecSummary {
    pub name: String,
    pub metrics: BTreeMap<String, f64>,
    pub params: ParamSet,
    pub run_id: String,
    pub plots: Vec<String>,
}

/// Outcome of a full training invocation
#[derive(Debug)]
pub struct TrainingReport {
    pub best_name: String,
    pub best_run_id: String,
    pub export: ExportMetadata,
    pub summary_path: PathBuf,
    pub summaries: Vec<SpecSummary>,
}

/// Pick the winner by lexicographic (ROC-AUC, accuracy).
///
/// Accuracy only breaks exact AUC ties; remaining full ties resolve to the
/// last maximum in catalog order.
pub fn select_best(results: &[SpecResult]) -> Option<usize> {
    let key = |r: &SpecResult| {
        (
            r.metrics.get("roc_auc").copied().unwrap_or(f64::NEG_INFINITY),
            r.metrics.get("accuracy").copied().unwrap_or(f64::NEG_INFINITY),
        )
    };

    let mut best: Option<usize> = None;
    for (i, result) in results.iter().enumerate() {
        if best.map_or(true, |b| key(result) >= key(&results[b])) {
            best = Some(i);
        }
    }
    best
}

fn resolve_dataset(
    settings: &Settings,
    opts: &TrainOptions,
) -> Result<(polars::prelude::DataFrame, &'static str)> {
    if let Some(path) = &opts.data {
        return Ok((data::load_csv(path)?, "custom"));
    }
    if settings.processed_data_path().exists() {
        return Ok((data::load_processed(settings)?, "processed"));
    }
    if settings.raw_data_path().exists() {
        return Ok((data::load_raw(settings, None)?, "raw"));
    }
    Ok((data::load_sample(settings)?, "sample"))
}

/// Run the full training pipeline and return the report.
pub fn run_training(settings: &Settings, opts: &TrainOptions) -> Result<TrainingReport> {
    let (dataset, data_source) = resolve_dataset(settings, opts)?;
    info!(rows = dataset.height(), data_source, quick = opts.quick, "loaded dataset");

    let (train_df, test_df) =
        data::train_test_split(&dataset, opts.test_size, settings.random_seed)?;
    let (x_train, y_train) = data::split_features_target(&train_df)?;
    let (x_test, y_test) = data::split_features_target(&test_df)?;
    info!(train = x_train.height(), test = x_test.height(), "split dataset");

    let n_splits = if opts.quick { 3 } else { 5 };
    let tracker = Tracker::new(&settings.tracking_dir, &settings.experiment_name);
    std::fs::create_dir_all(&settings.plots_dir)?;

    let catalog = model_catalog(opts.quick);
    let mut results: Vec<SpecResult> = Vec::with_capacity(catalog.len());

    for spec in &catalog {
        info!(spec = spec.name, "searching hyperparameters");
        let search = GridSearch::new(
            spec.kind,
            spec.grid.clone(),
            n_splits,
            settings.random_seed,
        );
        let outcome = search.run(&x_train, &y_train)?;

        let y_pred = outcome.pipeline.predict(&x_test)?;
        let y_proba = proba_or_predictions(&outcome.pipeline, &x_test, &y_pred)?;
        let (mut metrics, figures) = evaluate_predictions(&y_test, &y_pred, &y_proba);
        metrics.insert("cv_roc_auc".to_string(), outcome.best_score);

        let mut run = tracker.start_run(spec.name)?;
        run.log_params(&outcome.best_params.to_string_map());
        run.log_metrics(&metrics);
        run.log_json(
            "run_details",
            &serde_json::json!({
                "params": &outcome.best_params,
                "feature_columns": data::FEATURE_COLUMNS,
                "data_source": data_source,
                "quick": opts.quick,
                "n_candidates": outcome.n_candidates,
            }),
        )?;

        let mut plots = Vec::with_capacity(figures.len());
        for figure in &figures {
            run.log_figure(figure)?;
            let plot_path = settings
                .plots_dir
                .join(format!("{}_{}.svg", spec.name, figure.name));
            figure.save(&plot_path)?;
            plots.push(plot_path.display().to_string());
        }

        run.log_model(&outcome.pipeline)?;
        let run_id = run.finish()?;

        info!(
            spec = spec.name,
            roc_auc = metrics["roc_auc"],
            accuracy = metrics["accuracy"],
            cv_roc_auc = outcome.best_score,
            "evaluated spec"
        );

        results.push(SpecResult {
            name: spec.name.to_string(),
            metrics,
            params: outcome.best_params,
            run_id,
            plots,
            pipeline: outcome.pipeline,
        });
    }

    let best_idx = select_best(&results)
        .ok_or_else(|| HeartError::Training("no training results to select from".to_string()))?;
    let best = &results[best_idx];
    info!(best = %best.name, run_id = %best.run_id, "selected best model");

    let export = export_model(
        &best.pipeline,
        &best.run_id,
        &best.name,
        &settings.model_dir,
    )?;

    let summaries: Vec<SpecSummary> = results
        .iter()
        .map(|r| SpecSummary {
            name: r.name.clone(),
            metrics: r.metrics.clone(),
            params: r.params.clone(),
            run_id: r.run_id.clone(),
            plots: r.plots.clone(),
        })
        .collect();

    std::fs::create_dir_all(&settings.artifacts_dir)?;
    let summary_path = settings.summary_path();
    std::fs::write(&summary_path, serde_json::to_string_pretty(&summaries)?)?;
    info!(path = %summary_path.display(), "wrote training summary");

    Ok(TrainingReport {
        best_name: best.name.clone(),
        best_run_id: best.run_id.clone(),
        export,
        summary_path,
        summaries,
    })
}

/// Positive-class probabilities, falling back to the hard predictions when
/// the estimator cannot produce them.
fn proba_or_predictions(
    pipeline: &ModelPipeline,
    x: &polars::prelude::DataFrame,
    y_pred: &Array1<f64>,
) -> Result<Array1<f64>> {
    match pipeline.predict_proba(x) {
        Ok(proba) => Ok(proba),
        Err(HeartError::ModelNotFitted) => Err(HeartError::ModelNotFitted),
        Err(_) => Ok(y_pred.clone()),
    }
}
