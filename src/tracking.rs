//! File-backed experiment tracking
//!
//! Each training run gets a uniquely identified directory under
//! `<tracking_dir>/<experiment>/` holding its parameters, metrics, figures,
//! and logged model. The run handle finalizes on every exit path: dropping
//! an unfinished handle records the run as failed instead of leaving it
//! dangling in the Running state.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HeartError, Result};
use crate::evaluate::Figure;
use crate::features::ModelPipeline;

/// Terminal (or in-flight) state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// Persisted run record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub run_name: String,
    pub experiment: String,
    pub status: RunStatus,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    pub artifacts: Vec<String>,
}

/// Tracker rooted at a store directory, scoped to one experiment.
#[derive(Debug, Clone)]
pub struct Tracker {
    root: PathBuf,
    experiment: String,
}

impl Tracker {
    pub fn new(root: impl Into<PathBuf>, experiment: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            experiment: experiment.into(),
        }
    }

    /// Directory holding this experiment's runs
    pub fn experiment_dir(&self) -> PathBuf {
        self.root.join(&self.experiment)
    }

    /// Open a new run scope. Every logging call on the returned handle is
    /// attributed to this run until it is finished (or dropped).
    pub fn start_run(&self, name: impl Into<String>) -> Result<RunHandle> {
        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let dir = self.experiment_dir().join(&run_id);
        std::fs::create_dir_all(&dir)?;

        let record = RunRecord {
            run_id: run_id.clone(),
            run_name: name.into(),
            experiment: self.experiment.clone(),
            status: RunStatus::Running,
            started_at: chrono::Utc::now().to_rfc3339(),
            ended_at: None,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifacts: Vec::new(),
        };

        info!(run_id = %run_id, run_name = %record.run_name, "started tracking run");
        Ok(RunHandle {
            record,
            dir,
            finished: false,
        })
    }

    /// Load a persisted run record by id.
    pub fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        let path = self.experiment_dir().join(run_id).join("run.json");
        if !path.exists() {
            return Err(HeartError::Tracking(format!("run not found: {run_id}")));
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Handle for one open run.
///
/// `finish()` consumes the handle and marks the run Finished; if the handle
/// is dropped without finishing (an error unwound past it), the run is
/// recorded as Failed.
#[derive(Debug)]
pub struct RunHandle {
    record: RunRecord,
    dir: PathBuf,
    finished: bool,
}

impl RunHandle {
    pub fn run_id(&self) -> &str {
        &self.record.run_id
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    pub fn log_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.record.params.insert(key.into(), value.into());
    }

    pub fn log_params(&mut self, params: &BTreeMap<String, String>) {
        self.record
            .params
            .extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    pub fn log_metric(&mut self, key: impl Into<String>, value: f64) {
        self.record.metrics.insert(key.into(), value);
    }

    pub fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) {
        self.record
            .metrics
            .extend(metrics.iter().map(|(k, v)| (k.clone(), *v)));
    }

    /// Log an arbitrary JSON document under `<run>/<name>.json`.
    pub fn log_json(&mut self, name: &str, value: &serde_json::Value) -> Result<()> {
        let path = self.dir.join(format!("{name}.json"));
        std::fs::write(&path, serde_json::to_string_pretty(value)?)?;
        self.record.artifacts.push(relative_name(&path));
        Ok(())
    }

    /// Log a rendered figure under `<run>/figures/`.
    pub fn log_figure(&mut self, figure: &Figure) -> Result<()> {
        let path = self.dir.join("figures").join(format!("{}.svg", figure.name));
        figure.save(&path)?;
        self.record.artifacts.push(format!("figures/{}.svg", figure.name));
        Ok(())
    }

    /// Log the fitted model under the standard `<run>/model/` path.
    pub fn log_model(&mut self, pipeline: &ModelPipeline) -> Result<()> {
        let model_dir = self.dir.join("model");
        std::fs::create_dir_all(&model_dir)?;
        let path = model_dir.join("model.json");
        std::fs::write(&path, serde_json::to_string_pretty(pipeline)?)?;
        self.record.artifacts.push("model/model.json".to_string());
        Ok(())
    }

    fn write_record(&mut self, status: RunStatus) -> Result<()> {
        self.record.status = status;
        self.record.ended_at = Some(chrono::Utc::now().to_rfc3339());
        let path = self.dir.join("run.json");
        std::fs::write(&path, serde_json::to_string_pretty(&self.record)?)?;
        Ok(())
    }

    /// Finalize the run as Finished and return its id.
    pub fn finish(mut self) -> Result<String> {
        self.write_record(RunStatus::Finished)?;
        self.finished = true;
        info!(run_id = %self.record.run_id, "finished tracking run");
        Ok(self.record.run_id.clone())
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if !self.finished {
            // Unwound out of the run scope; record the failure, best effort.
            if let Err(err) = self.write_record(RunStatus::Failed) {
                warn!(run_id = %self.record.run_id, error = %err, "failed to finalize run");
            }
        }
    }
}

fn relative_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_run_lifecycle() {
        let tmp = tempfile::tempdir().unwrap();
        let tracker = Tracker::new(tmp.path(), "test-exp");

        let mut run = tracker.start_run("log_reg").unwrap();
        run.log_param("C", "1.0");
        run.log_metric("roc_auc", 0.9);
        let run_id = run.finish().unwrap();

        let record = tracker.get_run(&run_id).unwrap();
        assert_eq!(record.status, RunStatus::Finished);
        assert_eq!(record.params["C"], "1.0");
        assert_eq!(record.metrics["roc_auc"], 0.9);
        assert!(record.ended_at.is_some());
    }

    #[test]
    fn test_dropped_run_is_recorded_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let tracker = Tracker::new(tmp.path(), "test-exp");

        let run_id = {
            let mut run = tracker.start_run("doomed").unwrap();
            run.log_param("C", "0.1");
            run.run_id().to_string()
            // run dropped here without finish()
        };

        let record = tracker.get_run(&run_id).unwrap();
        assert_eq!(record.status, RunStatus::Failed);
    }

    #[test]
    fn test_log_figure_writes_svg() {
        let tmp = tempfile::tempdir().unwrap();
        let tracker = Tracker::new(tmp.path(), "test-exp");

        let y_true = array![0.0, 1.0];
        let y_pred = array![0.0, 1.0];
        let figure = crate::evaluate::plot_confusion_matrix(&y_true, &y_pred);

        let mut run = tracker.start_run("with-figure").unwrap();
        run.log_figure(&figure).unwrap();
        let dir = run.dir().clone();
        run.finish().unwrap();

        assert!(dir.join("figures/confusion_matrix.svg").exists());
    }
}
