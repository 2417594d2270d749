//! Exhaustive hyperparameter search with cross-validated scoring

use std::collections::BTreeMap;

use ndarray::Array1;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::take_rows;
use crate::error::{HeartError, Result};
use crate::evaluate::roc_auc_score;
use crate::features::ModelPipeline;
use crate::training::cross_validation::StratifiedKFold;
use crate::training::models::{ClassifierModel, ModelKind};

/// A single hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
    /// Explicit "unset" (e.g. unlimited tree depth); serializes as null
    None,
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(v) => f.write_str(v),
            ParamValue::None => f.write_str("None"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

/// One concrete hyperparameter assignment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// All values rendered as strings, for tracking-store param logs.
    pub fn to_string_map(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }

    pub fn get_f64(&self, name: &str) -> Result<f64> {
        match self.get(name) {
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(ParamValue::Int(v)) => Ok(*v as f64),
            other => Err(param_type_error(name, other, "float")),
        }
    }

    pub fn get_usize(&self, name: &str) -> Result<usize> {
        match self.get(name) {
            Some(ParamValue::Int(v)) if *v >= 0 => Ok(*v as usize),
            other => Err(param_type_error(name, other, "non-negative int")),
        }
    }

    /// Integer parameter that may be the explicit `None` value.
    pub fn get_opt_usize(&self, name: &str) -> Result<Option<usize>> {
        match self.get(name) {
            Option::None | Some(ParamValue::None) => Ok(Option::None),
            Some(ParamValue::Int(v)) if *v >= 0 => Ok(Some(*v as usize)),
            other => Err(param_type_error(name, other, "int or None")),
        }
    }

    pub fn get_str(&self, name: &str) -> Result<&str> {
        match self.get(name) {
            Some(ParamValue::Str(v)) => Ok(v),
            other => Err(param_type_error(name, other, "string")),
        }
    }
}

fn param_type_error(name: &str, value: Option<&ParamValue>, expected: &str) -> HeartError {
    HeartError::InvalidParameter {
        name: name.to_string(),
        value: value.map(|v| v.to_string()).unwrap_or_else(|| "<missing>".to_string()),
        reason: format!("expected {expected}"),
    }
}

/// Declarative hyperparameter grid: parameter name to candidate values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamGrid {
    entries: BTreeMap<String, Vec<ParamValue>>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter with its candidate values.
    pub fn param(mut self, name: impl Into<String>, values: Vec<ParamValue>) -> Self {
        self.entries.insert(name.into(), values);
        self
    }

    /// Cartesian product of all candidate values, in deterministic
    /// (name-sorted, value-listed) order.
    pub fn candidates(&self) -> Vec<ParamSet> {
        let mut result = vec![ParamSet::new()];
        for (name, values) in &self.entries {
            let mut expanded = Vec::with_capacity(result.len() * values.len());
            for base in &result {
                for value in values {
                    let mut set = base.clone();
                    set.insert(name.clone(), value.clone());
                    expanded.push(set);
                }
            }
            result = expanded;
        }
        result
    }
}

/// Outcome of a grid search: the refit pipeline and how it was chosen.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Feature pipeline + best estimator, refit on the full training split
    pub pipeline: ModelPipeline,
    pub best_params: ParamSet,
    /// Mean cross-validated ROC-AUC of the winning assignment
    pub best_score: f64,
    pub n_candidates: usize,
}

/// Cross-validated exhaustive search over a [`ParamGrid`].
///
/// Candidates are evaluated sequentially so runs are bit-for-bit
/// reproducible; estimator internals may still parallelize.
pub struct GridSearch {
    kind: ModelKind,
    grid: ParamGrid,
    n_splits: usize,
    seed: u64,
}

impl GridSearch {
    pub fn new(kind: ModelKind, grid: ParamGrid, n_splits: usize, seed: u64) -> Self {
        Self {
            kind,
            grid,
            n_splits,
            seed,
        }
    }

    /// Search the grid, scoring each candidate by mean fold ROC-AUC, then
    /// refit the best assignment on the full training split.
    pub fn run(&self, train: &DataFrame, y: &Array1<f64>) -> Result<SearchOutcome> {
        let candidates = self.grid.candidates();
        let splits = StratifiedKFold::new(self.n_splits)
            .with_random_state(self.seed)
            .split(y)?;

        let mut best: Option<(ParamSet, f64)> = None;

        for params in &candidates {
            let mut fold_scores = Vec::with_capacity(splits.len());

            for split in &splits {
                let train_df = take_rows(train, &split.train_indices)?;
                let val_df = take_rows(train, &split.test_indices)?;
                let y_train: Array1<f64> =
                    split.train_indices.iter().map(|&i| y[i]).collect();
                let y_val: Array1<f64> = split.test_indices.iter().map(|&i| y[i]).collect();

                let model = ClassifierModel::from_params(self.kind, params, self.seed)?;
                let mut pipeline = ModelPipeline::new(model);
                pipeline.fit(&train_df, &y_train)?;

                let proba = pipeline.predict_proba(&val_df)?;
                fold_scores.push(roc_auc_score(&y_val, &proba));
            }

            let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            debug!(kind = %self.kind, params = %serde_json::to_string(params)?, score = mean_score, "evaluated candidate");

            if best.as_ref().map_or(true, |(_, s)| mean_score > *s) {
                best = Some((params.clone(), mean_score));
            }
        }

        let (best_params, best_score) =
            best.ok_or_else(|| HeartError::Training("empty parameter grid".to_string()))?;

        let model = ClassifierModel::from_params(self.kind, &best_params, self.seed)?;
        let mut pipeline = ModelPipeline::new(model);
        pipeline.fit(train, y)?;

        Ok(SearchOutcome {
            pipeline,
            best_params,
            best_score,
            n_candidates: candidates.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_cartesian_product() {
        let grid = ParamGrid::new()
            .param("a", vec![1i64.into(), 2i64.into()])
            .param("b", vec!["x".into(), "y".into(), "z".into()]);
        let candidates = grid.candidates();
        assert_eq!(candidates.len(), 6);
        // Deterministic ordering: first candidate takes each first value.
        assert_eq!(candidates[0].get("a"), Some(&ParamValue::Int(1)));
        assert_eq!(candidates[0].get("b"), Some(&ParamValue::Str("x".into())));
    }

    #[test]
    fn test_empty_grid_yields_single_empty_candidate() {
        let grid = ParamGrid::new();
        assert_eq!(grid.candidates(), vec![ParamSet::new()]);
    }

    #[test]
    fn test_param_set_accessors() {
        let mut params = ParamSet::new();
        params.insert("C", ParamValue::Float(0.1));
        params.insert("max_depth", ParamValue::None);
        params.insert("n_estimators", ParamValue::Int(150));
        params.insert("solver", ParamValue::Str("lbfgs".into()));

        assert_eq!(params.get_f64("C").unwrap(), 0.1);
        assert_eq!(params.get_opt_usize("max_depth").unwrap(), Option::None);
        assert_eq!(params.get_usize("n_estimators").unwrap(), 150);
        assert_eq!(params.get_str("solver").unwrap(), "lbfgs");
        assert!(params.get_f64("missing").is_err());
    }
}
