//! Feature pipeline: per-column-type preprocessing composed into one transform
//!
//! Numeric columns are median-imputed and standard-scaled; categorical
//! columns are most-frequent-imputed and one-hot encoded. The fitted
//! pipeline turns a feature frame into a single `ndarray` matrix with a
//! stable column order, and composes with any estimator into a fit-once,
//! predict-many [`ModelPipeline`].

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::{CATEGORICAL_COLUMNS, NUMERIC_COLUMNS};
use crate::error::{HeartError, Result};
use crate::training::{ClassifierModel, Estimator};

/// Fitted parameters for one numeric column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NumericParams {
    median: f64,
    mean: f64,
    std: f64,
}

/// Fitted parameters for one categorical column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CategoricalParams {
    mode: i64,
    /// Categories seen during fit, sorted; unseen values encode to all zeros
    categories: Vec<i64>,
}

/// Column-type-aware preprocessing transform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturePipeline {
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    numeric: BTreeMap<String, NumericParams>,
    categorical: BTreeMap<String, CategoricalParams>,
    is_fitted: bool,
}

impl Default for FeaturePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl FeaturePipeline {
    /// Pipeline over the canonical heart disease column split.
    pub fn new() -> Self {
        Self::with_columns(
            NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
            CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
        )
    }

    /// Pipeline over an explicit column split.
    pub fn with_columns(numeric_columns: Vec<String>, categorical_columns: Vec<String>) -> Self {
        Self {
            numeric_columns,
            categorical_columns,
            numeric: BTreeMap::new(),
            categorical: BTreeMap::new(),
            is_fitted: false,
        }
    }

    /// Fit imputers, scaler statistics, and category vocabularies.
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        self.numeric.clear();
        self.categorical.clear();

        for col_name in &self.numeric_columns {
            let values = column_values(df, col_name)?;
            let present: Vec<f64> = values.iter().filter_map(|v| *v).collect();
            if present.is_empty() {
                return Err(HeartError::Features(format!(
                    "numeric column {col_name} has no observed values"
                )));
            }
            let median = median(&present);
            let imputed: Vec<f64> = values.iter().map(|v| v.unwrap_or(median)).collect();
            let mean = imputed.iter().sum::<f64>() / imputed.len() as f64;
            let var =
                imputed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / imputed.len() as f64;
            let std = if var > 0.0 { var.sqrt() } else { 1.0 };
            self.numeric
                .insert(col_name.clone(), NumericParams { median, mean, std });
        }

        for col_name in &self.categorical_columns {
            let values = column_values(df, col_name)?;
            let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
            for v in values.iter().filter_map(|v| *v) {
                *counts.entry(v.round() as i64).or_insert(0) += 1;
            }
            if counts.is_empty() {
                return Err(HeartError::Features(format!(
                    "categorical column {col_name} has no observed values"
                )));
            }
            let mode = counts
                .iter()
                .max_by_key(|(_, &count)| count)
                .map(|(&cat, _)| cat)
                .unwrap_or(0);
            let categories: Vec<i64> = counts.keys().copied().collect();
            self.categorical
                .insert(col_name.clone(), CategoricalParams { mode, categories });
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Transform a feature frame into the dense matrix estimators consume.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(HeartError::ModelNotFitted);
        }

        let n_rows = df.height();
        let n_cols = self.output_width();
        let mut out = Array2::zeros((n_rows, n_cols));

        let mut col_idx = 0;
        for col_name in &self.numeric_columns {
            let params = &self.numeric[col_name];
            let values = column_values(df, col_name)?;
            for (row, v) in values.iter().enumerate() {
                let filled = v.unwrap_or(params.median);
                out[[row, col_idx]] = (filled - params.mean) / params.std;
            }
            col_idx += 1;
        }

        for col_name in &self.categorical_columns {
            let params = &self.categorical[col_name];
            let values = column_values(df, col_name)?;
            for (row, v) in values.iter().enumerate() {
                let category = v.map(|x| x.round() as i64).unwrap_or(params.mode);
                // Unseen categories at inference time leave the block all-zero.
                if let Ok(offset) = params.categories.binary_search(&category) {
                    out[[row, col_idx + offset]] = 1.0;
                }
            }
            col_idx += params.categories.len();
        }

        Ok(out)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Names of the output matrix columns, in order.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric_columns.clone();
        for col_name in &self.categorical_columns {
            if let Some(params) = self.categorical.get(col_name) {
                for cat in &params.categories {
                    names.push(format!("{col_name}_{cat}"));
                }
            }
        }
        names
    }

    fn output_width(&self) -> usize {
        self.numeric_columns.len()
            + self
                .categorical_columns
                .iter()
                .filter_map(|c| self.categorical.get(c))
                .map(|p| p.categories.len())
                .sum::<usize>()
    }
}

fn column_values(df: &DataFrame, col_name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(col_name)
        .map_err(|_| HeartError::Features(format!("column not found: {col_name}")))?;
    let cast = column.cast(&DataType::Float64)?;
    Ok(cast.as_materialized_series().f64()?.into_iter().collect())
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Feature pipeline composed with an estimator: one fit-once, predict-many unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPipeline {
    pub features: FeaturePipeline,
    pub model: ClassifierModel,
}

impl ModelPipeline {
    pub fn new(model: ClassifierModel) -> Self {
        Self {
            features: FeaturePipeline::new(),
            model,
        }
    }

    /// Fit the feature transform on the training frame, then the estimator
    /// on the transformed matrix.
    pub fn fit(&mut self, df: &DataFrame, y: &Array1<f64>) -> Result<&mut Self> {
        let x = self.features.fit_transform(df)?;
        self.model.fit(&x, y)?;
        Ok(self)
    }

    /// Predict hard labels for a feature frame.
    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let x = self.features.transform(df)?;
        self.model.predict(&x)
    }

    /// Predict positive-class probabilities for a feature frame.
    pub fn predict_proba(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let x = self.features.transform(df)?;
        self.model.predict_proba(&x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_df() -> DataFrame {
        df!(
            "age" => &[63.0, 41.0, 57.0, 52.0],
            "trestbps" => &[145.0, 130.0, 120.0, 118.0],
            "chol" => &[233.0, 204.0, 354.0, 210.0],
            "thalach" => &[150.0, 172.0, 163.0, 160.0],
            "oldpeak" => &[2.3, 1.4, 0.6, 0.0],
            "sex" => &[1.0, 0.0, 1.0, 0.0],
            "cp" => &[3.0, 1.0, 0.0, 1.0],
            "fbs" => &[1.0, 0.0, 0.0, 0.0],
            "restecg" => &[0.0, 0.0, 1.0, 1.0],
            "exang" => &[0.0, 0.0, 1.0, 0.0],
            "slope" => &[0.0, 2.0, 2.0, 2.0],
            "ca" => &[0.0, 0.0, 0.0, 0.0],
            "thal" => &[1.0, 2.0, 2.0, 2.0]
        )
        .unwrap()
    }

    #[test]
    fn test_fit_transform_shape_and_scaling() {
        let df = toy_df();
        let mut pipeline = FeaturePipeline::new();
        let x = pipeline.fit_transform(&df).unwrap();

        assert_eq!(x.nrows(), 4);
        assert_eq!(x.ncols(), pipeline.feature_names().len());

        // Standard-scaled numeric columns have (near) zero mean.
        for col in 0..NUMERIC_COLUMNS.len() {
            let mean: f64 = (0..4).map(|r| x[[r, col]]).sum::<f64>() / 4.0;
            assert!(mean.abs() < 1e-9, "column {col} mean was {mean}");
        }
    }

    #[test]
    fn test_unseen_category_encodes_to_zero_block() {
        let df = toy_df();
        let mut pipeline = FeaturePipeline::new();
        pipeline.fit(&df).unwrap();

        let mut probe = toy_df();
        // cp=9 never appeared during fit
        probe.with_column(Series::new("cp".into(), &[9.0, 1.0, 0.0, 1.0])).unwrap();
        let x = pipeline.transform(&probe).unwrap();

        let names = pipeline.feature_names();
        let cp_cols: Vec<usize> = names
            .iter()
            .enumerate()
            .filter(|(_, n)| n.starts_with("cp_"))
            .map(|(i, _)| i)
            .collect();
        let row0_sum: f64 = cp_cols.iter().map(|&c| x[[0, c]]).sum();
        assert_eq!(row0_sum, 0.0);
        let row1_sum: f64 = cp_cols.iter().map(|&c| x[[1, c]]).sum();
        assert_eq!(row1_sum, 1.0);
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let pipeline = FeaturePipeline::new();
        assert!(matches!(
            pipeline.transform(&toy_df()),
            Err(HeartError::ModelNotFitted)
        ));
    }
}
