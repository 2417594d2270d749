//! Estimator contract, the baseline classifier, and the model enum

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{HeartError, Result};
use crate::training::grid_search::ParamSet;
use crate::training::logistic::LogisticRegression;
use crate::training::random_forest::RandomForest;

/// Contract every classifier in the catalog satisfies.
///
/// `predict_proba` returns positive-class probabilities; `predict` returns
/// hard 0/1 labels.
pub trait Estimator: Send + Sync {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Prediction strategy for the baseline classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DummyStrategy {
    /// Always predict the majority class of the training labels
    MostFrequent,
}

/// Baseline classifier that ignores its inputs.
///
/// Useful as a sanity floor: any real model should beat it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DummyClassifier {
    pub strategy: DummyStrategy,
    majority: Option<f64>,
    positive_rate: Option<f64>,
    is_fitted: bool,
}

impl Default for DummyClassifier {
    fn default() -> Self {
        Self::most_frequent()
    }
}

impl DummyClassifier {
    pub fn most_frequent() -> Self {
        Self {
            strategy: DummyStrategy::MostFrequent,
            majority: None,
            positive_rate: None,
            is_fitted: false,
        }
    }
}

impl Estimator for DummyClassifier {
    fn fit(&mut self, _x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if y.is_empty() {
            return Err(HeartError::Training("empty target vector".to_string()));
        }
        let n_pos = y.iter().filter(|&&v| v > 0.5).count();
        let rate = n_pos as f64 / y.len() as f64;
        self.majority = Some(if rate >= 0.5 { 1.0 } else { 0.0 });
        self.positive_rate = Some(rate);
        self.is_fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let majority = self.majority.ok_or(HeartError::ModelNotFitted)?;
        Ok(Array1::from_elem(x.nrows(), majority))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let rate = self.positive_rate.ok_or(HeartError::ModelNotFitted)?;
        Ok(Array1::from_elem(x.nrows(), rate))
    }
}

/// Catalog entry identifier: which estimator a model spec builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Dummy,
    LogReg,
    RandomForest,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelKind::Dummy => "dummy",
            ModelKind::LogReg => "log_reg",
            ModelKind::RandomForest => "random_forest",
        };
        f.write_str(name)
    }
}

/// Enum holding any classifier from the catalog.
///
/// Keeps the exported artifact a single serializable value while estimators
/// stay plain structs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClassifierModel {
    Dummy(DummyClassifier),
    Logistic(LogisticRegression),
    Forest(RandomForest),
}

impl ClassifierModel {
    /// Build an estimator from a hyperparameter assignment.
    ///
    /// `seed` feeds the forest's per-tree RNG so repeated invocations are
    /// reproducible.
    pub fn from_params(kind: ModelKind, params: &ParamSet, seed: u64) -> Result<Self> {
        match kind {
            ModelKind::Dummy => {
                let strategy = params.get_str("strategy")?;
                if strategy != "most_frequent" {
                    return Err(HeartError::InvalidParameter {
                        name: "strategy".to_string(),
                        value: strategy.to_string(),
                        reason: "only most_frequent is supported".to_string(),
                    });
                }
                Ok(ClassifierModel::Dummy(DummyClassifier::most_frequent()))
            }
            ModelKind::LogReg => {
                let c = params.get_f64("C")?;
                if c <= 0.0 {
                    return Err(HeartError::InvalidParameter {
                        name: "C".to_string(),
                        value: c.to_string(),
                        reason: "must be positive".to_string(),
                    });
                }
                if let Ok(penalty) = params.get_str("penalty") {
                    if penalty != "l2" {
                        return Err(HeartError::InvalidParameter {
                            name: "penalty".to_string(),
                            value: penalty.to_string(),
                            reason: "only l2 is supported".to_string(),
                        });
                    }
                }
                let solver = params.get_str("solver")?.parse()?;
                let max_iter = params.get_usize("max_iter").unwrap_or(500);
                Ok(ClassifierModel::Logistic(
                    LogisticRegression::new()
                        .with_c(c)
                        .with_solver(solver)
                        .with_max_iter(max_iter),
                ))
            }
            ModelKind::RandomForest => {
                let n_estimators = params.get_usize("n_estimators")?;
                let mut forest = RandomForest::new(n_estimators).with_random_state(seed);
                if let Some(depth) = params.get_opt_usize("max_depth")? {
                    forest = forest.with_max_depth(depth);
                }
                if let Ok(min_split) = params.get_usize("min_samples_split") {
                    forest = forest.with_min_samples_split(min_split);
                }
                if let Ok(min_leaf) = params.get_usize("min_samples_leaf") {
                    forest = forest.with_min_samples_leaf(min_leaf);
                }
                Ok(ClassifierModel::Forest(forest))
            }
        }
    }

    /// Catalog name of the contained estimator
    pub fn kind(&self) -> ModelKind {
        match self {
            ClassifierModel::Dummy(_) => ModelKind::Dummy,
            ClassifierModel::Logistic(_) => ModelKind::LogReg,
            ClassifierModel::Forest(_) => ModelKind::RandomForest,
        }
    }
}

impl Estimator for ClassifierModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            ClassifierModel::Dummy(m) => m.fit(x, y),
            ClassifierModel::Logistic(m) => m.fit(x, y),
            ClassifierModel::Forest(m) => m.fit(x, y),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            ClassifierModel::Dummy(m) => m.predict(x),
            ClassifierModel::Logistic(m) => m.predict(x),
            ClassifierModel::Forest(m) => m.predict(x),
        }
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            ClassifierModel::Dummy(m) => m.predict_proba(x),
            ClassifierModel::Logistic(m) => m.predict_proba(x),
            ClassifierModel::Forest(m) => m.predict_proba(x),
        }
    }
}
