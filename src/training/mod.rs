//! Model training: estimators, cross-validation, and grid search
//!
//! Estimators follow a common fit/predict/predict_proba contract so the
//! feature pipeline composes with any of them. The catalog for this project
//! is deliberately small: a most-frequent baseline, logistic regression, and
//! a random forest.

mod cross_validation;
mod decision_tree;
mod grid_search;
mod logistic;
mod models;
mod random_forest;

pub use cross_validation::{CvSplit, StratifiedKFold};
pub use decision_tree::{DecisionTree, TreeNode};
pub use grid_search::{GridSearch, ParamGrid, ParamSet, ParamValue, SearchOutcome};
pub use logistic::{LogisticRegression, Solver};
pub use models::{ClassifierModel, DummyClassifier, DummyStrategy, Estimator, ModelKind};
pub use random_forest::RandomForest;
