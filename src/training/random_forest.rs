//! Random forest over the Gini decision tree

use ndarray::{Array1, Array2};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{HeartError, Result};
use crate::training::decision_tree::DecisionTree;
use crate::training::models::Estimator;

/// Bagged ensemble of decision trees with sqrt-feature subsampling.
///
/// Trees fit in parallel; each gets a seed derived from `random_state`, so
/// results are reproducible regardless of thread scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub random_state: Option<u64>,
    n_features: usize,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            random_state: None,
            n_features: 0,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        tree_seed: u64,
        max_features: usize,
    ) -> Result<DecisionTree> {
        let n = x.nrows();
        let mut rng = ChaCha8Rng::seed_from_u64(tree_seed);

        // Bootstrap sample with replacement
        let mut xb = Array2::zeros((n, x.ncols()));
        let mut yb = Array1::zeros(n);
        for row in 0..n {
            let src = rng.gen_range(0..n);
            xb.row_mut(row).assign(&x.row(src));
            yb[row] = y[src];
        }

        let mut tree = DecisionTree::new()
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_features(max_features)
            .with_random_state(tree_seed.wrapping_add(1));
        if let Some(depth) = self.max_depth {
            tree = tree.with_max_depth(depth);
        }
        tree.fit(&xb, &yb)?;
        Ok(tree)
    }
}

impl Estimator for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(HeartError::Training(format!(
                "x has {} rows but y has {} entries",
                x.nrows(),
                y.len()
            )));
        }
        if self.n_estimators == 0 {
            return Err(HeartError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        self.n_features = x.ncols();
        let max_features = ((x.ncols() as f64).sqrt().round() as usize).max(1);
        let base_seed = self.random_state.unwrap_or(0);

        let trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|i| self.build_tree(x, y, base_seed.wrapping_add(i as u64), max_features))
            .collect::<Result<Vec<_>>>()?;
        self.trees = trees;

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(HeartError::ModelNotFitted);
        }

        let mut acc = Array1::zeros(x.nrows());
        for tree in &self.trees {
            acc = acc + tree.predict_proba(x)?;
        }
        Ok(acc / self.trees.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn toy_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [1.0, 10.0],
            [2.0, 9.0],
            [3.0, 8.0],
            [4.0, 7.0],
            [5.0, 6.0],
            [10.0, 1.0],
            [11.0, 2.0],
            [12.0, 3.0],
            [13.0, 4.0],
            [14.0, 5.0]
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_forest_learns_toy_split() {
        let (x, y) = toy_data();
        let mut forest = RandomForest::new(25).with_random_state(7);
        forest.fit(&x, &y).unwrap();

        let preds = forest.predict(&x).unwrap();
        let correct = preds
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| (**p - **t).abs() < 0.5)
            .count();
        assert!(correct >= 9, "forest misclassified {} samples", 10 - correct);
    }

    #[test]
    fn test_seeded_forest_is_deterministic() {
        let (x, y) = toy_data();
        let mut a = RandomForest::new(10).with_random_state(42);
        let mut b = RandomForest::new(10).with_random_state(42);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        let pa = a.predict_proba(&x).unwrap();
        let pb = b.predict_proba(&x).unwrap();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_zero_estimators_rejected() {
        let (x, y) = toy_data();
        let mut forest = RandomForest::new(0);
        assert!(forest.fit(&x, &y).is_err());
    }
}
