//! Binary classification tree used as the forest's base learner

use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{HeartError, Result};
use crate::training::models::Estimator;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf with positive-class probability
    Leaf { prob: f64, n_samples: usize },
    /// Internal split: `x[feature_idx] <= threshold` goes left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Gini-impurity classification tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` means all
    pub max_features: Option<usize>,
    pub random_state: Option<u64>,
    n_features: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
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

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn grow(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n = indices.len();
        let n_pos = indices.iter().filter(|&&i| y[i] > 0.5).count();
        let prob = n_pos as f64 / n as f64;

        let at_max_depth = self.max_depth.is_some_and(|d| depth >= d);
        let pure = n_pos == 0 || n_pos == n;
        if at_max_depth || pure || n < self.min_samples_split {
            return TreeNode::Leaf { prob, n_samples: n };
        }

        match self.best_split(x, y, indices, rng) {
            Some((feature_idx, threshold)) => {
                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .copied()
                    .partition(|&i| x[[i, feature_idx]] <= threshold);

                let left = self.grow(x, y, &left_idx, depth + 1, rng);
                let right = self.grow(x, y, &right_idx, depth + 1, rng);

                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left: Box::new(left),
                    right: Box::new(right),
                    n_samples: n,
                }
            }
            None => TreeNode::Leaf { prob, n_samples: n },
        }
    }

    /// Best (feature, threshold) by Gini gain over a random feature subset.
    fn best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64)> {
        let n = indices.len();

        let mut feature_pool: Vec<usize> = (0..self.n_features).collect();
        let n_consider = self.max_features.unwrap_or(self.n_features).min(self.n_features);
        if n_consider < self.n_features {
            feature_pool.shuffle(rng);
            feature_pool.truncate(n_consider);
        }

        let mut best: Option<(usize, f64, f64)> = None; // (feature, threshold, impurity)

        for &feature_idx in &feature_pool {
            let mut values: Vec<(f64, f64)> = indices
                .iter()
                .map(|&i| (x[[i, feature_idx]], y[i]))
                .collect();
            values.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let total_pos: f64 = values.iter().map(|(_, label)| label).sum();
            let mut left_pos = 0.0;

            for split_at in 1..n {
                left_pos += values[split_at - 1].1;

                // No threshold between equal values
                if values[split_at].0 <= values[split_at - 1].0 {
                    continue;
                }
                let n_left = split_at;
                let n_right = n - split_at;
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let right_pos = total_pos - left_pos;
                let weighted = (n_left as f64 * gini(left_pos, n_left)
                    + n_right as f64 * gini(right_pos, n_right))
                    / n as f64;

                if best.map_or(true, |(_, _, imp)| weighted < imp) {
                    let threshold = (values[split_at - 1].0 + values[split_at].0) / 2.0;
                    best = Some((feature_idx, threshold, weighted));
                }
            }
        }

        best.map(|(feature_idx, threshold, _)| (feature_idx, threshold))
    }

    fn traverse(&self, node: &TreeNode, row: ndarray::ArrayView1<f64>) -> f64 {
        match node {
            TreeNode::Leaf { prob, .. } => *prob,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if row[*feature_idx] <= *threshold {
                    self.traverse(left, row)
                } else {
                    self.traverse(right, row)
                }
            }
        }
    }
}

fn gini(pos: f64, n: usize) -> f64 {
    let p = pos / n as f64;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}

impl Estimator for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(HeartError::Training(format!(
                "x has {} rows but y has {} entries",
                x.nrows(),
                y.len()
            )));
        }
        if x.nrows() == 0 {
            return Err(HeartError::Training("empty training set".to_string()));
        }

        self.n_features = x.ncols();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.root = Some(self.grow(x, y, &indices, 0, &mut rng));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(HeartError::ModelNotFitted)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| self.traverse(root, row))
            .collect())
    }
}
