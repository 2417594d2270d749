//! Stratified k-fold splitting for cross-validated search

use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{HeartError, Result};

/// A single train/validation split
#[derive(Debug, Clone)]
pub struct CvSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified k-fold splitter: each fold preserves the class distribution.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub random_state: Option<u64>,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: true,
            random_state: None,
        }
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Generate splits from the target vector.
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CvSplit>> {
        if self.n_splits < 2 {
            return Err(HeartError::InvalidParameter {
                name: "n_splits".to_string(),
                value: self.n_splits.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if y.len() < self.n_splits {
            return Err(HeartError::Training(format!(
                "n_samples ({}) must be >= n_splits ({})",
                y.len(),
                self.n_splits
            )));
        }

        // Group samples by class
        let mut class_indices: std::collections::BTreeMap<i64, Vec<usize>> = Default::default();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        if self.shuffle {
            let mut rng = match self.random_state {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        // Deal samples of each class across folds round-robin
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        for indices in class_indices.values() {
            for (i, &idx) in indices.iter().enumerate() {
                folds[i % self.n_splits].push(idx);
            }
        }

        let mut splits = Vec::with_capacity(self.n_splits);
        for fold_idx in 0..self.n_splits {
            let test_indices = folds[fold_idx].clone();
            let train_indices: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold_idx)
                .flat_map(|(_, f)| f.iter().copied())
                .collect();

            splits.push(CvSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
        }

        Ok(splits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stratified_folds_cover_all_indices() {
        let y: Array1<f64> = (0..20).map(|i| (i % 2) as f64).collect();
        let cv = StratifiedKFold::new(5).with_random_state(42);
        let splits = cv.split(&y).unwrap();

        assert_eq!(splits.len(), 5);
        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort_unstable();
        assert_eq!(all_test, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_each_fold_is_balanced() {
        let y: Array1<f64> = (0..30).map(|i| if i < 15 { 0.0 } else { 1.0 }).collect();
        let cv = StratifiedKFold::new(5).with_random_state(1);
        for split in cv.split(&y).unwrap() {
            let pos = split.test_indices.iter().filter(|&&i| y[i] > 0.5).count();
            assert_eq!(pos, 3);
            assert_eq!(split.test_indices.len(), 6);
        }
    }

    #[test]
    fn test_too_few_splits_rejected() {
        let y: Array1<f64> = (0..10).map(|i| (i % 2) as f64).collect();
        assert!(StratifiedKFold::new(1).split(&y).is_err());
    }
}
