//! Central configuration for the heartml pipeline
//!
//! Every path and tunable lives here so training, export, and serving agree
//! on where artifacts go. Fields can be overridden through `HEART_*`
//! environment variables.

use std::path::PathBuf;

/// Pipeline-wide settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Seed used for splits, cross-validation shuffling, and forests
    pub random_seed: u64,
    /// Experiment name under which tracking runs are grouped
    pub experiment_name: String,

    pub raw_data_dir: PathBuf,
    pub processed_data_dir: PathBuf,
    pub sample_data_path: PathBuf,

    pub artifacts_dir: PathBuf,
    pub model_dir: PathBuf,
    pub plots_dir: PathBuf,
    /// Root directory of the file-backed tracking store
    pub tracking_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            random_seed: env_parse("HEART_RANDOM_SEED", 42),
            experiment_name: env_string("HEART_EXPERIMENT_NAME", "heart-disease-uci"),
            raw_data_dir: env_path("HEART_RAW_DATA_DIR", "data/raw"),
            processed_data_dir: env_path("HEART_PROCESSED_DATA_DIR", "data/processed"),
            sample_data_path: env_path("HEART_SAMPLE_DATA_PATH", "data/sample/sample.csv"),
            artifacts_dir: env_path("HEART_ARTIFACTS_DIR", "artifacts"),
            model_dir: env_path("HEART_MODEL_DIR", "artifacts/model"),
            plots_dir: env_path("HEART_PLOTS_DIR", "artifacts/plots"),
            tracking_dir: env_path("HEART_TRACKING_DIR", "experiments"),
        }
    }
}

impl Settings {
    /// Settings with every artifact path rooted under `base`.
    ///
    /// Used by tests and one-off invocations that must not touch the
    /// repository-level directories.
    pub fn rooted_at(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            raw_data_dir: base.join("data/raw"),
            processed_data_dir: base.join("data/processed"),
            artifacts_dir: base.join("artifacts"),
            model_dir: base.join("artifacts/model"),
            plots_dir: base.join("artifacts/plots"),
            tracking_dir: base.join("experiments"),
            ..Self::default()
        }
    }

    /// Default path of the raw dataset CSV
    pub fn raw_data_path(&self) -> PathBuf {
        self.raw_data_dir.join("heart.csv")
    }

    /// Default path of the cleaned dataset CSV
    pub fn processed_data_path(&self) -> PathBuf {
        self.processed_data_dir.join("heart.csv")
    }

    /// Path of the training summary JSON
    pub fn summary_path(&self) -> PathBuf {
        self.artifacts_dir.join("training_summary.json")
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn env_parse(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let settings = Settings::default();
        assert_eq!(settings.raw_data_path(), PathBuf::from("data/raw/heart.csv"));
        assert_eq!(
            settings.summary_path(),
            PathBuf::from("artifacts/training_summary.json")
        );
    }

    #[test]
    fn test_rooted_at_moves_artifacts() {
        let settings = Settings::rooted_at("/tmp/heartml-test");
        assert!(settings.model_dir.starts_with("/tmp/heartml-test"));
        assert!(settings.tracking_dir.starts_with("/tmp/heartml-test"));
        // sample path stays relative; tests override it explicitly
        assert_eq!(settings.sample_data_path, PathBuf::from("data/sample/sample.csv"));
    }
}
