//! Exporting the chosen model for serving
//!
//! The export directory is the contract between training and the API: a
//! serialized pipeline plus a sidecar metadata file. Re-exporting fully
//! replaces the directory so no stale files from a previous model survive.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{HeartError, Result};
use crate::features::ModelPipeline;

pub const MODEL_FILE: &str = "model.json";
pub const METADATA_FILE: &str = "metadata.json";

/// Sidecar metadata identifying the exported model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub run_id: String,
    pub model_name: String,
    pub artifact_path: String,
}

/// Serialize the winning pipeline into `dir`, clearing prior contents first.
pub fn export_model(
    pipeline: &ModelPipeline,
    run_id: &str,
    model_name: &str,
    dir: &Path,
) -> Result<ExportMetadata> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::create_dir_all(dir)?;

    std::fs::write(
        dir.join(MODEL_FILE),
        serde_json::to_string_pretty(pipeline)?,
    )?;

    let metadata = ExportMetadata {
        run_id: run_id.to_string(),
        model_name: model_name.to_string(),
        artifact_path: dir.display().to_string(),
    };
    std::fs::write(
        dir.join(METADATA_FILE),
        serde_json::to_string_pretty(&metadata)?,
    )?;

    info!(model_name, run_id, path = %dir.display(), "exported model");
    Ok(metadata)
}

/// Load an exported pipeline and its metadata.
pub fn load_exported(dir: &Path) -> Result<(ModelPipeline, ExportMetadata)> {
    let model_path = dir.join(MODEL_FILE);
    if !model_path.exists() {
        return Err(HeartError::DataNotFound(model_path));
    }

    let pipeline: ModelPipeline =
        serde_json::from_str(&std::fs::read_to_string(&model_path)?)?;

    let meta_path = dir.join(METADATA_FILE);
    let metadata: ExportMetadata = if meta_path.exists() {
        serde_json::from_str(&std::fs::read_to_string(&meta_path)?)?
    } else {
        ExportMetadata {
            run_id: String::new(),
            model_name: format!("{}", pipeline.model.kind()),
            artifact_path: dir.display().to_string(),
        }
    };

    Ok((pipeline, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{ClassifierModel, DummyClassifier};

    fn dummy_pipeline() -> ModelPipeline {
        ModelPipeline::new(ClassifierModel::Dummy(DummyClassifier::most_frequent()))
    }

    #[test]
    fn test_export_and_load_roundtrip_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("model");

        let meta = export_model(&dummy_pipeline(), "run-1", "dummy", &dir).unwrap();
        assert_eq!(meta.run_id, "run-1");

        let (loaded, meta) = load_exported(&dir).unwrap();
        assert_eq!(meta.model_name, "dummy");
        assert!(matches!(loaded.model, ClassifierModel::Dummy(_)));
    }

    #[test]
    fn test_reexport_replaces_stale_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("model");

        export_model(&dummy_pipeline(), "run-1", "dummy", &dir).unwrap();
        std::fs::write(dir.join("stale.bin"), b"leftover").unwrap();

        export_model(&dummy_pipeline(), "run-2", "dummy", &dir).unwrap();
        assert!(!dir.join("stale.bin").exists());

        let (_, meta) = load_exported(&dir).unwrap();
        assert_eq!(meta.run_id, "run-2");
    }

    #[test]
    fn test_load_missing_dir_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_exported(&tmp.path().join("absent")).unwrap_err();
        assert!(matches!(err, HeartError::DataNotFound(_)));
    }
}
