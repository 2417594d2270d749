//! Integration test: quick end-to-end training run

use heartml::config::Settings;
use heartml::export::ExportMetadata;
use heartml::train::{run_training, SpecSummary, TrainOptions};

#[test]
fn test_quick_training_exports_model_and_summary() {
    let tmp = tempfile::tempdir().unwrap();
    let settings = Settings::rooted_at(tmp.path());

    let opts = TrainOptions {
        quick: true,
        test_size: 0.25,
        data: None,
    };
    let report = run_training(&settings, &opts).unwrap();

    // Exported artifact with non-empty run id
    let metadata_path = settings.model_dir.join("metadata.json");
    assert!(metadata_path.exists());
    assert!(settings.model_dir.join("model.json").exists());

    let metadata: ExportMetadata =
        serde_json::from_str(&std::fs::read_to_string(&metadata_path).unwrap()).unwrap();
    assert!(!metadata.run_id.is_empty());
    assert_eq!(metadata.run_id, report.best_run_id);

    // Summary is a non-empty array with one entry per catalog spec
    let summary_text = std::fs::read_to_string(settings.summary_path()).unwrap();
    let summary: Vec<SpecSummary> = serde_json::from_str(&summary_text).unwrap();
    assert_eq!(summary.len(), 3);

    let names: Vec<&str> = summary.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["dummy", "log_reg", "random_forest"]);

    for entry in &summary {
        assert!(!entry.run_id.is_empty());
        assert!(entry.metrics.contains_key("roc_auc"));
        assert!(entry.metrics.contains_key("cv_roc_auc"));
        assert_eq!(entry.plots.len(), 2);
        for plot in &entry.plots {
            assert!(std::path::Path::new(plot).exists(), "missing plot {plot}");
        }
    }

    // A real model should not lose to the baseline on ranking quality.
    let best = summary
        .iter()
        .find(|s| s.name == report.best_name)
        .unwrap();
    let dummy = summary.iter().find(|s| s.name == "dummy").unwrap();
    assert!(best.metrics["roc_auc"] >= dummy.metrics["roc_auc"]);
}

#[test]
fn test_rerun_replaces_export() {
    let tmp = tempfile::tempdir().unwrap();
    let settings = Settings::rooted_at(tmp.path());
    let opts = TrainOptions {
        quick: true,
        test_size: 0.25,
        data: None,
    };

    run_training(&settings, &opts).unwrap();
    // Plant a stale file where the export lives.
    std::fs::write(settings.model_dir.join("stale.bin"), b"old").unwrap();

    run_training(&settings, &opts).unwrap();
    assert!(!settings.model_dir.join("stale.bin").exists());
    assert!(settings.model_dir.join("model.json").exists());
}
