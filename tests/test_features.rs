//! Integration test: feature pipeline over the sample dataset

use heartml::config::Settings;
use heartml::data::{load_sample, split_features_target, FEATURE_COLUMNS};
use heartml::features::ModelPipeline;
use heartml::training::{ClassifierModel, DummyClassifier};

#[test]
fn test_pipeline_fits_on_sample_data() {
    let settings = Settings::default();
    let df = load_sample(&settings).unwrap();
    let (x, y) = split_features_target(&df).unwrap();

    let mut pipeline =
        ModelPipeline::new(ClassifierModel::Dummy(DummyClassifier::most_frequent()));
    pipeline.fit(&x, &y).unwrap();

    let preds = pipeline.predict(&x).unwrap();
    assert_eq!(preds.len(), x.height());

    let proba = pipeline.predict_proba(&x).unwrap();
    assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
}

#[test]
fn test_feature_names_cover_expected_fields() {
    let settings = Settings::default();
    let df = load_sample(&settings).unwrap();
    let (x, y) = split_features_target(&df).unwrap();

    let mut pipeline =
        ModelPipeline::new(ClassifierModel::Dummy(DummyClassifier::most_frequent()));
    pipeline.fit(&x, &y).unwrap();

    let names = pipeline.features.feature_names();
    assert!(names.iter().any(|n| n == "age"));
    assert!(names.iter().any(|n| n.starts_with("thal_")));
    // One-hot expansion means at least as many output columns as inputs.
    assert!(names.len() >= FEATURE_COLUMNS.len());
}
