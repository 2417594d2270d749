//! Integration test: serving API endpoints

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use heartml::config::Settings;
use heartml::data::{load_sample, split_features_target};
use heartml::features::ModelPipeline;
use heartml::serve::{create_router, AppState, LoadedModel};
use heartml::training::{ClassifierModel, DummyClassifier};
use tower::ServiceExt;

async fn loaded_state() -> Arc<AppState> {
    let settings = Settings::default();
    let df = load_sample(&settings).unwrap();
    let (x, y) = split_features_target(&df).unwrap();

    let mut pipeline =
        ModelPipeline::new(ClassifierModel::Dummy(DummyClassifier::most_frequent()));
    pipeline.fit(&x, &y).unwrap();

    let state = Arc::new(AppState::new());
    state
        .set_model(Some(Arc::new(LoadedModel {
            pipeline,
            version: "v-test".to_string(),
            run_id: "run-123".to_string(),
        })))
        .await;
    state
}

fn sample_payload() -> serde_json::Value {
    serde_json::json!({
        "age": 54,
        "sex": 1,
        "cp": 0,
        "trestbps": 130,
        "chol": 246,
        "fbs": 0,
        "restecg": 1,
        "thalach": 150,
        "exang": 0,
        "oldpeak": 1.2,
        "slope": 2,
        "ca": 0,
        "thal": 2
    })
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_without_model() {
    let app = create_router(Arc::new(AppState::new()));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model_loaded"], false);
}

#[tokio::test]
async fn test_health_with_model_reports_identity() {
    let app = create_router(loaded_state().await);
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["model_version"], "v-test");
    assert_eq!(body["run_id"], "run-123");
}

#[tokio::test]
async fn test_predict_without_model_returns_503() {
    let app = create_router(Arc::new(AppState::new()));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(sample_payload().to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_predict_with_loaded_model() {
    let app = create_router(loaded_state().await);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(sample_payload().to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let prediction = body["prediction"].as_i64().unwrap();
    assert!(prediction == 0 || prediction == 1);
    let probability = body["probability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&probability));
    assert_eq!(body["model_version"], "v-test");
    assert_eq!(body["run_id"], "run-123");
}

#[tokio::test]
async fn test_metrics_exposition() {
    let app = create_router(loaded_state().await);

    // Drive one tracked request so the counters have samples.
    let health = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("heart_api_requests_total"));
}
