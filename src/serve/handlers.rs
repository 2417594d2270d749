//! HTTP request handlers

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::ServeError;
use super::metrics;
use super::state::AppState;

/// Health probe payload
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model_version: Option<String>,
    pub run_id: Option<String>,
}

/// One prediction request: the 13 canonical features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub age: f64,
    /// 1 = male, 0 = female
    pub sex: i64,
    /// Chest pain type
    pub cp: i64,
    pub trestbps: f64,
    pub chol: f64,
    pub fbs: i64,
    pub restecg: i64,
    pub thalach: f64,
    pub exang: i64,
    pub oldpeak: f64,
    pub slope: i64,
    pub ca: i64,
    pub thal: i64,
}

impl PredictionRequest {
    /// One-row frame in the canonical column order.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        df!(
            "age" => &[self.age],
            "sex" => &[self.sex as f64],
            "cp" => &[self.cp as f64],
            "trestbps" => &[self.trestbps],
            "chol" => &[self.chol],
            "fbs" => &[self.fbs as f64],
            "restecg" => &[self.restecg as f64],
            "thalach" => &[self.thalach],
            "exang" => &[self.exang as f64],
            "oldpeak" => &[self.oldpeak],
            "slope" => &[self.slope as f64],
            "ca" => &[self.ca as f64],
            "thal" => &[self.thal as f64]
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: i64,
    pub probability: f64,
    pub model_version: Option<String>,
    pub run_id: Option<String>,
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let model = state.model().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        model_loaded: model.is_some(),
        model_version: model.as_ref().map(|m| m.version.clone()),
        run_id: model.as_ref().map(|m| m.run_id.clone()),
    })
}

/// `POST /predict`
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PredictionRequest>,
) -> Result<Json<PredictionResponse>, ServeError> {
    let model = state.model().await.ok_or(ServeError::ModelUnavailable)?;

    let df = payload
        .to_dataframe()
        .map_err(|e| ServeError::Prediction(e.to_string()))?;

    let preds = model
        .pipeline
        .predict(&df)
        .map_err(|e| ServeError::Prediction(e.to_string()))?;
    let prediction = if preds.get(0).copied().unwrap_or(0.0) > 0.5 { 1 } else { 0 };

    // Probability falls back to the hard label if proba is unavailable.
    let probability = model
        .pipeline
        .predict_proba(&df)
        .ok()
        .and_then(|p| p.get(0).copied())
        .unwrap_or(prediction as f64);

    Ok(Json(PredictionResponse {
        prediction,
        probability,
        model_version: Some(model.version.clone()),
        run_id: Some(model.run_id.clone()),
    }))
}

/// `GET /metrics`
pub async fn metrics_exposition() -> impl IntoResponse {
    (
        [("content-type", "text/plain; version=0.0.4")],
        metrics::exposition(),
    )
}
