//! Error responses for the serving API

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("model not loaded")]
    ModelUnavailable,

    #[error("prediction failed: {0}")]
    Prediction(String),
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServeError::ModelUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Model not loaded. Run `heartml train` then restart the API.".to_string(),
            ),
            ServeError::Prediction(detail) => {
                tracing::error!(detail = %detail, "prediction failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Prediction failed".to_string())
            }
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}
