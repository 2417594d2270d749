//! Error types for the heartml pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for heartml operations
pub type Result<T> = std::result::Result<T, HeartError>;

/// Main error type for the heartml pipeline
#[derive(Error, Debug)]
pub enum HeartError {
    #[error("data not found at {0}; run `heartml prepare` or point --data at a CSV")]
    DataNotFound(PathBuf),

    #[error("missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("data error: {0}")]
    Data(String),

    #[error("feature pipeline error: {0}")]
    Features(String),

    #[error("training error: {0}")]
    Training(String),

    #[error("invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("model not fitted")]
    ModelNotFitted,

    #[error("tracking error: {0}")]
    Tracking(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<polars::error::PolarsError> for HeartError {
    fn from(err: polars::error::PolarsError) -> Self {
        HeartError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for HeartError {
    fn from(err: serde_json::Error) -> Self {
        HeartError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HeartError::MissingColumns(vec!["thal".to_string()]);
        assert!(err.to_string().contains("thal"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HeartError = io_err.into();
        assert!(matches!(err, HeartError::Io(_)));
    }
}
