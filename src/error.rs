//! Error types for the cinematch pipeline

use thiserror::Error;

/// Result type alias for cinematch operations
pub type Result<T> = std::result::Result<T, CinematchError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum CinematchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Empty result: {0}")]
    EmptyResult(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Model not fitted")]
    ModelNotFitted,
}

impl From<polars::error::PolarsError> for CinematchError {
    fn from(err: polars::error::PolarsError) -> Self {
        CinematchError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for CinematchError {
    fn from(err: serde_json::Error) -> Self {
        CinematchError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for CinematchError {
    fn from(err: serde_yaml::Error) -> Self {
        CinematchError::ConfigError(err.to_string())
    }
}
