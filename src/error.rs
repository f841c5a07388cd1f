//! Error types for the training pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for dataset loading, training, selection and publication
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No external dataset found and no fallback dataset is available")]
    NoExternalData,

    #[error("Data error: {0}")]
    Data(String),

    #[error("Invalid train/test split: {0}")]
    InvalidSplit(String),

    #[error("Training failed for candidate '{candidate}': {reason}")]
    TrainingFailure { candidate: String, reason: String },

    #[error("Cannot select a model from an empty candidate set")]
    EmptyCandidateSet,

    #[error("Failed to publish artifact {}: {reason}", path.display())]
    PublishFailure { path: PathBuf, reason: String },

    #[error("Reporting error: {0}")]
    Reporting(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PipelineError {
    /// Wrap any error raised while writing `path` as a publish failure
    pub fn publish(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PipelineError::PublishFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<polars::prelude::PolarsError> for PipelineError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        PipelineError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PipelineError {
    fn from(err: ndarray::ShapeError) -> Self {
        PipelineError::ShapeMismatch {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
