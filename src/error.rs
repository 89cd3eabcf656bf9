//! Error types for the churn pipeline and service operations

use polars::prelude::PolarsError;
use thiserror::Error;

/// Result type alias for churnscope operations
pub type Result<T> = std::result::Result<T, ChurnError>;

/// Errors raised by the pipeline, the model store and the service boundary
#[derive(Error, Debug)]
pub enum ChurnError {
    /// A query arrived before any dataset was uploaded
    #[error("No data uploaded")]
    NoDataUploaded,

    /// Prediction or model analysis requested before a labeled upload
    #[error("Model not trained")]
    ModelNotTrained,

    /// Inference saw a categorical value the encoder was never fitted on
    #[error("Unseen category '{value}' in column '{column}'")]
    UnseenCategory { column: String, value: String },

    /// Uploaded bytes could not be parsed as a dataset
    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    /// Training or evaluation needs the `Churn` column
    #[error("Invalid data: dataset has no 'Churn' column")]
    MissingOutcomeColumn,

    /// The outcome column holds no yes/no values
    #[error("Invalid data: no rows with a yes/no churn outcome")]
    EmptyLabels,

    #[error("Label count {labels} does not match feature rows {rows}")]
    LabelMismatch { rows: usize, labels: usize },

    /// Persisted model and encoder files do not belong together
    #[error("Model artifacts do not match: {0}")]
    ArtifactMismatch(String),

    /// A prediction record could not be interpreted
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data error: {0}")]
    Polars(#[from] PolarsError),

    /// A panic while holding a state lock left it poisoned
    #[error("Service state lock poisoned")]
    StatePoisoned,
}

impl ChurnError {
    /// Data-availability errors that read-type queries report as soft payloads
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::NoDataUploaded | Self::ModelNotTrained)
    }
}

impl From<serde_json::Error> for ChurnError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<bincode::Error> for ChurnError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
