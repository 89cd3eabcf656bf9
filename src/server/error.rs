//! HTTP mapping for service errors

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::ChurnError;

/// Hard failure returned by a handler as a non-2xx `{error}` payload
#[derive(Debug)]
pub enum ApiError {
    Churn(ChurnError),
    /// A blocking task panicked or was cancelled
    Task(String),
    /// The multipart body could not be read, including oversized bodies
    Multipart(MultipartError),
    /// The multipart body had no file part
    Upload(String),
    /// A JSON body was missing, unparseable or the wrong shape
    JsonBody(JsonRejection),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Churn(e) => match e {
                ChurnError::NoDataUploaded => StatusCode::NOT_FOUND,
                ChurnError::ModelNotTrained | ChurnError::MalformedUpload(_) => {
                    StatusCode::BAD_REQUEST
                }
                ChurnError::MissingOutcomeColumn
                | ChurnError::EmptyLabels
                | ChurnError::UnseenCategory { .. }
                | ChurnError::InvalidRecord(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ChurnError::LabelMismatch { .. }
                | ChurnError::ArtifactMismatch(_)
                | ChurnError::Training(_)
                | ChurnError::Serialization(_)
                | ChurnError::Io(_)
                | ChurnError::Polars(_)
                | ChurnError::StatePoisoned => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Multipart(e) => e.status(),
            Self::Upload(_) => StatusCode::BAD_REQUEST,
            Self::JsonBody(e) => e.status(),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Churn(e) => e.to_string(),
            Self::Task(message) => format!("Background task failed: {}", message),
            Self::Multipart(e) => format!("Malformed upload: {}", e.body_text()),
            Self::Upload(message) => format!("Malformed upload: {}", message),
            Self::JsonBody(e) => e.body_text(),
        }
    }
}

impl From<ChurnError> for ApiError {
    fn from(e: ChurnError) -> Self {
        Self::Churn(e)
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self::Multipart(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::JsonBody(e)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();
        if status.is_server_error() {
            error!(%status, error = %message, "Request failed");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}
