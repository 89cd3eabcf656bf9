//! Route handlers
//!
//! Read-type queries answer `200 {error}` while no dataset or model is
//! available so dashboards can degrade gracefully. Uploads, accuracy checks
//! and manual predictions fail hard through [`ApiError`], as do JSON bodies
//! that do not deserialize.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::error::ApiError;
use crate::error::Result;
use crate::pipeline::{Prediction, RiskLevel};
use crate::service::{ChurnService, ManualRecord, UploadReport};

type AppState = State<Arc<ChurnService>>;

/// `/predict` accepts a single record or a list of records
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PredictRequest {
    One(Map<String, Value>),
    Many(Vec<Map<String, Value>>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictResponse {
    pub churn_probability: f64,
    pub risk_level: RiskLevel,
}

impl From<Prediction> for PredictResponse {
    fn from(p: Prediction) -> Self {
        Self {
            churn_probability: p.probability,
            risk_level: p.risk,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualPredictResponse {
    pub churn_probability: f64,
    pub prediction: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AccuracyResponse {
    pub accuracy: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub dataset_loaded: bool,
    pub model_trained: bool,
}

pub async fn upload(
    State(service): AppState,
    mut multipart: Multipart,
) -> std::result::Result<Json<UploadReport>, ApiError> {
    let mut contents = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") || contents.is_none() {
            contents = Some(field.bytes().await?);
        }
    }
    let bytes = contents.ok_or_else(|| ApiError::Upload("no file field".to_string()))?;

    let report = tokio::task::spawn_blocking(move || service.upload(&bytes)).await??;
    Ok(Json(report))
}

pub async fn churn_summary(State(service): AppState) -> std::result::Result<Response, ApiError> {
    soft(service.churn_summary())
}

pub async fn feature_importance(
    State(service): AppState,
) -> std::result::Result<Response, ApiError> {
    soft(service.feature_importance())
}

pub async fn demographic_analysis(
    State(service): AppState,
) -> std::result::Result<Response, ApiError> {
    soft(service.demographic_analysis())
}

pub async fn services_analysis(
    State(service): AppState,
) -> std::result::Result<Response, ApiError> {
    soft(service.services_analysis())
}

pub async fn tenure_analysis(State(service): AppState) -> std::result::Result<Response, ApiError> {
    soft(service.tenure_analysis())
}

pub async fn billing_analysis(State(service): AppState) -> std::result::Result<Response, ApiError> {
    soft(service.billing_analysis())
}

pub async fn predict(
    State(service): AppState,
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> std::result::Result<Response, ApiError> {
    let Json(request) = payload?;
    match request {
        PredictRequest::One(record) => soft(
            service
                .predict(std::slice::from_ref(&record))
                .map(|p| p.into_iter().map(PredictResponse::from).next()),
        ),
        PredictRequest::Many(records) => soft(
            service
                .predict(&records)
                .map(|p| p.into_iter().map(PredictResponse::from).collect::<Vec<_>>()),
        ),
    }
}

pub async fn manual_predict(
    State(service): AppState,
    payload: std::result::Result<Json<ManualRecord>, JsonRejection>,
) -> std::result::Result<Json<ManualPredictResponse>, ApiError> {
    let Json(record) = payload?;
    let prediction = service.manual_predict(&record)?;
    Ok(Json(ManualPredictResponse {
        churn_probability: prediction.probability,
        prediction: if prediction.churn { "Yes" } else { "No" },
    }))
}

pub async fn model_accuracy(
    State(service): AppState,
) -> std::result::Result<Json<AccuracyResponse>, ApiError> {
    let accuracy = tokio::task::spawn_blocking(move || service.model_accuracy()).await??;
    Ok(Json(AccuracyResponse { accuracy }))
}

pub async fn health(State(service): AppState) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        dataset_loaded: service.has_dataset(),
        model_trained: service.has_model(),
    })
}

/// Unavailable data becomes a `200 {error}` payload; other errors stay hard
fn soft<T: Serialize>(result: Result<T>) -> std::result::Result<Response, ApiError> {
    match result {
        Ok(value) => Ok(Json(value).into_response()),
        Err(e) if e.is_unavailable() => Ok(Json(json!({ "error": e.to_string() })).into_response()),
        Err(e) => Err(e.into()),
    }
}
