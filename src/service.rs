//! Application state and the boundary operations built on it
//!
//! `ChurnService` owns the current dataset and the current trained pipeline.
//! Uploads are serialized by a single write lock; the dataset and pipeline
//! are immutable snapshots behind `Arc`s that are swapped wholesale, so a
//! reader always sees a complete (model, registry) pair.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{ChurnError, Result};
use crate::pipeline::{
    evaluate_accuracy, fit_pipeline, has_outcome, parse_csv_bytes, predict_records, ModelStore,
    Prediction, TrainedPipeline, TrainerConfig, DEFAULT_INFER_SCHEMA_LENGTH,
};
use crate::report::{
    billing_analysis, churn_summary, demographic_analysis, services_analysis, tenure_analysis,
    BillingAnalysis, ChurnSummary, DemographicAnalysis, ServicesAnalysis, TenureBand,
};

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding the dataset, model and encoder files
    pub data_dir: PathBuf,
    pub trainer: TrainerConfig,
    /// Rows used for CSV schema inference (0 = full scan)
    pub infer_schema_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            trainer: TrainerConfig::default(),
            infer_schema_length: DEFAULT_INFER_SCHEMA_LENGTH,
        }
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadReport {
    pub message: String,
    pub rows: usize,
    pub columns: usize,
    /// Whether the upload carried outcomes and retrained the model
    pub trained: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Strictly typed prediction input with a fixed field set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManualRecord {
    pub gender: String,
    pub tenure: f64,
    #[serde(rename = "MonthlyCharges")]
    pub monthly_charges: f64,
    #[serde(rename = "Contract")]
    pub contract: String,
    #[serde(rename = "SeniorCitizen")]
    pub senior_citizen: u8,
    #[serde(rename = "Partner")]
    pub partner: String,
    #[serde(rename = "Dependents")]
    pub dependents: String,
    #[serde(rename = "PhoneService")]
    pub phone_service: String,
    #[serde(rename = "InternetService")]
    pub internet_service: String,
}

impl ManualRecord {
    fn validate(&self) -> Result<()> {
        if self.senior_citizen > 1 {
            return Err(ChurnError::InvalidRecord(
                "SeniorCitizen must be 0 or 1".to_string(),
            ));
        }
        if !self.tenure.is_finite() || self.tenure < 0.0 {
            return Err(ChurnError::InvalidRecord(
                "tenure must be a non-negative number".to_string(),
            ));
        }
        if !self.monthly_charges.is_finite() || self.monthly_charges < 0.0 {
            return Err(ChurnError::InvalidRecord(
                "MonthlyCharges must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    /// The record as a generic JSON row with dataset column names
    pub fn to_record(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(ChurnError::InvalidRecord(
                "record did not serialize to an object".to_string(),
            )),
        }
    }
}

/// Owned application state shared by all boundary operations
pub struct ChurnService {
    config: ServiceConfig,
    store: ModelStore,
    write_lock: Mutex<()>,
    dataset: RwLock<Option<Arc<DataFrame>>>,
    pipeline: RwLock<Option<Arc<TrainedPipeline>>>,
}

impl ChurnService {
    /// Open the service, restoring any persisted dataset and model
    pub fn open(config: ServiceConfig) -> Result<Self> {
        let store = ModelStore::new(&config.data_dir);

        let dataset = match store.load_dataset()? {
            Some(bytes) => match parse_csv_bytes(&bytes, config.infer_schema_length) {
                Ok(df) => {
                    info!(rows = df.height(), "Restored persisted dataset");
                    Some(Arc::new(df))
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring unreadable persisted dataset");
                    None
                }
            },
            None => None,
        };
        let pipeline = match store.load() {
            Ok(pipeline) => pipeline.map(Arc::new),
            Err(e @ (ChurnError::ArtifactMismatch(_) | ChurnError::Serialization(_))) => {
                warn!(error = %e, "Ignoring unusable persisted model until the next labeled upload");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            config,
            store,
            write_lock: Mutex::new(()),
            dataset: RwLock::new(dataset),
            pipeline: RwLock::new(pipeline),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn has_dataset(&self) -> bool {
        self.current_dataset().is_ok()
    }

    pub fn has_model(&self) -> bool {
        self.current_pipeline().is_ok()
    }

    /// Replace the dataset and, when it carries outcomes, retrain.
    ///
    /// The dataset is persisted and swapped in before training starts; a
    /// training failure is reported but the new dataset stays current.
    pub fn upload(&self, bytes: &[u8]) -> Result<UploadReport> {
        let _guard = self.write_lock.lock().map_err(|_| ChurnError::StatePoisoned)?;

        let df = parse_csv_bytes(bytes, self.config.infer_schema_length)?;
        let (rows, columns) = df.shape();
        self.store.save_dataset(bytes)?;

        let df = Arc::new(df);
        *self.dataset.write().map_err(|_| ChurnError::StatePoisoned)? = Some(Arc::clone(&df));
        info!(rows, columns, "Dataset replaced");

        let trained = if has_outcome(&df) {
            let pipeline = fit_pipeline(&df, &self.config.trainer)?;
            self.store.save(&pipeline)?;
            *self.pipeline.write().map_err(|_| ChurnError::StatePoisoned)? =
                Some(Arc::new(pipeline));
            true
        } else {
            info!("Upload has no Churn column, keeping the current model");
            false
        };

        Ok(UploadReport {
            message: "File uploaded and processed successfully".to_string(),
            rows,
            columns,
            trained,
        })
    }

    pub fn churn_summary(&self) -> Result<ChurnSummary> {
        let df = self.current_dataset()?;
        churn_summary(&df)
    }

    pub fn demographic_analysis(&self) -> Result<DemographicAnalysis> {
        let df = self.current_dataset()?;
        demographic_analysis(&df)
    }

    pub fn services_analysis(&self) -> Result<ServicesAnalysis> {
        let df = self.current_dataset()?;
        services_analysis(&df)
    }

    pub fn tenure_analysis(&self) -> Result<Vec<TenureBand>> {
        let df = self.current_dataset()?;
        tenure_analysis(&df)
    }

    pub fn billing_analysis(&self) -> Result<BillingAnalysis> {
        let df = self.current_dataset()?;
        billing_analysis(&df)
    }

    /// Model feature importances, descending
    pub fn feature_importance(&self) -> Result<Vec<FeatureImportance>> {
        Ok(self
            .current_pipeline()?
            .model
            .feature_importances()
            .into_iter()
            .map(|(feature, importance)| FeatureImportance {
                feature,
                importance,
            })
            .collect())
    }

    /// Score raw records against the current model
    pub fn predict(&self, records: &[Map<String, Value>]) -> Result<Vec<Prediction>> {
        let pipeline = self.current_pipeline()?;
        predict_records(records, &pipeline)
    }

    /// Score one strictly typed record
    pub fn manual_predict(&self, record: &ManualRecord) -> Result<Prediction> {
        record.validate()?;
        let pipeline = self.current_pipeline()?;
        predict_records(&[record.to_record()?], &pipeline)?
            .into_iter()
            .next()
            .ok_or_else(|| ChurnError::InvalidRecord("no prediction produced".to_string()))
    }

    /// Re-run the current model over the current dataset, in percent
    pub fn model_accuracy(&self) -> Result<f64> {
        let dataset = self.current_dataset()?;
        let pipeline = self.current_pipeline()?;
        if !has_outcome(&dataset) {
            return Err(ChurnError::MissingOutcomeColumn);
        }
        evaluate_accuracy(&dataset, &pipeline)
    }

    fn current_dataset(&self) -> Result<Arc<DataFrame>> {
        self.dataset
            .read()
            .map_err(|_| ChurnError::StatePoisoned)?
            .clone()
            .ok_or(ChurnError::NoDataUploaded)
    }

    fn current_pipeline(&self) -> Result<Arc<TrainedPipeline>> {
        self.pipeline
            .read()
            .map_err(|_| ChurnError::StatePoisoned)?
            .clone()
            .ok_or(ChurnError::ModelNotTrained)
    }
}
