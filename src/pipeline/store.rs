//! On-disk persistence for the trained pipeline and the raw dataset
//!
//! The model is written with bincode, the encoder registry as JSON. Both
//! carry the pipeline's training stamp, and `load` refuses a pair whose
//! stamps disagree.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::encoding::EncodingRegistry;
use super::trainer::{ChurnModel, TrainedPipeline};
use crate::error::{ChurnError, Result};

pub const MODEL_FILE: &str = "model.bin";
pub const REGISTRY_FILE: &str = "encoders.json";
pub const DATASET_FILE: &str = "dataset.csv";

#[derive(Serialize)]
struct RegistryFileRef<'a> {
    trained_at: DateTime<Utc>,
    registry: &'a EncodingRegistry,
}

#[derive(Deserialize)]
struct RegistryFile {
    trained_at: DateTime<Utc>,
    registry: EncodingRegistry,
}

/// Fixed, well-known artifact locations under one data directory
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.dir.join(REGISTRY_FILE)
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.dir.join(DATASET_FILE)
    }

    /// Persist model and registry as one unit.
    ///
    /// Both are fully written to temporary files before either is renamed
    /// into place. The previous model is set aside while the new pair is
    /// swapped in and restored if the registry cannot follow, so a failed
    /// save leaves the previous pair on disk.
    pub fn save(&self, pipeline: &TrainedPipeline) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let model_bytes = bincode::serialize(&(pipeline.trained_at, &pipeline.model))?;
        let registry_json = serde_json::to_vec_pretty(&RegistryFileRef {
            trained_at: pipeline.trained_at,
            registry: &pipeline.registry,
        })?;

        let model_path = self.model_path();
        let model_tmp = temp_path(&model_path);
        let registry_tmp = temp_path(&self.registry_path());
        fs::write(&model_tmp, model_bytes)?;
        if let Err(e) = fs::write(&registry_tmp, registry_json) {
            let _ = fs::remove_file(&model_tmp);
            return Err(e.into());
        }

        let backup = backup_path(&model_path);
        let had_previous = model_path.exists();
        if had_previous {
            if let Err(e) = fs::rename(&model_path, &backup) {
                remove_temp_files(&[model_tmp.as_path(), registry_tmp.as_path()]);
                return Err(e.into());
            }
        }

        let swapped = fs::rename(&model_tmp, &model_path)
            .and_then(|()| fs::rename(&registry_tmp, self.registry_path()));
        if let Err(e) = swapped {
            warn!(error = %e, "Saving encoders failed, restoring the previous model");
            let _ = fs::remove_file(&model_path);
            if had_previous {
                let _ = fs::rename(&backup, &model_path);
            }
            remove_temp_files(&[model_tmp.as_path(), registry_tmp.as_path()]);
            return Err(e.into());
        }

        if had_previous {
            let _ = fs::remove_file(&backup);
        }
        info!(dir = %self.dir.display(), "Saved model and encoders");
        Ok(())
    }

    /// Load the persisted pair; `None` when nothing has been trained yet
    pub fn load(&self) -> Result<Option<TrainedPipeline>> {
        let model_path = self.model_path();
        let registry_path = self.registry_path();

        match (model_path.exists(), registry_path.exists()) {
            (false, false) => {
                debug!(dir = %self.dir.display(), "No persisted model");
                return Ok(None);
            }
            (true, false) => {
                return Err(ChurnError::ArtifactMismatch(format!(
                    "{} exists without {}",
                    MODEL_FILE, REGISTRY_FILE
                )))
            }
            (false, true) => {
                return Err(ChurnError::ArtifactMismatch(format!(
                    "{} exists without {}",
                    REGISTRY_FILE, MODEL_FILE
                )))
            }
            (true, true) => {}
        }

        let (model_stamp, model): (DateTime<Utc>, ChurnModel) =
            bincode::deserialize(&fs::read(&model_path)?)?;
        let registry_file: RegistryFile = serde_json::from_slice(&fs::read(&registry_path)?)?;

        if model_stamp != registry_file.trained_at {
            return Err(ChurnError::ArtifactMismatch(format!(
                "model trained at {} but encoders fitted at {}",
                model_stamp, registry_file.trained_at
            )));
        }

        if let Some(column) = registry_file
            .registry
            .categorical_columns()
            .find(|c| !model.feature_names().iter().any(|f| f == c))
        {
            return Err(ChurnError::ArtifactMismatch(format!(
                "encoder for '{}' has no matching model feature",
                column
            )));
        }

        info!(trained_at = %model_stamp, "Loaded persisted model");
        Ok(Some(TrainedPipeline {
            model,
            registry: registry_file.registry,
            trained_at: model_stamp,
        }))
    }

    /// Overwrite the stored dataset with the uploaded bytes, verbatim
    pub fn save_dataset(&self, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let tmp = temp_path(&self.dataset_path());
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, self.dataset_path())?;
        Ok(())
    }

    pub fn load_dataset(&self) -> Result<Option<Vec<u8>>> {
        let path = self.dataset_path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, ".tmp")
}

fn backup_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, ".bak")
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

fn remove_temp_files(paths: &[&Path]) {
    for path in paths {
        if path.exists() {
            let _ = fs::remove_file(path);
        }
    }
}
