//! Bagged decision-tree ensemble for churn classification
//!
//! Each tree is a CART classifier fit on a bootstrap sample of the training
//! rows. Per-tree seeds are drawn from one seeded generator before fitting,
//! so the parallel fit is reproducible for a given seed.

use chrono::{DateTime, Utc};
use linfa::prelude::*;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::DataFrame;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::encoding::EncodingRegistry;
use super::preprocess::{fit_transform, FeatureTable};
use super::target::{count_labels, outcome_mask};
use crate::error::{ChurnError, Result};

/// Ensemble hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Number of bootstrapped trees
    pub n_estimators: usize,
    /// Seed for bootstrap sampling
    pub seed: u64,
    /// Optional depth limit per tree (unbounded when `None`)
    pub max_depth: Option<usize>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            seed: 42,
            max_depth: None,
        }
    }
}

/// A fitted ensemble together with the ordered feature names it expects
#[derive(Serialize, Deserialize)]
pub struct ChurnModel {
    feature_names: Vec<String>,
    trees: Vec<DecisionTree<f64, usize>>,
    feature_importances: Vec<f64>,
    config: TrainerConfig,
}

impl std::fmt::Debug for ChurnModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChurnModel")
            .field("feature_names", &self.feature_names)
            .field("n_trees", &self.trees.len())
            .field("config", &self.config)
            .finish()
    }
}

impl ChurnModel {
    /// Feature names in the exact order the trees were fit on
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// `(feature, importance)` pairs sorted by descending importance
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        let mut pairs: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.feature_importances.iter().copied())
            .collect();
        pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        pairs
    }

    /// Churn probability per row: the fraction of trees voting churn.
    ///
    /// `values` must already be aligned to [`Self::feature_names`].
    pub fn predict_proba(&self, values: &Array2<f64>) -> Result<Vec<f64>> {
        if values.ncols() != self.feature_names.len() {
            return Err(ChurnError::InvalidRecord(format!(
                "expected {} features, got {}",
                self.feature_names.len(),
                values.ncols()
            )));
        }
        if self.trees.is_empty() || values.nrows() == 0 {
            return Ok(vec![0.0; values.nrows()]);
        }

        let mut votes = vec![0usize; values.nrows()];
        for tree in &self.trees {
            let predicted: Array1<usize> = tree.predict(values);
            for (count, label) in votes.iter_mut().zip(predicted.iter()) {
                if *label == 1 {
                    *count += 1;
                }
            }
        }

        let n_trees = self.trees.len() as f64;
        Ok(votes.into_iter().map(|v| v as f64 / n_trees).collect())
    }

    /// Hard labels: churn when the probability exceeds one half
    pub fn predict(&self, values: &Array2<f64>) -> Result<Vec<usize>> {
        Ok(self
            .predict_proba(values)?
            .into_iter()
            .map(|p| usize::from(p > 0.5))
            .collect())
    }
}

/// Fit the ensemble on an encoded table and aligned labels
pub fn train(features: &FeatureTable, labels: &[usize], config: &TrainerConfig) -> Result<ChurnModel> {
    if labels.is_empty() {
        return Err(ChurnError::EmptyLabels);
    }
    if labels.len() != features.n_rows() {
        return Err(ChurnError::LabelMismatch {
            rows: features.n_rows(),
            labels: labels.len(),
        });
    }
    if features.n_features() == 0 {
        return Err(ChurnError::Training("dataset has no feature columns".to_string()));
    }
    if config.n_estimators == 0 {
        return Err(ChurnError::Training("n_estimators must be at least 1".to_string()));
    }

    let mut seeder = StdRng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_estimators).map(|_| seeder.gen()).collect();
    let targets = Array1::from(labels.to_vec());

    debug!(
        rows = features.n_rows(),
        features = features.n_features(),
        trees = config.n_estimators,
        "Fitting decision tree ensemble"
    );

    let trees = tree_seeds
        .par_iter()
        .map(|&seed| fit_tree(features.values(), &targets, seed, config))
        .collect::<Result<Vec<_>>>()?;

    let feature_importances = average_importances(&trees, features.n_features());

    Ok(ChurnModel {
        feature_names: features.names().to_vec(),
        trees,
        feature_importances,
        config: config.clone(),
    })
}

fn fit_tree(
    records: &Array2<f64>,
    targets: &Array1<usize>,
    seed: u64,
    config: &TrainerConfig,
) -> Result<DecisionTree<f64, usize>> {
    let n = records.nrows();
    let mut rng = StdRng::seed_from_u64(seed);
    let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

    let dataset = Dataset::new(
        records.select(Axis(0), &sample),
        targets.select(Axis(0), &sample),
    );

    DecisionTree::<f64, usize>::params()
        .split_quality(SplitQuality::Gini)
        .max_depth(config.max_depth)
        .fit(&dataset)
        .map_err(|e| ChurnError::Training(e.to_string()))
}

/// Mean of the per-tree importances, renormalized to sum to one
fn average_importances(trees: &[DecisionTree<f64, usize>], n_features: usize) -> Vec<f64> {
    let mut totals = vec![0.0; n_features];
    for tree in trees {
        for (total, value) in totals.iter_mut().zip(tree.feature_importance()) {
            // Single-leaf trees report NaN importances
            if value.is_finite() {
                *total += value;
            }
        }
    }

    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|t| *t /= sum);
    }
    totals
}

/// A trained model and the registry that produced its features.
///
/// The two are only ever created, persisted and swapped together.
#[derive(Debug)]
pub struct TrainedPipeline {
    pub model: ChurnModel,
    pub registry: EncodingRegistry,
    pub trained_at: DateTime<Utc>,
}

/// Preprocess a labeled dataset and train a model on its labeled rows
pub fn fit_pipeline(df: &DataFrame, config: &TrainerConfig) -> Result<TrainedPipeline> {
    let mask = outcome_mask(df)?;
    let (features, registry) = fit_transform(df)?;

    let labeled_rows: Vec<usize> = mask
        .iter()
        .enumerate()
        .filter_map(|(i, label)| label.map(|_| i))
        .collect();
    let labels: Vec<usize> = mask.iter().flatten().copied().collect();

    if labels.is_empty() {
        return Err(ChurnError::EmptyLabels);
    }
    let (churned, retained, skipped) = count_labels(&mask);
    debug!(churned, retained, "Outcome distribution");
    if skipped > 0 {
        info!(skipped, "Rows without a yes/no outcome excluded from training");
    }

    let features = if skipped > 0 {
        features.select_rows(&labeled_rows)
    } else {
        features
    };

    let model = train(&features, &labels, config)?;
    info!(
        rows = labels.len(),
        features = model.feature_names().len(),
        trees = model.n_trees(),
        "Churn model trained"
    );

    Ok(TrainedPipeline {
        model,
        registry,
        trained_at: Utc::now(),
    })
}
