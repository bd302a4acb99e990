//! Per-symbol binary classifier and its persisted form.

pub mod forest;
pub mod tree;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineError;
use crate::domain::features::{FeatureRow, FEATURE_COLUMNS};
use crate::domain::label::LabeledRow;

pub use forest::{ForestConfig, RandomForest};

/// Row-major training matrix with 0/1 labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

impl Dataset {
    pub fn new(features: Vec<Vec<f64>>, labels: Vec<u8>) -> Result<Self, String> {
        if features.len() != labels.len() {
            return Err(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            ));
        }
        if let Some(width) = features.first().map(Vec::len) {
            if features.iter().any(|row| row.len() != width) {
                return Err("feature rows have different widths".to_string());
            }
        }
        if labels.iter().any(|&l| l > 1) {
            return Err("labels must be 0 or 1".to_string());
        }
        Ok(Self { features, labels })
    }

    pub fn from_labeled(rows: &[LabeledRow]) -> Self {
        Self {
            features: rows.iter().map(|r| r.features.feature_vector().to_vec()).collect(),
            labels: rows.iter().map(|r| r.label).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn width(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }
}

/// Trained classifier for one symbol, tagged with the feature list it expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub symbol: String,
    pub feature_names: Vec<String>,
    pub trained_rows: usize,
    pub trained_through: NaiveDate,
    pub forest: RandomForest,
}

impl Model {
    pub fn train(symbol: &str, rows: &[LabeledRow], config: &ForestConfig) -> Result<Self, PipelineError> {
        let last = rows.iter().map(LabeledRow::date).max().ok_or_else(|| {
            PipelineError::InsufficientHistory {
                symbol: symbol.to_string(),
                rows: 0,
                minimum: 1,
            }
        })?;
        let forest = RandomForest::fit(&Dataset::from_labeled(rows), config);
        Ok(Self {
            symbol: symbol.to_string(),
            feature_names: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            trained_rows: rows.len(),
            trained_through: last,
            forest,
        })
    }

    pub fn predict(&self, row: &FeatureRow) -> u8 {
        self.forest.predict(&row.feature_vector())
    }

    pub fn predict_proba(&self, row: &FeatureRow) -> f64 {
        self.forest.predict_proba(&row.feature_vector())
    }

    pub fn to_json(&self) -> Result<Vec<u8>, PipelineError> {
        serde_json::to_vec(self).map_err(|e| PipelineError::data_shape(&self.symbol, e.to_string()))
    }

    /// Decodes a stored model and checks it belongs to `symbol` and was
    /// trained on the current feature columns, in order.
    pub fn from_json(symbol: &str, bytes: &[u8]) -> Result<Self, PipelineError> {
        let model: Model = serde_json::from_slice(bytes)
            .map_err(|e| PipelineError::data_shape(symbol, format!("unreadable model: {e}")))?;

        if model.symbol != symbol {
            return Err(PipelineError::data_shape(
                symbol,
                format!("stored model was trained for {}", model.symbol),
            ));
        }

        if model.feature_names.iter().map(String::as_str).ne(FEATURE_COLUMNS.iter().copied()) {
            return Err(PipelineError::data_shape(
                symbol,
                format!(
                    "model expects features [{}], pipeline produces [{}]",
                    model.feature_names.join(", "),
                    FEATURE_COLUMNS.join(", ")
                ),
            ));
        }
        if model.forest.n_trees() > 0 && model.forest.n_features() != FEATURE_COLUMNS.len() {
            return Err(PipelineError::data_shape(symbol, "model width does not match feature columns"));
        }
        model
            .forest
            .validate()
            .map_err(|e| PipelineError::data_shape(symbol, e))?;
        Ok(model)
    }
}
