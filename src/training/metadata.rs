//! Published metadata document

use super::candidate::Hyperparameters;
use super::selector::SelectionOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Run context supplied by the caller of the publisher
#[derive(Debug, Clone)]
pub struct Provenance {
    /// CSV path or `builtin:digits`
    pub dataset: String,
    pub features: usize,
    pub training_samples: usize,
    pub test_samples: usize,
    pub training_mode: String,
    pub tracking_enabled: bool,
    pub timestamp: DateTime<Utc>,
}

/// Name and score of one evaluated candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub name: String,
    pub accuracy: f64,
    pub parameters: Hyperparameters,
}

/// Contents of `model_metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_type: String,
    pub accuracy: f64,
    pub parameters: Hyperparameters,
    pub features: usize,
    pub training_samples: usize,
    pub test_samples: usize,
    pub dataset: String,
    pub training_date: DateTime<Utc>,
    pub training_mode: String,
    pub tracking_enabled: bool,
    #[serde(default)]
    pub candidates: Vec<CandidateSummary>,
}

impl ModelMetadata {
    /// Describe the winner of `outcome`
    pub fn from_outcome(outcome: &SelectionOutcome, provenance: &Provenance) -> Self {
        let winner = outcome.winner();
        Self {
            model_type: crate::model::RandomForestClassifier::MODEL_TYPE.to_string(),
            accuracy: winner.accuracy,
            parameters: winner.config.params,
            features: provenance.features,
            training_samples: provenance.training_samples,
            test_samples: provenance.test_samples,
            dataset: provenance.dataset.clone(),
            training_date: provenance.timestamp,
            training_mode: provenance.training_mode.clone(),
            tracking_enabled: provenance.tracking_enabled,
            candidates: outcome
                .results()
                .iter()
                .map(|r| CandidateSummary {
                    name: r.config.name.clone(),
                    accuracy: r.accuracy,
                    parameters: r.config.params,
                })
                .collect(),
        }
    }
}
