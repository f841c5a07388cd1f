//! Candidate configurations

use crate::model::RandomForestClassifier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hyperparameters of one forest candidate.
///
/// Serialized as a flat map, which is also the `parameters` object of the
/// published metadata document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub random_state: u64,
}

impl Hyperparameters {
    pub fn new(n_estimators: usize, max_depth: Option<usize>, random_state: u64) -> Self {
        Self { n_estimators, max_depth, random_state }
    }

    /// Deterministic blob name, e.g. `model_estimators_20_depth_5.json`
    pub fn artifact_name(&self) -> String {
        match self.max_depth {
            Some(depth) => format!("model_estimators_{}_depth_{}.json", self.n_estimators, depth),
            None => format!("model_estimators_{}_depth_none.json", self.n_estimators),
        }
    }

    /// Unfitted forest carrying these hyperparameters
    pub fn build_model(&self) -> RandomForestClassifier {
        RandomForestClassifier::new(self.n_estimators)
            .with_max_depth(self.max_depth)
            .with_random_state(self.random_state)
    }

    /// `(name, value)` pairs in a stable order, for tracking backends
    pub fn as_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("n_estimators", self.n_estimators.to_string()),
            (
                "max_depth",
                self.max_depth.map_or_else(|| "None".to_string(), |d| d.to_string()),
            ),
            ("random_state", self.random_state.to_string()),
        ]
    }
}

/// A named, immutable hyperparameter set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateConfig {
    pub name: String,
    pub params: Hyperparameters,
}

impl CandidateConfig {
    pub fn new(name: impl Into<String>, params: Hyperparameters) -> Self {
        Self { name: name.into(), params }
    }
}

impl fmt::Display for CandidateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depth = self.params.max_depth.map_or_else(|| "none".to_string(), |d| d.to_string());
        write!(
            f,
            "{} (n_estimators={}, max_depth={})",
            self.name, self.params.n_estimators, depth
        )
    }
}
