//! Experiment reporting
//!
//! Reporting is best-effort. A reporter that cannot be set up is replaced by
//! [`NoopReporter`], and a failure to forward one candidate is logged and
//! swallowed, so tracking never aborts a training run.

mod mlflow;

pub use mlflow::MlflowReporter;

use crate::config::{TrackingConfig, TrainingMode};
use crate::training::CandidateResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Dataset sizes attached to every reported candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSummary {
    pub features: usize,
    pub training_samples: usize,
    pub test_samples: usize,
}

/// Sink for per-candidate parameters and metrics
#[async_trait]
pub trait ExperimentReporter: Send + Sync {
    /// Forward one candidate's parameters and metrics under `run_label`
    async fn report(&self, run_label: &str, result: &CandidateResult, split: &SplitSummary);

    /// Whether results actually leave the process
    fn is_enabled(&self) -> bool;
}

/// Reporter that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

#[async_trait]
impl ExperimentReporter for NoopReporter {
    async fn report(&self, _run_label: &str, _result: &CandidateResult, _split: &SplitSummary) {}

    fn is_enabled(&self) -> bool {
        false
    }
}

/// `RandomForestExperiment_{mode}_{YYYYmmdd_HHMMSS}`
pub fn experiment_name(mode: TrainingMode, at: DateTime<Utc>) -> String {
    format!("RandomForestExperiment_{}_{}", mode.as_str(), at.format("%Y%m%d_%H%M%S"))
}

/// Connect to the tracking service when the mode allows it and it is configured,
/// otherwise return a [`NoopReporter`]
pub async fn connect_reporter(
    mode: TrainingMode,
    tracking: &TrackingConfig,
    experiment: &str,
) -> Box<dyn ExperimentReporter> {
    if !mode.tracking_allowed() {
        info!(mode = %mode, "Experiment tracking disabled for this mode");
        return Box::new(NoopReporter);
    }
    if !tracking.is_configured() {
        info!("Tracking URI or credentials not set, experiment tracking disabled");
        return Box::new(NoopReporter);
    }

    match MlflowReporter::connect(tracking, experiment).await {
        Ok(reporter) => {
            info!(experiment = %experiment, "Experiment tracking enabled");
            Box::new(reporter)
        }
        Err(e) => {
            warn!(error = %e, "Tracking setup failed, continuing without experiment tracking");
            Box::new(NoopReporter)
        }
    }
}
