//! End-to-end training run
//!
//! Dataset Provider → Candidate Trainer → Model Selector → Artifact Publisher,
//! with the experiment reporter fed after every candidate.

use crate::config::{PipelineConfig, DEFAULT_SEED, DEFAULT_TEST_FRACTION, FAST_MODE_SAMPLES};
use crate::data::{Dataset, DatasetProvider};
use crate::error::{PipelineError, Result};
use crate::model::{Classifier, RandomForestClassifier};
use crate::tracking::{connect_reporter, experiment_name, ExperimentReporter, SplitSummary};
use crate::training::{
    read_metadata, select, ArtifactPublisher, CandidateConfig, CandidateResult, CandidateTrainer,
    Hyperparameters, ModelMetadata, Provenance, PublishedArtifacts, SelectionOutcome, TrainTestSplit,
};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Mode label written by [`regenerate_metadata`]
pub const REGENERATED_MODE: &str = "regenerated";

/// Everything a finished run produced
#[derive(Debug)]
pub struct TrainingReport {
    pub outcome: SelectionOutcome,
    pub metadata: ModelMetadata,
    pub artifacts: PublishedArtifacts,
    pub experiment: String,
    pub elapsed_secs: f64,
}

/// Run the full pipeline, connecting to the tracking service when possible
pub async fn run(config: &PipelineConfig) -> Result<TrainingReport> {
    let experiment = experiment_name(config.mode, Utc::now());
    let reporter = connect_reporter(config.mode, &config.tracking, &experiment).await;
    run_with_reporter(config, reporter.as_ref(), &experiment).await
}

/// Run the full pipeline against an explicit reporter
pub async fn run_with_reporter(
    config: &PipelineConfig,
    reporter: &dyn ExperimentReporter,
    run_label: &str,
) -> Result<TrainingReport> {
    let start = Instant::now();
    info!(mode = %config.mode, run_label = %run_label, "Starting training run");

    let dataset = load_for_mode(config)?;
    let trainer = CandidateTrainer::new(config.test_fraction, config.split_seed);
    let split = Arc::new(trainer.split(&dataset.features, &dataset.labels)?);
    let summary = SplitSummary {
        features: split.n_features(),
        training_samples: split.n_train(),
        test_samples: split.n_test(),
    };

    let configs = config.candidates();
    let mut results = Vec::with_capacity(configs.len());
    for candidate in configs {
        let result = fit_blocking(&trainer, candidate, Arc::clone(&split)).await?;
        reporter.report(run_label, &result, &summary).await;
        results.push(result);
    }

    let outcome = select(results)?;
    let provenance = Provenance {
        dataset: dataset.source.to_string(),
        features: summary.features,
        training_samples: summary.training_samples,
        test_samples: summary.test_samples,
        training_mode: config.mode.as_str().to_string(),
        tracking_enabled: reporter.is_enabled(),
        timestamp: Utc::now(),
    };

    let publisher = ArtifactPublisher::new(&config.models_dir);
    let artifacts = publisher.publish(&outcome, &provenance)?;
    let metadata = ModelMetadata::from_outcome(&outcome, &provenance);

    let elapsed_secs = start.elapsed().as_secs_f64();
    info!(
        winner = %outcome.winner().config.name,
        accuracy = outcome.winner().accuracy,
        elapsed_secs,
        "Training run complete"
    );

    Ok(TrainingReport {
        outcome,
        metadata,
        artifacts,
        experiment: run_label.to_string(),
        elapsed_secs,
    })
}

fn load_for_mode(config: &PipelineConfig) -> Result<Dataset> {
    let dataset = DatasetProvider::new(&config.data_path, &config.target_column).load()?;
    Ok(match config.mode.sample_limit() {
        Some(limit) => {
            info!(limit, available = dataset.n_samples(), "Reducing dataset for fast mode");
            dataset.truncate(limit)
        }
        None => dataset,
    })
}

/// Forest fitting is CPU-bound, keep it off the async workers
async fn fit_blocking(
    trainer: &CandidateTrainer,
    candidate: CandidateConfig,
    split: Arc<TrainTestSplit>,
) -> Result<CandidateResult> {
    let trainer = trainer.clone();
    let name = candidate.name.clone();
    tokio::task::spawn_blocking(move || trainer.fit_candidate(&candidate, &split))
        .await
        .map_err(|e| PipelineError::TrainingFailure {
            candidate: name,
            reason: e.to_string(),
        })?
}

/// Rewrite `model_metadata.json` for an existing `best_model.json`.
///
/// The model is re-scored on the same deterministic held-out split used for
/// training. Rows are capped like fast mode when the previous metadata says
/// the model was trained that way.
pub fn regenerate_metadata(models_dir: &Path, data_path: &Path, target_column: &str) -> Result<ModelMetadata> {
    let publisher = ArtifactPublisher::new(models_dir);
    let model = RandomForestClassifier::load(publisher.best_model_path())?;

    let previous = match read_metadata(publisher.metadata_path()) {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            warn!(error = %e, "No readable previous metadata, using full dataset");
            None
        }
    };

    let mut dataset = DatasetProvider::new(data_path, target_column).load()?;
    if previous.as_ref().map(|m| m.training_mode.as_str()) == Some("fast") {
        dataset = dataset.truncate(FAST_MODE_SAMPLES);
    }
    if dataset.n_features() != model.n_features() {
        return Err(PipelineError::ShapeMismatch {
            expected: format!("{} features", model.n_features()),
            actual: format!("{} features", dataset.n_features()),
        });
    }

    let split = TrainTestSplit::new(&dataset.features, &dataset.labels, DEFAULT_TEST_FRACTION, DEFAULT_SEED)?;
    let accuracy = model.score(&split.x_test, &split.y_test)?;

    let metadata = ModelMetadata {
        model_type: model.model_type().to_string(),
        accuracy,
        parameters: Hyperparameters::new(
            model.n_estimators,
            model.max_depth,
            model.random_state.unwrap_or(DEFAULT_SEED),
        ),
        features: split.n_features(),
        training_samples: split.n_train(),
        test_samples: split.n_test(),
        dataset: dataset.source.to_string(),
        training_date: Utc::now(),
        training_mode: REGENERATED_MODE.to_string(),
        tracking_enabled: false,
        candidates: previous.map(|m| m.candidates).unwrap_or_default(),
    };

    let path = publisher.write_metadata(&metadata)?;
    info!(path = %path.display(), accuracy, "Metadata regenerated");
    Ok(metadata)
}
