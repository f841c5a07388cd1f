//! Artifact publisher
//!
//! Layout of the artifact directory after a run:
//!
//! ```text
//! models/
//!   model_estimators_{n}_depth_{d}.json   one per candidate
//!   best_model.json                       winner
//!   model_metadata.json                   ModelMetadata, pretty-printed
//! ```
//!
//! Every file is written to a temporary file in the same directory and then
//! renamed over the destination, so readers see either the old or the new
//! content, never a partial write.

use super::metadata::{ModelMetadata, Provenance};
use super::selector::SelectionOutcome;
use crate::error::{PipelineError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Well-known name of the winner blob
pub const BEST_MODEL_FILE: &str = "best_model.json";

/// Well-known name of the metadata document
pub const METADATA_FILE: &str = "model_metadata.json";

/// Writes candidate blobs, the winner blob and the metadata document
#[derive(Debug, Clone)]
pub struct ArtifactPublisher {
    dir: PathBuf,
}

/// Paths written by [`ArtifactPublisher::publish`]
#[derive(Debug, Clone)]
pub struct PublishedArtifacts {
    pub candidates: Vec<PathBuf>,
    pub best_model: PathBuf,
    pub metadata: PathBuf,
}

impl ArtifactPublisher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn best_model_path(&self) -> PathBuf {
        self.dir.join(BEST_MODEL_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Persist every candidate, the winner and its metadata
    pub fn publish(&self, outcome: &SelectionOutcome, provenance: &Provenance) -> Result<PublishedArtifacts> {
        std::fs::create_dir_all(&self.dir).map_err(|e| PipelineError::publish(&self.dir, e))?;

        let mut candidates = Vec::with_capacity(outcome.results().len());
        for result in outcome.results() {
            let path = self.dir.join(result.config.params.artifact_name());
            self.write_atomic(&path, &result.model.to_json_bytes()?)?;
            debug!(candidate = %result.config.name, path = %path.display(), "Candidate model saved");
            candidates.push(path);
        }

        let winner = outcome.winner();
        let best_model = self.best_model_path();
        self.write_atomic(&best_model, &winner.model.to_json_bytes()?)?;

        let metadata = ModelMetadata::from_outcome(outcome, provenance);
        let metadata_path = self.write_metadata(&metadata)?;

        info!(
            dir = %self.dir.display(),
            winner = %winner.config.name,
            accuracy = winner.accuracy,
            candidates = candidates.len(),
            "Artifacts published"
        );

        Ok(PublishedArtifacts {
            candidates,
            best_model,
            metadata: metadata_path,
        })
    }

    /// Write only the metadata document
    pub fn write_metadata(&self, metadata: &ModelMetadata) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| PipelineError::publish(&self.dir, e))?;
        let path = self.metadata_path();
        let bytes = serde_json::to_vec_pretty(metadata)?;
        self.write_atomic(&path, &bytes)?;
        Ok(path)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| PipelineError::publish(path, e))?;
        tmp.write_all(bytes).map_err(|e| PipelineError::publish(path, e))?;
        tmp.as_file().sync_all().map_err(|e| PipelineError::publish(path, e))?;
        tmp.persist(path).map_err(|e| PipelineError::publish(path, e.error))?;
        Ok(())
    }
}

/// Read a metadata document written by the publisher
pub fn read_metadata(path: impl AsRef<Path>) -> Result<ModelMetadata> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{select, CandidateConfig, CandidateTrainer, Hyperparameters};
    use chrono::Utc;
    use ndarray::{Array1, Array2};

    fn outcome() -> (SelectionOutcome, Provenance) {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| (i % 3) as f64 * 4.0 + j as f64);
        let y = Array1::from_shape_fn(30, |i| i % 3);
        let configs = vec![
            CandidateConfig::new("Model_1", Hyperparameters::new(3, Some(2), 42)),
            CandidateConfig::new("Model_2", Hyperparameters::new(4, None, 42)),
        ];
        let (split, results) = CandidateTrainer::default().train(&x, &y, &configs).unwrap();
        let provenance = Provenance {
            dataset: "builtin:digits".to_string(),
            features: split.n_features(),
            training_samples: split.n_train(),
            test_samples: split.n_test(),
            training_mode: "safe".to_string(),
            tracking_enabled: false,
            timestamp: Utc::now(),
        };
        (select(results).unwrap(), provenance)
    }

    #[test]
    fn test_publish_layout() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = ArtifactPublisher::new(dir.path().join("models"));
        let (outcome, provenance) = outcome();

        let written = publisher.publish(&outcome, &provenance).unwrap();
        assert!(written.best_model.is_file());
        assert!(dir.path().join("models/model_estimators_3_depth_2.json").is_file());
        assert!(dir.path().join("models/model_estimators_4_depth_none.json").is_file());

        let metadata = read_metadata(&written.metadata).unwrap();
        assert_eq!(metadata.accuracy, outcome.winner().accuracy);
        assert_eq!(metadata.parameters, outcome.winner().config.params);
        assert_eq!(metadata.features, 2);
        assert_eq!(metadata.training_samples, 24);
        assert_eq!(metadata.test_samples, 6);
        assert_eq!(metadata.candidates.len(), 2);

        // no temporary files left behind
        let entries = std::fs::read_dir(publisher.dir()).unwrap().count();
        assert_eq!(entries, 4);
    }

    #[test]
    fn test_republish_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = ArtifactPublisher::new(dir.path());
        let (outcome, provenance) = outcome();

        publisher.publish(&outcome, &provenance).unwrap();
        let mut second = provenance.clone();
        second.training_mode = "fast".to_string();
        publisher.publish(&outcome, &second).unwrap();

        let metadata = read_metadata(publisher.metadata_path()).unwrap();
        assert_eq!(metadata.training_mode, "fast");
    }

    #[test]
    fn test_unwritable_destination_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"x").unwrap();

        let (outcome, provenance) = outcome();
        let err = ArtifactPublisher::new(&blocker).publish(&outcome, &provenance).unwrap_err();
        assert!(matches!(err, PipelineError::PublishFailure { .. }));
    }
}
