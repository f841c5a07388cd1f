//! Model selection and publication
//!
//! - [`CandidateTrainer`] fits one forest per [`CandidateConfig`] on a shared split
//! - [`select`] picks the most accurate candidate, earliest on ties
//! - [`ArtifactPublisher`] persists every candidate, the winner and its metadata

mod candidate;
mod metadata;
mod publisher;
mod selector;
mod trainer;

pub use candidate::{CandidateConfig, Hyperparameters};
pub use metadata::{CandidateSummary, ModelMetadata, Provenance};
pub use publisher::{read_metadata, ArtifactPublisher, PublishedArtifacts, BEST_MODEL_FILE, METADATA_FILE};
pub use selector::{select, SelectionOutcome};
pub use trainer::{CandidateResult, CandidateTrainer, TrainTestSplit};
