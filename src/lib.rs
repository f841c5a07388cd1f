//! digitforge - Random-forest model selection and serving
//!
//! Trains several random-forest candidates on one shared held-out split,
//! publishes the most accurate one together with a metadata document, and
//! serves it over HTTP.
//!
//! # Modules
//!
//! ## Training
//! - [`data`] - Dataset loading (CSV via polars) and the bundled digits dataset
//! - [`model`] - Classifier capability and the random-forest model family
//! - [`training`] - Candidate training, selection and artifact publication
//! - [`tracking`] - Best-effort experiment reporting (MLflow)
//! - [`pipeline`] - End-to-end training run
//!
//! ## Services
//! - [`server`] - Inference service (health, model info, prediction)
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use digitforge::prelude::*;
//!
//! # async fn run() -> digitforge::error::Result<()> {
//! let config = PipelineConfig::default().with_mode(TrainingMode::Safe);
//! let report = digitforge::pipeline::run(&config).await?;
//! println!("best: {} ({:.4})", report.outcome.winner().config.name, report.outcome.winner().accuracy);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod config;

pub mod data;
pub mod model;
pub mod training;
pub mod tracking;
pub mod pipeline;

pub mod server;
pub mod cli;

pub use error::{PipelineError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{PipelineConfig, TrackingConfig, TrainingMode};
    pub use crate::data::{Dataset, DatasetProvider, DatasetSource};
    pub use crate::error::{PipelineError, Result};
    pub use crate::model::{Classifier, RandomForestClassifier};
    pub use crate::pipeline::TrainingReport;
    pub use crate::tracking::{ExperimentReporter, NoopReporter};
    pub use crate::training::{
        select, ArtifactPublisher, CandidateConfig, CandidateResult, CandidateTrainer, Hyperparameters,
        ModelMetadata, SelectionOutcome,
    };
}
