//! Pipeline configuration
//!
//! Values come from the environment first and can be overridden by CLI flags.

use crate::error::PipelineError;
use crate::training::{CandidateConfig, Hyperparameters};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

/// Seed used both for the train/test split and for every forest
pub const DEFAULT_SEED: u64 = 42;

/// Fraction of rows held out for scoring
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Row cap applied in fast mode
pub const FAST_MODE_SAMPLES: usize = 500;

/// Training mode selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TrainingMode {
    /// Full dataset, standard candidates, tracking when configured
    Notebook,
    /// Reduced dataset and smaller candidates, tracking when configured
    Fast,
    /// Full dataset, standard candidates, never touches the tracking service
    Safe,
}

impl TrainingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingMode::Notebook => "notebook",
            TrainingMode::Fast => "fast",
            TrainingMode::Safe => "safe",
        }
    }

    /// Maximum number of dataset rows used in this mode
    pub fn sample_limit(&self) -> Option<usize> {
        match self {
            TrainingMode::Fast => Some(FAST_MODE_SAMPLES),
            TrainingMode::Notebook | TrainingMode::Safe => None,
        }
    }

    /// Whether this mode may forward results to the tracking service
    pub fn tracking_allowed(&self) -> bool {
        !matches!(self, TrainingMode::Safe)
    }

    /// Candidate configurations trained in this mode, in evaluation order
    pub fn candidates(&self, random_state: u64) -> Vec<CandidateConfig> {
        let grid: &[(&str, usize, usize)] = match self {
            TrainingMode::Fast => &[("FastModel_10_3", 10, 3), ("FastModel_20_5", 20, 5)],
            TrainingMode::Notebook | TrainingMode::Safe => {
                &[("Model_1", 20, 5), ("Model_2", 100, 10)]
            }
        };

        grid.iter()
            .map(|&(name, n_estimators, max_depth)| {
                CandidateConfig::new(
                    name,
                    Hyperparameters::new(n_estimators, Some(max_depth), random_state),
                )
            })
            .collect()
    }
}

impl fmt::Display for TrainingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrainingMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "notebook" => Ok(TrainingMode::Notebook),
            "fast" => Ok(TrainingMode::Fast),
            "safe" => Ok(TrainingMode::Safe),
            other => Err(PipelineError::InvalidParameter {
                name: "training_mode".to_string(),
                value: other.to_string(),
                reason: "expected one of notebook, fast, safe".to_string(),
            }),
        }
    }
}

/// Connection settings for the external tracking service
#[derive(Debug, Clone, Default)]
pub struct TrackingConfig {
    pub uri: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl TrackingConfig {
    /// Read tracking settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build tracking settings from a variable lookup.
    ///
    /// `MLFLOW_TRACKING_URI` wins; otherwise `DAGSHUB_REPO_OWNER` and
    /// `DAGSHUB_REPO_NAME` derive the repository's hosted MLflow endpoint.
    /// `DAGSHUB_TOKEN` fills both credentials.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let dagshub_uri = match (non_empty("DAGSHUB_REPO_OWNER"), non_empty("DAGSHUB_REPO_NAME")) {
            (Some(owner), Some(repo)) => Some(dagshub_tracking_uri(owner.trim(), repo.trim())),
            _ => None,
        };
        let token = non_empty("DAGSHUB_TOKEN");
        Self {
            uri: non_empty("MLFLOW_TRACKING_URI").or(dagshub_uri),
            username: token.clone().or_else(|| non_empty("MLFLOW_TRACKING_USERNAME")),
            password: token.or_else(|| non_empty("MLFLOW_TRACKING_PASSWORD")),
        }
    }

    /// Username/password pair, only when both are present
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }

    /// A URI and a full credential pair are both required
    pub fn is_configured(&self) -> bool {
        self.uri.is_some() && self.credentials().is_some()
    }
}

/// MLflow endpoint hosted by DagsHub for `owner/repo`
pub fn dagshub_tracking_uri(owner: &str, repo: &str) -> String {
    format!("https://dagshub.com/{}/{}.mlflow", owner, repo)
}

/// Interpret a `TRAINING_MODE` value; unset or unknown values mean safe mode
pub fn mode_from_setting(value: Option<&str>) -> TrainingMode {
    match value.map(str::parse::<TrainingMode>) {
        None => TrainingMode::Safe,
        Some(Ok(mode)) => mode,
        Some(Err(e)) => {
            warn!(error = %e, "Invalid TRAINING_MODE, using safe mode");
            TrainingMode::Safe
        }
    }
}

/// Settings for one training run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mode: TrainingMode,
    pub data_path: PathBuf,
    pub target_column: String,
    pub models_dir: PathBuf,
    pub test_fraction: f64,
    pub split_seed: u64,
    pub random_state: u64,
    pub tracking: TrackingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: mode_from_setting(std::env::var("TRAINING_MODE").ok().as_deref()),
            data_path: std::env::var("DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/raw_dataset.csv")),
            target_column: std::env::var("TARGET_COLUMN").unwrap_or_else(|_| "target".to_string()),
            models_dir: std::env::var("MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models")),
            test_fraction: DEFAULT_TEST_FRACTION,
            split_seed: DEFAULT_SEED,
            random_state: DEFAULT_SEED,
            tracking: TrackingConfig::from_env(),
        }
    }
}

impl PipelineConfig {
    /// Set the training mode
    pub fn with_mode(mut self, mode: TrainingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the CSV location checked before falling back to the bundled dataset
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Set the artifact directory
    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = dir.into();
        self
    }

    /// Replace the tracking settings
    pub fn with_tracking(mut self, tracking: TrackingConfig) -> Self {
        self.tracking = tracking;
        self
    }

    /// Candidates for the configured mode
    pub fn candidates(&self) -> Vec<CandidateConfig> {
        self.mode.candidates(self.random_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("fast".parse::<TrainingMode>().unwrap(), TrainingMode::Fast);
        assert_eq!(" Notebook ".parse::<TrainingMode>().unwrap(), TrainingMode::Notebook);
        assert!("turbo".parse::<TrainingMode>().is_err());
    }

    #[test]
    fn test_safe_mode_candidates() {
        let configs = TrainingMode::Safe.candidates(DEFAULT_SEED);
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].name, "Model_1");
        assert_eq!(configs[0].params.n_estimators, 20);
        assert_eq!(configs[0].params.max_depth, Some(5));
        assert_eq!(configs[1].params.n_estimators, 100);
        assert_eq!(configs[1].params.max_depth, Some(10));
        assert!(configs.iter().all(|c| c.params.random_state == 42));
    }

    #[test]
    fn test_fast_mode_limits() {
        assert_eq!(TrainingMode::Fast.sample_limit(), Some(500));
        assert_eq!(TrainingMode::Safe.sample_limit(), None);
        let names: Vec<String> = TrainingMode::Fast
            .candidates(7)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["FastModel_10_3", "FastModel_20_5"]);
    }

    #[test]
    fn test_safe_mode_never_tracks() {
        assert!(!TrainingMode::Safe.tracking_allowed());
        assert!(TrainingMode::Fast.tracking_allowed());
        assert!(TrainingMode::Notebook.tracking_allowed());
    }

    #[test]
    fn test_tracking_requires_uri_and_credentials() {
        let mut tracking = TrackingConfig {
            uri: Some("https://tracking.example".to_string()),
            username: Some("user".to_string()),
            password: None,
        };
        assert!(!tracking.is_configured());

        tracking.password = Some("secret".to_string());
        assert!(tracking.is_configured());
        assert_eq!(tracking.credentials(), Some(("user", "secret")));

        tracking.uri = None;
        assert!(!tracking.is_configured());
    }

    #[test]
    fn test_invalid_mode_setting_falls_back_to_safe() {
        assert_eq!(mode_from_setting(None), TrainingMode::Safe);
        assert_eq!(mode_from_setting(Some("fast")), TrainingMode::Fast);
        assert_eq!(mode_from_setting(Some("turbo")), TrainingMode::Safe);
    }

    fn lookup_from(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key: &str| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
    }

    #[test]
    fn test_dagshub_repo_derives_tracking_uri() {
        let tracking = TrackingConfig::from_lookup(lookup_from(&[
            ("DAGSHUB_REPO_OWNER", "alice"),
            ("DAGSHUB_REPO_NAME", "digits"),
            ("DAGSHUB_TOKEN", "tok"),
        ]));
        assert_eq!(tracking.uri.as_deref(), Some("https://dagshub.com/alice/digits.mlflow"));
        assert_eq!(tracking.credentials(), Some(("tok", "tok")));
        assert!(tracking.is_configured());
    }

    #[test]
    fn test_explicit_tracking_uri_wins() {
        let tracking = TrackingConfig::from_lookup(lookup_from(&[
            ("MLFLOW_TRACKING_URI", "https://mlflow.internal"),
            ("DAGSHUB_REPO_OWNER", "alice"),
            ("DAGSHUB_REPO_NAME", "digits"),
            ("MLFLOW_TRACKING_USERNAME", "user"),
            ("MLFLOW_TRACKING_PASSWORD", "pw"),
        ]));
        assert_eq!(tracking.uri.as_deref(), Some("https://mlflow.internal"));
        assert_eq!(tracking.credentials(), Some(("user", "pw")));
    }

    #[test]
    fn test_token_without_repo_or_uri_is_unconfigured() {
        let tracking = TrackingConfig::from_lookup(lookup_from(&[("DAGSHUB_TOKEN", "tok"), ("DAGSHUB_REPO_NAME", " ")]));
        assert_eq!(tracking.uri, None);
        assert!(!tracking.is_configured());
    }
}
