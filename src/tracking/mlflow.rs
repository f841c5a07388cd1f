//! MLflow REST client
//!
//! Talks to the `/api/2.0/mlflow` endpoints with HTTP basic auth. One MLflow
//! run is created per candidate, carrying its hyperparameters as params and
//! its accuracy and dataset sizes as metrics. When the run's artifact root is
//! served by the tracking server (`mlflow-artifacts:`), the fitted model is
//! uploaded as `model/model.json`.

use super::{ExperimentReporter, SplitSummary};
use crate::config::TrackingConfig;
use crate::error::{PipelineError, Result};
use crate::training::CandidateResult;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const PROXIED_ARTIFACT_SCHEME: &str = "mlflow-artifacts:";

/// Path of the model blob inside a run's artifact root
pub const MODEL_ARTIFACT_PATH: &str = "model/model.json";

/// Reporter backed by an MLflow tracking server
#[derive(Debug, Clone)]
pub struct MlflowReporter {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    experiment_id: String,
}

#[derive(Deserialize)]
struct GetExperimentResponse {
    experiment: ExperimentInfo,
}

#[derive(Deserialize)]
struct ExperimentInfo {
    experiment_id: String,
}

#[derive(Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Serialize)]
struct CreateRunRequest<'a> {
    experiment_id: &'a str,
    run_name: &'a str,
    start_time: i64,
    tags: Vec<KeyValue>,
}

#[derive(Deserialize)]
struct CreateRunResponse {
    run: RunBody,
}

#[derive(Deserialize)]
struct RunBody {
    info: RunInfo,
}

#[derive(Deserialize)]
struct RunInfo {
    run_id: String,
    #[serde(default)]
    artifact_uri: Option<String>,
}

#[derive(Serialize)]
struct KeyValue {
    key: String,
    value: String,
}

#[derive(Serialize)]
struct Metric {
    key: String,
    value: f64,
    timestamp: i64,
    step: i64,
}

#[derive(Serialize)]
struct LogBatchRequest<'a> {
    run_id: &'a str,
    metrics: Vec<Metric>,
    params: Vec<KeyValue>,
}

#[derive(Serialize)]
struct UpdateRunRequest<'a> {
    run_id: &'a str,
    status: &'a str,
    end_time: i64,
}

impl MlflowReporter {
    /// Resolve (or create) `experiment` on the configured server
    pub async fn connect(tracking: &TrackingConfig, experiment: &str) -> Result<Self> {
        let (base_url, (username, password)) = match (tracking.uri.as_deref(), tracking.credentials()) {
            (Some(uri), Some(creds)) => (uri, creds),
            _ => return Err(PipelineError::Reporting("tracking URI or credentials missing".to_string())),
        };

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PipelineError::Reporting(format!("failed to build HTTP client: {}", e)))?;

        let mut reporter = Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            experiment_id: String::new(),
        };
        reporter.experiment_id = reporter.ensure_experiment(experiment).await?;
        debug!(experiment = %experiment, experiment_id = %reporter.experiment_id, "MLflow experiment ready");
        Ok(reporter)
    }

    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/2.0/mlflow/{}", self.base_url, path)
    }

    async fn ensure_experiment(&self, name: &str) -> Result<String> {
        let response = self
            .client
            .get(self.endpoint("experiments/get-by-name"))
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("experiment_name", name)])
            .send()
            .await
            .map_err(reporting)?;

        if response.status().is_success() {
            let body: GetExperimentResponse = response.json().await.map_err(reporting)?;
            return Ok(body.experiment.experiment_id);
        }
        if response.status() != StatusCode::NOT_FOUND {
            return Err(status_error("experiments/get-by-name", response).await);
        }

        let created: CreateExperimentResponse = self
            .post("experiments/create", &serde_json::json!({ "name": name }))
            .await?
            .json()
            .await
            .map_err(reporting)?;
        Ok(created.experiment_id)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.endpoint(path))
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await
            .map_err(reporting)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(status_error(path, response).await)
        }
    }

    /// Create a run for the candidate, log everything, mark it finished
    pub async fn log_candidate(&self, run_label: &str, result: &CandidateResult, split: &SplitSummary) -> Result<String> {
        let now = chrono::Utc::now().timestamp_millis();

        let run: CreateRunResponse = self
            .post(
                "runs/create",
                &CreateRunRequest {
                    experiment_id: &self.experiment_id,
                    run_name: &result.config.name,
                    start_time: now,
                    tags: vec![KeyValue {
                        key: "run_label".to_string(),
                        value: run_label.to_string(),
                    }],
                },
            )
            .await?
            .json()
            .await
            .map_err(reporting)?;
        let RunInfo { run_id, artifact_uri } = run.run.info;

        let params = result
            .config
            .params
            .as_pairs()
            .into_iter()
            .map(|(key, value)| KeyValue { key: key.to_string(), value })
            .collect();

        let metric = |key: &str, value: f64| Metric {
            key: key.to_string(),
            value,
            timestamp: now,
            step: 0,
        };
        let metrics = vec![
            metric("accuracy", result.accuracy),
            metric("n_features", split.features as f64),
            metric("training_samples", split.training_samples as f64),
            metric("test_samples", split.test_samples as f64),
        ];

        self.post("runs/log-batch", &LogBatchRequest { run_id: &run_id, metrics, params })
            .await?;

        match artifact_uri.as_deref() {
            Some(uri) if uri.starts_with(PROXIED_ARTIFACT_SCHEME) => {
                if let Err(e) = self.upload_model(uri, result).await {
                    warn!(candidate = %result.config.name, error = %e, "Model artifact upload failed");
                }
            }
            other => debug!(artifact_uri = ?other, "Artifact root not served by the tracking server, skipping model upload"),
        }

        self.post(
            "runs/update",
            &UpdateRunRequest {
                run_id: &run_id,
                status: "FINISHED",
                end_time: chrono::Utc::now().timestamp_millis(),
            },
        )
        .await?;

        Ok(run_id)
    }
}

impl MlflowReporter {
    /// PUT the serialized model under the run's proxied artifact root
    async fn upload_model(&self, artifact_uri: &str, result: &CandidateResult) -> Result<()> {
        let root = artifact_uri
            .trim_start_matches(PROXIED_ARTIFACT_SCHEME)
            .trim_matches('/');
        let url = format!(
            "{}/api/2.0/mlflow-artifacts/artifacts/{}/{}",
            self.base_url, root, MODEL_ARTIFACT_PATH
        );
        let body = result.model.to_json_bytes()?;

        let response = self
            .client
            .put(url)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(reporting)?;

        if response.status().is_success() {
            debug!(candidate = %result.config.name, path = MODEL_ARTIFACT_PATH, "Model artifact uploaded");
            Ok(())
        } else {
            Err(status_error("mlflow-artifacts", response).await)
        }
    }
}

fn reporting(err: reqwest::Error) -> PipelineError {
    PipelineError::Reporting(err.to_string())
}

async fn status_error(path: &str, response: reqwest::Response) -> PipelineError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    PipelineError::Reporting(format!("{} returned {}: {}", path, status, body))
}

#[async_trait]
impl ExperimentReporter for MlflowReporter {
    async fn report(&self, run_label: &str, result: &CandidateResult, split: &SplitSummary) {
        match self.log_candidate(run_label, result, split).await {
            Ok(run_id) => debug!(candidate = %result.config.name, run_id = %run_id, "Candidate logged to MLflow"),
            Err(e) => warn!(candidate = %result.config.name, error = %e, "Failed to log candidate, continuing"),
        }
    }

    fn is_enabled(&self) -> bool {
        true
    }
}
