//! digitforge CLI
//!
//! Command-line interface for training, serving and the helper workflows
//! around them.

use clap::{Parser, Subcommand};
use colored::*;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{PipelineConfig, TrainingMode};
use crate::data::digits;
use crate::pipeline;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn fail(s: &str) -> ColoredString   { s.truecolor(235, 100, 100) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_fail(msg: &str) {
    println!("  {} {}", fail("✗"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<16} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "digitforge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train, select and serve random-forest digit classifiers")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train every candidate for a mode, select the best and publish artifacts
    Train {
        /// Training mode
        #[arg(short, long, value_enum, env = "TRAINING_MODE")]
        mode: Option<TrainingMode>,

        /// CSV dataset, the bundled digits are used when it does not exist
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Artifact directory
        #[arg(long)]
        models_dir: Option<PathBuf>,
    },

    /// Start the inference service
    Serve {
        /// Server port
        #[arg(short, long, env = "API_PORT", default_value = "5000")]
        port: u16,

        /// Server host
        #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Artifact directory
        #[arg(long, env = "MODELS_DIR", default_value = "models")]
        models_dir: PathBuf,
    },

    /// Write the bundled digits dataset to CSV
    CreateData {
        /// Output file
        #[arg(short, long, default_value = "data/raw_dataset.csv")]
        output: PathBuf,
    },

    /// Rebuild model_metadata.json for an existing best model
    Metadata {
        /// Artifact directory
        #[arg(long, env = "MODELS_DIR", default_value = "models")]
        models_dir: PathBuf,

        /// CSV dataset, the bundled digits are used when it does not exist
        #[arg(short, long, env = "DATA_PATH", default_value = "data/raw_dataset.csv")]
        data: PathBuf,

        /// Label column, the last column is used when it is absent
        #[arg(long, env = "TARGET_COLUMN", default_value = "target")]
        target_column: String,
    },

    /// Smoke-test a running inference service
    Probe {
        /// Base URL of the service
        #[arg(short, long, default_value = "http://localhost:5000")]
        url: String,

        /// Health check attempts before giving up
        #[arg(long, default_value = "10")]
        retries: u32,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_train(
    mode: Option<TrainingMode>,
    data: Option<PathBuf>,
    models_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = PipelineConfig::default();
    if let Some(mode) = mode {
        config = config.with_mode(mode);
    }
    if let Some(data) = data {
        config = config.with_data_path(data);
    }
    if let Some(dir) = models_dir {
        config = config.with_models_dir(dir);
    }

    section(&format!("Train · {} mode", config.mode));
    kv("Data", &config.data_path.display().to_string());
    kv("Models", &config.models_dir.display().to_string());
    kv(
        "Candidates",
        &config.candidates().iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", "),
    );
    println!();

    let report = pipeline::run(&config).await?;
    let winner = report.outcome.winner_index();

    println!();
    println!("  {:<20} {:>8} {:>10}", muted("Candidate"), muted("Trees"), muted("Accuracy"));
    println!("  {}", dim(&"─".repeat(40)));
    for (idx, result) in report.outcome.results().iter().enumerate() {
        let marker = if idx == winner { ok("best") } else { dim("") };
        println!(
            "  {:<20} {:>8} {:>10.4} {}",
            result.config.name, result.config.params.n_estimators, result.accuracy, marker
        );
    }
    println!("  {}", dim(&"─".repeat(40)));

    println!();
    kv("Dataset", &report.metadata.dataset);
    kv("Train / test", &format!("{} / {}", report.metadata.training_samples, report.metadata.test_samples));
    kv("Tracking", if report.metadata.tracking_enabled { "enabled" } else { "disabled" });
    kv("Best model", &report.artifacts.best_model.display().to_string());
    kv("Metadata", &report.artifacts.metadata.display().to_string());
    kv("Time", &format!("{:.2}s", report.elapsed_secs));
    println!();
    Ok(())
}

pub async fn cmd_serve(host: &str, port: u16, models_dir: PathBuf) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    section("Inference service");
    kv("Health", &format!("http://{}:{}/health", host, port));
    kv("Model info", &format!("http://{}:{}/model_info", host, port));
    kv("Predict", &format!("POST http://{}:{}/predict", host, port));
    println!("  {}", dim("ctrl+c to stop"));
    println!();

    let config = ServerConfig {
        host: host.to_string(),
        port,
        models_dir,
    };
    run_server(config).await
}

pub fn cmd_create_data(output: &Path) -> anyhow::Result<()> {
    section("Create data");

    step_run("Loading bundled digits");
    let start = Instant::now();
    let dataset = digits::load_digits()?;
    step_done(&format!("{} samples × {} features in {:?}", dataset.n_samples(), dataset.n_features(), start.elapsed()));

    step_run(&format!("Saving → {}", output.display()));
    dataset.write_csv(output, "target")?;
    step_done("");

    println!();
    Ok(())
}

pub fn cmd_metadata(models_dir: &Path, data: &Path, target_column: &str) -> anyhow::Result<()> {
    section("Regenerate metadata");

    step_run("Re-scoring best model");
    let metadata = pipeline::regenerate_metadata(models_dir, data, target_column)?;
    step_done(&format!("accuracy {:.4}", metadata.accuracy));

    kv("Model", &metadata.model_type);
    kv("Dataset", &metadata.dataset);
    kv("Features", &metadata.features.to_string());
    println!();
    Ok(())
}

// ─── Probe ─────────────────────────────────────────────────────────────────────

async fn wait_for_health(client: &reqwest::Client, url: &str, retries: u32) -> anyhow::Result<Value> {
    let mut last_error = String::new();
    for attempt in 1..=retries.max(1) {
        match client.get(format!("{}/health", url)).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(resp.json().await?),
            Ok(resp) => last_error = format!("status {}", resp.status()),
            Err(e) => last_error = e.to_string(),
        }
        tracing::debug!(attempt, error = %last_error, "Service not ready");
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    anyhow::bail!("service at {} not healthy after {} attempts: {}", url, retries, last_error)
}

pub async fn cmd_probe(url: &str, retries: u32) -> anyhow::Result<()> {
    let url = url.trim_end_matches('/');
    let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
    let mut failures = 0usize;

    section(&format!("Probe · {}", url));

    let health = wait_for_health(&client, url, retries).await?;
    step_ok(&format!("/health {}", health));
    let loaded = health.get("model_loaded").and_then(Value::as_bool).unwrap_or(false);

    let info = client.get(format!("{}/model_info", url)).send().await?;
    let info_status = info.status();
    let info_body: Value = info.json().await?;
    if info_status.is_success() == loaded {
        step_ok(&format!("/model_info {} {}", info_status.as_u16(), dim(&info_body.to_string())));
    } else {
        step_fail(&format!("/model_info unexpected {} with model_loaded={}", info_status, loaded));
        failures += 1;
    }

    let sample: Vec<f64> = digits::load_digits()?.features.row(0).to_vec();
    let resp = client
        .post(format!("{}/predict", url))
        .json(&json!({ "features": sample }))
        .send()
        .await?;
    let status = resp.status();
    let body: Value = resp.json().await?;
    if loaded {
        let n_proba = body.get("probabilities").and_then(Value::as_array).map(Vec::len);
        let prediction = body.get("prediction").and_then(Value::as_u64);
        if status.is_success() && n_proba == Some(digits::N_CLASSES) && prediction.is_some() {
            step_ok(&format!("/predict → {}", prediction.unwrap_or_default()));
        } else {
            step_fail(&format!("/predict {} {}", status, body));
            failures += 1;
        }
    } else if status.as_u16() == 500 {
        step_ok("/predict → 500 without a model");
    } else {
        step_fail(&format!("/predict {} {}", status, body));
        failures += 1;
    }

    let resp = client
        .post(format!("{}/predict", url))
        .json(&json!({ "features": [1.0, 2.0, 3.0] }))
        .send()
        .await?;
    let expected = if loaded { 400 } else { 500 };
    if resp.status().as_u16() == expected {
        step_ok(&format!("/predict wrong length → {}", expected));
    } else {
        step_fail(&format!("/predict wrong length → {}, expected {}", resp.status(), expected));
        failures += 1;
    }

    println!();
    if failures > 0 {
        anyhow::bail!("{} probe check(s) failed", failures);
    }
    println!("  {}", ok("all checks passed"));
    println!();
    Ok(())
}
