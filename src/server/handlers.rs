//! Request handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::error::{Result, ServerError};
use super::state::AppState;

/// Value reported for hyperparameters the loaded model does not expose
pub const NOT_APPLICABLE: &str = "N/A";

/// Hyperparameters surfaced by `/model_info`
const INFO_HYPERPARAMETERS: [&str; 3] = ["n_estimators", "max_depth", "n_features"];

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub features: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: usize,
    pub probabilities: Vec<f64>,
    pub model_info: Map<String, Value>,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "model_loaded": state.is_loaded(),
    }))
}

/// Model family and hyperparameters, overlaid with the persisted metadata
pub async fn model_info(State(state): State<Arc<AppState>>) -> Result<Json<Map<String, Value>>> {
    let model = state.model().ok_or(ServerError::ModelUnavailable)?;

    let mut info = Map::new();
    info.insert("model_type".to_string(), json!(model.model_type()));
    for name in INFO_HYPERPARAMETERS {
        let value = model.hyperparameter(name).unwrap_or_else(|| json!(NOT_APPLICABLE));
        info.insert(name.to_string(), value);
    }
    for (key, value) in state.metadata() {
        info.insert(key.clone(), value.clone());
    }

    Ok(Json(info))
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let model = state.model().ok_or(ServerError::ModelUnavailable)?;
    let Json(request) = payload.map_err(|rejection| ServerError::InvalidInput(rejection.body_text()))?;

    if request.features.len() != model.n_features() {
        return Err(ServerError::InvalidInput(format!(
            "Expected {} features, got {}",
            model.n_features(),
            request.features.len()
        )));
    }

    let sample = ArrayView1::from(request.features.as_slice());
    let probabilities = model
        .predict_proba_one(sample)
        .map_err(|e| ServerError::InvalidInput(e.to_string()))?;
    let prediction = model
        .predict_one(sample)
        .map_err(|e| ServerError::InvalidInput(e.to_string()))?;

    Ok(Json(PredictResponse {
        prediction,
        probabilities: probabilities.to_vec(),
        model_info: state.metadata().clone(),
    }))
}
