//! Integration test: inference service endpoints

use axum::body::Body;
use axum::http::{Request, StatusCode};
use digitforge::data::digits;
use digitforge::error::Result as PipelineResult;
use digitforge::model::{argmax, Classifier, RandomForestClassifier};
use digitforge::server::{create_router, AppState};
use ndarray::{Array1, ArrayView1};
use serde_json::{json, Map, Value};
use std::sync::{Arc, OnceLock};
use tower::ServiceExt;

fn trained_model() -> &'static RandomForestClassifier {
    static MODEL: OnceLock<RandomForestClassifier> = OnceLock::new();
    MODEL.get_or_init(|| {
        let ds = digits::load_digits().unwrap().truncate(400);
        let mut model = RandomForestClassifier::new(15)
            .with_max_depth(Some(6))
            .with_random_state(42);
        model.fit(&ds.features, &ds.labels).unwrap();
        model
    })
}

fn metadata() -> Map<String, Value> {
    let value = json!({
        "model_type": "RandomForestClassifier",
        "accuracy": 0.91,
        "parameters": {"n_estimators": 15, "max_depth": 6, "random_state": 42},
        "training_mode": "safe",
        "max_depth": 99
    });
    value.as_object().unwrap().clone()
}

fn loaded_app() -> axum::Router {
    let model: Arc<dyn Classifier> = Arc::new(trained_model().clone());
    create_router(Arc::new(AppState::new(Some(model), metadata())))
}

fn degraded_app() -> axum::Router {
    create_router(Arc::new(AppState::degraded()))
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn first_sample() -> Vec<f64> {
    digits::load_digits().unwrap().features.row(0).to_vec()
}

#[tokio::test]
async fn test_health_reports_loaded_model() {
    let (status, body) = send(loaded_app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy", "model_loaded": true}));
}

#[tokio::test]
async fn test_health_in_degraded_mode() {
    let (status, body) = send(degraded_app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], false);
}

#[tokio::test]
async fn test_degraded_mode_rejects_model_requests() {
    let (status, body) = send(degraded_app(), get("/model_info")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Model not loaded");

    let features = serde_json::to_string(&json!({"features": first_sample()})).unwrap();
    for payload in [features.as_str(), r#"{"features": [1, 2]}"#, "not json"] {
        let (status, body) = send(degraded_app(), post_json("/predict", payload)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "payload {payload}");
        assert_eq!(body["error"], "Model not loaded");
    }
}

#[tokio::test]
async fn test_model_info_merges_metadata() {
    let (status, body) = send(loaded_app(), get("/model_info")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_type"], "RandomForestClassifier");
    assert_eq!(body["n_estimators"], 15);
    assert_eq!(body["n_features"], 64);
    assert_eq!(body["accuracy"], 0.91);
    // metadata wins on key collisions
    assert_eq!(body["max_depth"], 99);
}

#[derive(Debug)]
struct ConstantModel;

impl Classifier for ConstantModel {
    fn model_type(&self) -> &'static str {
        "ConstantModel"
    }

    fn n_features(&self) -> usize {
        2
    }

    fn classes(&self) -> &[usize] {
        &[0, 1]
    }

    fn predict_proba_one(&self, _sample: ArrayView1<'_, f64>) -> PipelineResult<Array1<f64>> {
        Ok(Array1::from_vec(vec![0.25, 0.75]))
    }
}

#[tokio::test]
async fn test_model_info_without_hyperparameters() {
    let app = create_router(Arc::new(AppState::new(Some(Arc::new(ConstantModel)), Map::new())));
    let (status, body) = send(app.clone(), get("/model_info")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_type"], "ConstantModel");
    assert_eq!(body["n_estimators"], "N/A");
    assert_eq!(body["max_depth"], "N/A");

    let (status, body) = send(app, post_json("/predict", r#"{"features": [0.0, 1.0]}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], 1);
    assert_eq!(body["model_info"], json!({}));
}

#[tokio::test]
async fn test_predict_first_digit() {
    let payload = serde_json::to_string(&json!({"features": first_sample()})).unwrap();
    let (status, body) = send(loaded_app(), post_json("/predict", &payload)).await;
    assert_eq!(status, StatusCode::OK);

    let probabilities: Vec<f64> = serde_json::from_value(body["probabilities"].clone()).unwrap();
    assert_eq!(probabilities.len(), 10);
    let total: f64 = probabilities.iter().sum();
    assert!((total - 1.0).abs() < 1e-6, "probabilities sum to {total}");

    let expected = argmax(ArrayView1::from(probabilities.as_slice()));
    assert_eq!(body["prediction"], json!(expected));
    assert_eq!(body["model_info"], Value::Object(metadata()));
}

#[tokio::test]
async fn test_predict_wrong_length_is_client_error() {
    let (status, body) = send(loaded_app(), post_json("/predict", r#"{"features": [1.0, 2.0, 3.0]}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Expected 64 features, got 3");

    let (status, _) = send(loaded_app(), post_json("/predict", r#"{"features": []}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_predict_malformed_body_is_client_error() {
    for payload in ["not json", r#"{"values": [1, 2]}"#, r#"{"features": ["a", "b"]}"#, r#"{"features": 3}"#] {
        let (status, body) = send(loaded_app(), post_json("/predict", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
        assert!(body["error"].as_str().is_some_and(|s| !s.is_empty()));
    }
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let (status, body) = send(loaded_app(), get("/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, body) = send(loaded_app(), get("/predict")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(body["error"].is_string());
}
