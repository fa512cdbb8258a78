//! Prediction endpoint integration tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use server::alerts::{AlertError, Mailer, MoistureAlerts};
use server::api;
use server::app_state::AppState;
use server::classifier::{Classifier, ClassifierError, LabelProbability};
use server::oracle::{CropAi, OracleError};
use server::reading::LatestReading;
use server::store::CropStore;
use shared_types::{Candidate, CandidateSource, CropProfile, SensorReading};

struct StubClassifier;

impl Classifier for StubClassifier {
    fn classify(&self, _reading: &SensorReading) -> Result<Vec<LabelProbability>, ClassifierError> {
        Ok(vec![
            LabelProbability {
                label: "Rice".to_string(),
                probability: 0.6,
            },
            LabelProbability {
                label: "Wheat".to_string(),
                probability: 0.25,
            },
            LabelProbability {
                label: "Maize".to_string(),
                probability: 0.1,
            },
            LabelProbability {
                label: "Cotton".to_string(),
                probability: 0.04,
            },
            LabelProbability {
                label: "Sugarcane".to_string(),
                probability: 0.01,
            },
        ])
    }
}

/// Returns exactly as many fresh names as asked for, or fails every
/// call when `fail` is set.
struct StubAi {
    fail: bool,
    counter: AtomicUsize,
}

impl StubAi {
    fn new(fail: bool) -> Self {
        Self {
            fail,
            counter: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CropAi for StubAi {
    async fn suggest_crops(
        &self,
        _reading: &SensorReading,
        _known: &[String],
        count: usize,
    ) -> Result<Vec<Candidate>, OracleError> {
        if self.fail {
            return Err(OracleError::Request("connection refused".into()));
        }
        Ok((0..count)
            .map(|_| {
                let n = self.counter.fetch_add(1, Ordering::SeqCst);
                Candidate {
                    crop: format!("Suggested Crop {n}"),
                    confidence: 55.0,
                    source: CandidateSource::AiSuggestion,
                }
            })
            .collect())
    }

    async fn crop_profile(
        &self,
        _crop_name: &str,
        _reading: Option<&SensorReading>,
    ) -> Result<CropProfile, OracleError> {
        Err(OracleError::NotConfigured)
    }
}

struct SilentMailer;

#[async_trait]
impl Mailer for SilentMailer {
    async fn send(&self, _subject: &str, _html: &str) -> Result<(), AlertError> {
        Err(AlertError::NotConfigured)
    }
}

fn setup_test_app(ai_fails: bool) -> (axum::Router, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let crops = CropStore::new(temp_dir.path().join("crops.json"));

    let mailer: Arc<dyn Mailer> = Arc::new(SilentMailer);
    let app_state = Arc::new(AppState {
        link: Arc::new(LatestReading::new()),
        crops,
        classifier: Arc::new(StubClassifier),
        ai: Arc::new(StubAi::new(ai_fails)),
        alerts: Arc::new(MoistureAlerts::new(
            Arc::clone(&mailer),
            Duration::from_secs(300),
        )),
        mailer,
    });

    let app = api::router().with_state(api::ApiState { app_state });
    (app, temp_dir)
}

async fn json_response(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.expect("request failed");
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes();
    let value: Value = serde_json::from_slice(&body).expect("invalid json");
    (status, value)
}

fn predict_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn full_reading() -> Value {
    json!({
        "N": 220.0, "P": 90.0, "K": 185.0,
        "temperature": 28.0, "soil_moisture": 72.5, "ph": 6.4
    })
}

#[tokio::test]
async fn test_predict_with_inline_reading_pads_to_target() {
    let (app, _dir) = setup_test_app(false);

    let (status, body) = json_response(&app, predict_request(full_reading())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("error").is_none(), "unexpected error: {body}");

    let recs = body["recommendations"].as_array().expect("array");
    assert_eq!(recs.len(), 25);
    assert_eq!(body["predicted_crop"], "Rice");

    // Confidence is the display order, highest first.
    let confidences: Vec<f64> = recs
        .iter()
        .map(|c| c["confidence"].as_f64().unwrap())
        .collect();
    assert!(confidences.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_predict_without_any_reading_reports_no_data() {
    let (app, _dir) = setup_test_app(false);

    // No body, no content-type: the optional JSON extractor yields None
    // and the hardware link has seen nothing either.
    let req = Request::builder()
        .method("POST")
        .uri("/api/predict")
        .body(Body::empty())
        .unwrap();

    let (status, body) = json_response(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "No sensor data received");
}

#[tokio::test]
async fn test_predict_rejects_all_zero_nutrients() {
    let (app, _dir) = setup_test_app(false);

    let req = predict_request(json!({
        "N": 0.0, "P": 0.0, "K": 0.0,
        "temperature": 26.0, "soil_moisture": 50.0, "ph": 6.5
    }));

    let (status, body) = json_response(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["error"],
        "Sensor readings are all zero. Connect sensors or switch mode."
    );
}

#[tokio::test]
async fn test_predict_favorite_rule_shadows_ml_duplicate() {
    let (app, dir) = setup_test_app(false);

    // Seed a favorite with the same name the classifier will emit.
    std::fs::write(
        dir.path().join("crops.json"),
        json!([{
            "name": "Rice",
            "N_min": 180, "N_max": 260,
            "P_min": 75, "P_max": 105,
            "K_min": 150, "K_max": 220,
            "temp_min": 24, "temp_max": 32,
            "moist_min": 60, "moist_max": 85,
            "ph_min": 5.8, "ph_max": 7.0,
            "favorite": true
        }])
        .to_string(),
    )
    .expect("seed crops file");

    let (status, body) = json_response(&app, predict_request(full_reading())).await;
    assert_eq!(status, StatusCode::OK);

    let recs = body["recommendations"].as_array().expect("array");
    let rice: Vec<&Value> = recs
        .iter()
        .filter(|c| c["crop"].as_str().unwrap().eq_ignore_ascii_case("rice"))
        .collect();
    assert_eq!(rice.len(), 1, "duplicate rice entries: {recs:?}");
    assert_eq!(rice[0]["type"], "Favorite");
}

#[tokio::test]
async fn test_predict_survives_ai_oracle_failure() {
    let (app, _dir) = setup_test_app(true);

    let (status, body) = json_response(&app, predict_request(full_reading())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("error").is_none());

    // Only the five classifier labels remain; the list is short but valid.
    let recs = body["recommendations"].as_array().expect("array");
    assert_eq!(recs.len(), 5);
    assert!(recs.iter().all(|c| c["type"] == "ML Model"));
}

#[tokio::test]
async fn test_predict_partial_inline_body_falls_back_to_link() {
    let (app, _dir) = setup_test_app(false);

    // pH missing, so the inline reading is incomplete and the (empty)
    // link is consulted instead.
    let req = predict_request(json!({
        "N": 120.0, "P": 60.0, "K": 80.0,
        "temperature": 26.0, "soil_moisture": 50.0
    }));

    let (status, body) = json_response(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "No sensor data received");
}
