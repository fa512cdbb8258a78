//! The recommendation-ranking endpoint at `/api/predict`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use shared_types::SensorReading;

use crate::api::ApiState;
use crate::ranker::{self, RankError};
use crate::reading::ReadingProvider;

/// Request body for cloud mode: the caller may supply a full reading
/// inline instead of relying on the hardware link. Partial readings are
/// treated as absent.
#[derive(Debug, Default, Deserialize)]
pub struct PredictRequest {
    #[serde(rename = "N", default)]
    pub n: Option<f64>,
    #[serde(rename = "P", default)]
    pub p: Option<f64>,
    #[serde(rename = "K", default)]
    pub k: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub soil_moisture: Option<f64>,
    #[serde(default)]
    pub ph: Option<f64>,
}

impl PredictRequest {
    pub fn reading(&self) -> Option<SensorReading> {
        Some(SensorReading {
            n: self.n?,
            p: self.p?,
            k: self.k?,
            temperature: self.temperature?,
            soil_moisture: self.soil_moisture?,
            ph: self.ph?,
        })
    }
}

pub async fn predict(
    State(state): State<ApiState>,
    body: Option<Json<PredictRequest>>,
) -> Response {
    let app = &state.app_state;

    let inline = body.and_then(|Json(req)| req.reading());
    let reading = match inline {
        Some(reading) => Some(reading),
        None => app.link.latest().await,
    };
    let Some(reading) = reading else {
        // Structured no-data outcome, not an HTTP failure: the frontend
        // switches modes off this message.
        return Json(json!({ "error": "No sensor data received" })).into_response();
    };

    let rules = match app.crops.load().await {
        Ok(rules) => rules,
        Err(e) => {
            error!(error = %e, "failed to load crop rules");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Crop store unavailable" })),
            )
                .into_response();
        }
    };

    match ranker::rank(
        &reading,
        &rules,
        app.classifier.as_ref(),
        app.ai.as_ref(),
    )
    .await
    {
        Ok(prediction) => Json(prediction).into_response(),
        Err(e @ RankError::ZeroReading) => Json(json!({ "error": e.to_string() })).into_response(),
        Err(e @ RankError::Classifier(_)) => {
            error!(error = %e, "classifier failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
