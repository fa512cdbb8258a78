//! Sensor endpoints: latest snapshot, link push, and link status.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use shared_types::LinkFrame;

use crate::api::ApiState;
use crate::reading::ReadingProvider;

/// GET /api/sensor-data: latest snapshot, `{}` until one arrives.
pub async fn get_sensor_data(State(state): State<ApiState>) -> impl IntoResponse {
    match state.app_state.link.latest().await {
        Some(reading) => Json(json!(reading)),
        None => Json(json!({})),
    }
}

/// POST /api/sensor-data: frame push from an external link reader.
/// Runs the same moisture alert check as the serial path.
pub async fn push_sensor_data(
    State(state): State<ApiState>,
    Json(frame): Json<LinkFrame>,
) -> impl IntoResponse {
    let app = &state.app_state;
    app.link.apply(&frame).await;
    if let Some(moisture) = frame.soil_moisture {
        app.alerts.check(moisture).await;
    }
    Json(json!({ "message": "Sensor data received" }))
}

/// GET /api/connection-status: whether any complete reading has arrived.
pub async fn connection_status(State(state): State<ApiState>) -> impl IntoResponse {
    let connected = state.app_state.link.latest().await.is_some();
    Json(json!({ "connected": connected }))
}

/// GET /api/motor-status: pump state as last reported by the link.
pub async fn motor_status(State(state): State<ApiState>) -> impl IntoResponse {
    let status = state.app_state.link.motor_status().await;
    Json(json!({ "status": status }))
}
