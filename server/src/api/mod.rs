//! HTTP API routes for the smart-agriculture backend.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;

pub mod crops;
pub mod predict;
pub mod sensor;

use crate::app_state::AppState;

#[derive(Clone)]
pub struct ApiState {
    pub app_state: Arc<AppState>,
}

/// Configure all API routes
pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health_check))
        // Sensor routes
        .route(
            "/api/sensor-data",
            get(sensor::get_sensor_data).post(sensor::push_sensor_data),
        )
        .route("/api/connection-status", get(sensor::connection_status))
        .route("/api/motor-status", get(sensor::motor_status))
        // Crop knowledgebase routes
        .route("/api/crops", get(crops::get_crops).post(crops::add_crop))
        .route("/api/crops/{crop_name}", delete(crops::delete_crop))
        .route("/api/toggle-fav", post(crops::toggle_favorite))
        .route("/api/ai-add-crop", post(crops::ai_add_crop))
        // Recommendation ranking
        .route("/api/predict", post(predict::predict))
}

/// Health check endpoint
pub async fn health_check(State(_state): State<ApiState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "agrisense-server",
            "version": "0.1.0"
        })),
    )
}
