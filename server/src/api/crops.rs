//! Crop knowledgebase endpoints: list, add, delete, favorite toggle,
//! and AI-assisted profile generation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use shared_types::{CropProfile, CropRule};

use crate::alerts::send_ai_search_email;
use crate::api::ApiState;
use crate::reading::ReadingProvider;
use crate::store::StoreError;

pub async fn get_crops(State(state): State<ApiState>) -> Response {
    match state.app_state.crops.load().await {
        Ok(crops) => Json(crops).into_response(),
        Err(e) => store_failure(e),
    }
}

pub async fn add_crop(State(state): State<ApiState>, Json(rule): Json<CropRule>) -> Response {
    match state.app_state.crops.add(rule).await {
        Ok(()) => Json(json!({ "message": "Crop added" })).into_response(),
        Err(e) => store_failure(e),
    }
}

pub async fn delete_crop(
    State(state): State<ApiState>,
    Path(crop_name): Path<String>,
) -> Response {
    match state.app_state.crops.delete(&crop_name).await {
        Ok(removed) => {
            if removed {
                info!(crop = %crop_name, "crop removed");
            }
            Json(json!({ "message": "Crop removed" })).into_response()
        }
        Err(e) => store_failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ToggleFavoriteRequest {
    #[serde(default)]
    pub name: String,
}

pub async fn toggle_favorite(
    State(state): State<ApiState>,
    Json(req): Json<ToggleFavoriteRequest>,
) -> Response {
    let name = req.name.trim();
    if name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Crop name required" })),
        )
            .into_response();
    }

    match state.app_state.crops.toggle_favorite(name).await {
        Ok(Some(_)) => Json(json!({ "message": "Toggled favorite", "name": name })).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Crop '{name}' not found") })),
        )
            .into_response(),
        Err(e) => store_failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct AiAddCropRequest {
    #[serde(default)]
    pub name: String,
}

pub async fn ai_add_crop(
    State(state): State<ApiState>,
    Json(req): Json<AiAddCropRequest>,
) -> Response {
    let app = &state.app_state;
    let name = req.name.trim();
    if name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Crop name required" })),
        )
            .into_response();
    }

    info!(crop = name, "AI analyzing crop");
    let latest = app.link.latest().await;
    let profile = match app.ai.crop_profile(name, latest.as_ref()).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(crop = name, error = %e, "AI profile generation failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "AI could not retrieve data. Try again." })),
            )
                .into_response();
        }
    };

    let rule = rule_from_profile(name, profile);
    let analysis = rule
        .analysis
        .clone()
        .unwrap_or_else(|| "No analysis provided.".to_string());

    if let Err(e) = app.crops.upsert(rule.clone()).await {
        return store_failure(e);
    }

    if let Err(e) = send_ai_search_email(app.mailer.as_ref(), &rule, &analysis).await {
        warn!(crop = name, error = %e, "AI search notification email failed");
    }

    Json(json!({
        "message": "Crop added via AI",
        "crop": rule,
        "analysis": analysis
    }))
    .into_response()
}

/// Build a stored rule from an AI profile, swapping any inverted bounds.
fn rule_from_profile(name: &str, profile: CropProfile) -> CropRule {
    fn norm(a: f64, b: f64) -> (f64, f64) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    let (n_min, n_max) = norm(profile.n_min, profile.n_max);
    let (p_min, p_max) = norm(profile.p_min, profile.p_max);
    let (k_min, k_max) = norm(profile.k_min, profile.k_max);
    let (temp_min, temp_max) = norm(profile.temp_min, profile.temp_max);
    let (moist_min, moist_max) = norm(profile.moist_min, profile.moist_max);
    let (ph_min, ph_max) = norm(profile.ph_min, profile.ph_max);

    CropRule {
        name: name.to_string(),
        n_min,
        n_max,
        p_min,
        p_max,
        k_min,
        k_max,
        temp_min,
        temp_max,
        moist_min,
        moist_max,
        ph_min,
        ph_max,
        favorite: false,
        analysis: Some(
            profile
                .analysis
                .unwrap_or_else(|| "No AI analysis available.".to_string()),
        ),
    }
}

fn store_failure(e: StoreError) -> Response {
    error!(error = %e, "crop store operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Crop store unavailable" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_profile_bounds_are_swapped() {
        let profile: CropProfile = serde_json::from_value(serde_json::json!({
            "N_min": 200, "N_max": 120,
            "ph_min": 7.5, "ph_max": 6.0,
            "temp_min": 18, "temp_max": 26
        }))
        .unwrap();

        let rule = rule_from_profile("Tomato", profile);
        assert_eq!((rule.n_min, rule.n_max), (120.0, 200.0));
        assert_eq!((rule.ph_min, rule.ph_max), (6.0, 7.5));
        assert_eq!((rule.temp_min, rule.temp_max), (18.0, 26.0));
        assert!(!rule.favorite);
        assert_eq!(rule.analysis.as_deref(), Some("No AI analysis available."));
    }
}
