//! Shared types for the smart-agriculture backend
//!
//! Wire types used by the HTTP API and the hardware link, plus the
//! crop-rule knowledgebase records persisted in the flat-file store.
//! Serializable with serde so the JSON field names stay compatible
//! with the sensor firmware and the stored crops file.

use serde::{Deserialize, Serialize};

// ============================================================================
// Sensor Readings
// ============================================================================

/// A complete soil-sensor snapshot. All six values are required; the
/// ranker scores every dimension and the classifier consumes the full
/// feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(rename = "N")]
    pub n: f64,
    #[serde(rename = "P")]
    pub p: f64,
    #[serde(rename = "K")]
    pub k: f64,
    pub temperature: f64,
    pub soil_moisture: f64,
    pub ph: f64,
}

impl SensorReading {
    /// Feature vector in the fixed order the classifier was trained on:
    /// N, P, K, temperature, soil moisture, pH.
    pub fn features(&self) -> [f64; 6] {
        [
            self.n,
            self.p,
            self.k,
            self.temperature,
            self.soil_moisture,
            self.ph,
        ]
    }

    /// A reading with all nutrients at zero means the probes are not in
    /// soil (or not wired up); it is rejected rather than scored.
    pub fn is_zero_npk(&self) -> bool {
        self.n == 0.0 && self.p == 0.0 && self.k == 0.0
    }
}

/// One JSON line from the hardware link or one POST from an external
/// link reader. Fields are optional, since firmware revisions differ in what
/// they emit, and a frame only yields a [`SensorReading`] when all six
/// sensor fields are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkFrame {
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
    /// 1 = pump running, 0 = stopped. Absent on boards without a motor.
    #[serde(default)]
    pub motor: Option<i64>,
}

impl LinkFrame {
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

/// Pump state as last reported over the hardware link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotorStatus {
    Online,
    Offline,
}

// ============================================================================
// Crop Rules
// ============================================================================

/// A user-defined (or AI-generated) crop entry in the knowledgebase.
///
/// Field names mirror the stored crops file. Missing bounds fall back to
/// the historic wide-open defaults so sparse hand-entered records still
/// score on every dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRule {
    pub name: String,
    #[serde(rename = "N_min", default)]
    pub n_min: f64,
    #[serde(rename = "N_max", default = "default_nutrient_max")]
    pub n_max: f64,
    #[serde(rename = "P_min", default)]
    pub p_min: f64,
    #[serde(rename = "P_max", default = "default_nutrient_max")]
    pub p_max: f64,
    #[serde(rename = "K_min", default)]
    pub k_min: f64,
    #[serde(rename = "K_max", default = "default_nutrient_max")]
    pub k_max: f64,
    #[serde(default)]
    pub temp_min: f64,
    #[serde(default = "default_temp_max")]
    pub temp_max: f64,
    #[serde(default)]
    pub moist_min: f64,
    #[serde(default = "default_nutrient_max")]
    pub moist_max: f64,
    #[serde(default)]
    pub ph_min: f64,
    #[serde(default = "default_ph_max")]
    pub ph_max: f64,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
}

fn default_nutrient_max() -> f64 {
    100.0
}

fn default_temp_max() -> f64 {
    40.0
}

fn default_ph_max() -> f64 {
    14.0
}

impl CropRule {
    /// Range pairs in the same fixed order as [`SensorReading::features`].
    pub fn ranges(&self) -> [(f64, f64); 6] {
        [
            (self.n_min, self.n_max),
            (self.p_min, self.p_max),
            (self.k_min, self.k_max),
            (self.temp_min, self.temp_max),
            (self.moist_min, self.moist_max),
            (self.ph_min, self.ph_max),
        ]
    }
}

/// Ideal-conditions profile returned by the AI profile oracle for
/// `/api/ai-add-crop`. Bounds default to zero when the model omits them;
/// the handler normalizes inverted pairs before storing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CropProfile {
    #[serde(rename = "N_min", default)]
    pub n_min: f64,
    #[serde(rename = "N_max", default)]
    pub n_max: f64,
    #[serde(rename = "P_min", default)]
    pub p_min: f64,
    #[serde(rename = "P_max", default)]
    pub p_max: f64,
    #[serde(rename = "K_min", default)]
    pub k_min: f64,
    #[serde(rename = "K_max", default)]
    pub k_max: f64,
    #[serde(default)]
    pub temp_min: f64,
    #[serde(default)]
    pub temp_max: f64,
    #[serde(default)]
    pub moist_min: f64,
    #[serde(default)]
    pub moist_max: f64,
    #[serde(default)]
    pub ph_min: f64,
    #[serde(default)]
    pub ph_max: f64,
    #[serde(default)]
    pub analysis: Option<String>,
}

// ============================================================================
// Ranking Output
// ============================================================================

/// Where a recommendation candidate came from. Priority during the merge
/// is Favorite > YourCrops > MlModel > AiSuggestion; the serialized tags
/// are the display labels the frontend shows on each tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateSource {
    #[serde(rename = "Favorite")]
    Favorite,
    #[serde(rename = "Your Crops")]
    YourCrops,
    #[serde(rename = "ML Model")]
    MlModel,
    #[serde(rename = "AI Suggestion")]
    AiSuggestion,
}

/// One entry in the ranked recommendation list. Transient, recomputed
/// per request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub crop: String,
    /// 0–100, two-decimal precision.
    pub confidence: f64,
    #[serde(rename = "type")]
    pub source: CandidateSource,
}

/// Response body for `/api/predict`: the headline crop plus the full
/// trimmed, confidence-sorted list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_crop: String,
    pub confidence: f64,
    pub recommendations: Vec<Candidate>,
}
