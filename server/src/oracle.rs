//! AI oracle client.
//!
//! Two capabilities behind one trait: padding the recommendation list
//! with extra crop suggestions, and generating an ideal-conditions
//! profile for a named crop. Both go through an OpenRouter-compatible
//! chat-completions endpoint and must survive models that wrap their
//! JSON in markdown fences.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use shared_types::{Candidate, CandidateSource, CropProfile, SensorReading};

const REFERER: &str = "http://localhost:5000";
const APP_TITLE: &str = "Smart Agriculture MVP";
/// Confidence assigned to suggestions the model returned without one.
const DEFAULT_SUGGESTION_CONFIDENCE: f64 = 50.0;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("AI oracle not configured (no API key)")]
    NotConfigured,
    #[error("AI request failed: {0}")]
    Request(String),
    #[error("AI returned status {0}: {1}")]
    Status(u16, String),
    #[error("AI response parse failed: {0}")]
    Parse(String),
}

#[async_trait]
pub trait CropAi: Send + Sync {
    /// Ask for `count` more crops fitting the reading, avoiding the
    /// already-known names.
    async fn suggest_crops(
        &self,
        reading: &SensorReading,
        known: &[String],
        count: usize,
    ) -> Result<Vec<Candidate>, OracleError>;

    /// Generate an ideal-conditions profile for a crop, optionally
    /// comparing against the current reading.
    async fn crop_profile(
        &self,
        crop_name: &str,
        reading: Option<&SensorReading>,
    ) -> Result<CropProfile, OracleError>;
}

pub struct OpenRouterClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenRouterClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
            api_key,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    async fn complete(&self, body: Value) -> Result<Value, OracleError> {
        let api_key = self.api_key.as_deref().ok_or(OracleError::NotConfigured)?;

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(&body)
            .send()
            .await
            .map_err(|e| OracleError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Status(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| OracleError::Parse(e.to_string()))
    }
}

#[async_trait]
impl CropAi for OpenRouterClient {
    async fn suggest_crops(
        &self,
        reading: &SensorReading,
        known: &[String],
        count: usize,
    ) -> Result<Vec<Candidate>, OracleError> {
        let prompt = suggestion_prompt(reading, known, count);
        let payload = self
            .complete(json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
                "provider": { "data_collection": "allow" }
            }))
            .await?;

        let content = message_content(&payload)?;
        let cleaned = strip_code_fences(&content);
        let entries: Value = serde_json::from_str(&cleaned)
            .map_err(|e| OracleError::Parse(format!("suggestions not valid JSON: {e}")))?;
        Ok(parse_suggestions(&entries))
    }

    async fn crop_profile(
        &self,
        crop_name: &str,
        reading: Option<&SensorReading>,
    ) -> Result<CropProfile, OracleError> {
        let prompt = profile_prompt(crop_name, reading);

        // First pass with reasoning enabled; the model tends to mix its
        // working into the content.
        let first = self
            .complete(json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
                "reasoning": { "enabled": true },
                "provider": { "data_collection": "allow" }
            }))
            .await?;
        let assistant = first
            .pointer("/choices/0/message")
            .cloned()
            .ok_or_else(|| OracleError::Parse("missing choices[0].message".into()))?;

        // Second pass feeds the reasoning back and demands bare JSON.
        let second = self
            .complete(json!({
                "model": self.model,
                "messages": [
                    { "role": "user", "content": prompt },
                    {
                        "role": "assistant",
                        "content": assistant.get("content").cloned().unwrap_or(Value::Null),
                        "reasoning_details": assistant.get("reasoning_details").cloned()
                            .unwrap_or(Value::Null)
                    },
                    {
                        "role": "user",
                        "content": "Return the final formatted JSON exactly as requested \
                                    without any markdown or conversational text."
                    }
                ],
                "reasoning": { "enabled": true },
                "provider": { "data_collection": "allow" }
            }))
            .await?;

        let content = message_content(&second)?;
        let cleaned = strip_code_fences(&content);
        debug!(crop = crop_name, "parsing AI crop profile");
        serde_json::from_str(&cleaned)
            .map_err(|e| OracleError::Parse(format!("profile not valid JSON: {e}")))
    }
}

fn message_content(payload: &Value) -> Result<String, OracleError> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .map(ToString::to_string)
        .ok_or_else(|| OracleError::Parse("missing choices[0].message.content".into()))
}

/// Remove leading/trailing markdown code fences (```json ... ```).
pub(crate) fn strip_code_fences(content: &str) -> String {
    let trimmed = content.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let mut lines: Vec<&str> = trimmed.lines().collect();
    if lines.first().is_some_and(|l| l.starts_with("```")) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| l.trim() == "```") {
        lines.pop();
    }
    lines.join("\n").trim().to_string()
}

/// Convert the model's suggestion array into candidates. Entries without
/// a name are discarded; a missing confidence defaults; every entry is
/// tagged as an AI suggestion regardless of what the model claims.
pub(crate) fn parse_suggestions(entries: &Value) -> Vec<Candidate> {
    let Some(rows) = entries.as_array() else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(|row| {
            let crop = row.get("crop").and_then(|v| v.as_str())?.trim();
            if crop.is_empty() {
                return None;
            }
            Some(Candidate {
                crop: crop.to_string(),
                confidence: row
                    .get("confidence")
                    .and_then(|v| v.as_f64())
                    .unwrap_or(DEFAULT_SUGGESTION_CONFIDENCE),
                source: CandidateSource::AiSuggestion,
            })
        })
        .collect()
}

fn suggestion_prompt(reading: &SensorReading, known: &[String], count: usize) -> String {
    format!(
        "You are an expert agronomist. Based on these soil conditions:\n\
         N={} mg/kg, P={} mg/kg, K={} mg/kg\n\
         pH={}, Temperature={}°C, Moisture={}%\n\n\
         Already listed: {}\n\n\
         Suggest exactly {count} MORE crops suitable for these conditions. \
         Do NOT repeat any listed above.\n\
         Return ONLY a JSON array, no markdown, no explanation:\n\
         [{{\"crop\":\"CropName\",\"confidence\":75,\"type\":\"AI Suggestion\"}}]",
        reading.n,
        reading.p,
        reading.k,
        reading.ph,
        reading.temperature,
        reading.soil_moisture,
        known.join(", "),
    )
}

fn profile_prompt(crop_name: &str, reading: Option<&SensorReading>) -> String {
    let (sensor_info, analysis_instruction) = match reading {
        Some(r) => (
            format!(
                "Current Sensor Readings:\n\
                 - Nitrogen (N): {} mg/kg\n\
                 - Phosphorus (P): {} mg/kg\n\
                 - Potassium (K): {} mg/kg\n\
                 - pH: {}\n\
                 - Temperature: {} °C\n\
                 - Soil Moisture: {} %",
                r.n, r.p, r.k, r.ph, r.temperature, r.soil_moisture
            ),
            "Compare these readings with the ideal ranges and provide specific \
             advice on what needs adjustment.",
        ),
        None => (
            "No sensor data available (offline mode).".to_string(),
            "Provide general growing advice for this crop.",
        ),
    };

    format!(
        "You are an agricultural expert. Provide ideal soil and climate \
         conditions for: {crop_name}\n\n\
         {sensor_info}\n\n\
         Return ONLY a valid JSON object (no markdown, no code blocks). Structure:\n\
         {{\n\
         \"N_min\": <integer>,\n\
         \"N_max\": <integer>,\n\
         \"P_min\": <integer>,\n\
         \"P_max\": <integer>,\n\
         \"K_min\": <integer>,\n\
         \"K_max\": <integer>,\n\
         \"ph_min\": <float>,\n\
         \"ph_max\": <float>,\n\
         \"temp_min\": <float>,\n\
         \"temp_max\": <float>,\n\
         \"moist_min\": <float>,\n\
         \"moist_max\": <float>,\n\
         \"analysis\": \"<string: {analysis_instruction}>\"\n\
         }}\n\n\
         Use realistic agricultural data for {crop_name}."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strip_code_fences_handles_fenced_and_bare_content() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[1,2]\n```"), "[1,2]");
        assert_eq!(strip_code_fences("  ```json\n{}\n```  "), "{}");
    }

    #[test]
    fn parse_suggestions_applies_defaults_and_discards_nameless_rows() {
        let entries = json!([
            { "crop": "Barley", "confidence": 72, "type": "AI Suggestion" },
            { "crop": "Oats" },
            { "confidence": 90 },
            { "crop": "   " },
            { "crop": "Rye", "type": "ML Model" }
        ]);

        let parsed = parse_suggestions(&entries);
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].crop, "Barley");
        assert_eq!(parsed[0].confidence, 72.0);
        assert_eq!(parsed[1].crop, "Oats");
        assert_eq!(parsed[1].confidence, DEFAULT_SUGGESTION_CONFIDENCE);
        // Source tags from the model are not trusted.
        assert!(parsed
            .iter()
            .all(|c| c.source == CandidateSource::AiSuggestion));
    }

    #[test]
    fn parse_suggestions_tolerates_non_array_payloads() {
        assert!(parse_suggestions(&json!({ "crop": "Barley" })).is_empty());
        assert!(parse_suggestions(&json!(null)).is_empty());
    }

    #[test]
    fn profile_prompt_switches_on_sensor_availability() {
        let reading = SensorReading {
            n: 120.0,
            p: 60.0,
            k: 80.0,
            temperature: 26.0,
            soil_moisture: 50.0,
            ph: 6.5,
        };
        let with_sensor = profile_prompt("Tomato", Some(&reading));
        assert!(with_sensor.contains("Nitrogen (N): 120"));
        assert!(with_sensor.contains("needs adjustment"));

        let offline = profile_prompt("Tomato", None);
        assert!(offline.contains("offline mode"));
        assert!(offline.contains("general growing advice"));
    }

    #[test]
    fn suggestion_prompt_names_the_count_and_known_crops() {
        let reading = SensorReading {
            n: 120.0,
            p: 60.0,
            k: 80.0,
            temperature: 26.0,
            soil_moisture: 50.0,
            ph: 6.5,
        };
        let prompt = suggestion_prompt(&reading, &["rice".into(), "wheat".into()], 7);
        assert!(prompt.contains("exactly 7 MORE crops"));
        assert!(prompt.contains("rice, wheat"));
    }
}
