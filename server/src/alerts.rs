//! Email alerts.
//!
//! Moisture threshold alerts with a per-kind cooldown, plus the
//! notification mail sent when a crop profile is generated through the
//! AI oracle. Delivery goes through the Resend HTTP API; a missing key
//! or empty recipient list silently disables sending.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use shared_types::CropRule;

const RESEND_URL: &str = "https://api.resend.com/emails";
const FROM_ADDRESS: &str = "Smart Agriculture <onboarding@resend.dev>";

/// Moisture at or below this percentage means the soil is dangerously dry.
pub const DRY_MOISTURE_THRESHOLD: f64 = 20.0;
/// Moisture at or above this percentage means the field is waterlogged.
pub const WET_MOISTURE_THRESHOLD: f64 = 90.0;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("mailer not configured (no API key or recipients)")]
    NotConfigured,
    #[error("email request failed: {0}")]
    Request(String),
    #[error("email send returned status {0}: {1}")]
    Status(u16, String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, subject: &str, html: &str) -> Result<(), AlertError>;
}

pub struct ResendMailer {
    http: reqwest::Client,
    api_key: Option<String>,
    recipients: Vec<String>,
}

impl ResendMailer {
    pub fn new(http: reqwest::Client, api_key: Option<String>, recipients: Vec<String>) -> Self {
        Self {
            http,
            api_key,
            recipients,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, subject: &str, html: &str) -> Result<(), AlertError> {
        let api_key = self.api_key.as_deref().ok_or(AlertError::NotConfigured)?;
        if self.recipients.is_empty() {
            return Err(AlertError::NotConfigured);
        }

        let response = self
            .http
            .post(RESEND_URL)
            .bearer_auth(api_key)
            .json(&json!({
                "from": FROM_ADDRESS,
                "to": self.recipients,
                "subject": subject,
                "html": html
            }))
            .send()
            .await
            .map_err(|e| AlertError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AlertError::Status(status.as_u16(), body));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Dry,
    Wet,
}

impl AlertKind {
    fn subject(&self) -> &'static str {
        match self {
            Self::Dry => "ALERT: Soil Too Dry - Immediate Action Required",
            Self::Wet => "ALERT: Soil Too Wet - Over-watering Detected",
        }
    }

    fn html(&self, moisture: f64) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M UTC");
        match self {
            Self::Dry => format!(
                r#"<div style="font-family: Arial, sans-serif; padding: 20px; background: #fff3cd; border-radius: 10px;">
  <h2 style="color: #856404;">Soil Moisture Critical Alert</h2>
  <p style="font-size: 18px;">Your soil moisture has dropped to <strong>{moisture}%</strong></p>
  <p style="color: #721c24; font-size: 16px;">
    The soil is too dry to support healthy plant growth.
    Your crops may be at risk of wilting or dying.
  </p>
  <h3>Recommended Actions:</h3>
  <ul>
    <li>Turn on irrigation/water pump immediately</li>
    <li>Check for any leaks in the irrigation system</li>
    <li>Consider adding mulch to retain moisture</li>
  </ul>
  <p style="color: #6c757d; font-size: 12px;">Alert from Smart Agriculture System - {timestamp}</p>
</div>"#
            ),
            Self::Wet => format!(
                r#"<div style="font-family: Arial, sans-serif; padding: 20px; background: #cce5ff; border-radius: 10px;">
  <h2 style="color: #004085;">Soil Moisture Critical Alert</h2>
  <p style="font-size: 18px;">Your soil moisture has reached <strong>{moisture}%</strong></p>
  <p style="color: #721c24; font-size: 16px;">
    The soil is over-saturated with water.
    This can lead to root rot and kill your crops.
  </p>
  <h3>Recommended Actions:</h3>
  <ul>
    <li>Turn off irrigation/water pump immediately</li>
    <li>Ensure proper drainage in the field</li>
    <li>Check for blocked drainage channels</li>
  </ul>
  <p style="color: #6c757d; font-size: 12px;">Alert from Smart Agriculture System - {timestamp}</p>
</div>"#
            ),
        }
    }
}

/// Which alert a moisture value warrants, if any. Zero, negative, or
/// non-finite readings mean the probe is unplugged and are ignored.
pub fn classify_moisture(moisture: f64) -> Option<AlertKind> {
    if !moisture.is_finite() || moisture <= 0.0 {
        return None;
    }
    if moisture <= DRY_MOISTURE_THRESHOLD {
        Some(AlertKind::Dry)
    } else if moisture >= WET_MOISTURE_THRESHOLD {
        Some(AlertKind::Wet)
    } else {
        None
    }
}

/// Threshold alerting with a cooldown between repeats of the same kind.
pub struct MoistureAlerts {
    mailer: Arc<dyn Mailer>,
    cooldown: Duration,
    last_sent: Mutex<Option<(Instant, AlertKind)>>,
}

impl MoistureAlerts {
    pub fn new(mailer: Arc<dyn Mailer>, cooldown: Duration) -> Self {
        Self {
            mailer,
            cooldown,
            last_sent: Mutex::new(None),
        }
    }

    /// Evaluate one moisture value and send an alert if warranted.
    /// Returns whether an email actually went out.
    pub async fn check(&self, moisture: f64) -> bool {
        let Some(kind) = classify_moisture(moisture) else {
            return false;
        };

        let mut last = self.last_sent.lock().await;
        if let Some((at, prev_kind)) = *last {
            if prev_kind == kind && at.elapsed() < self.cooldown {
                debug!(?kind, "alert cooldown active; skipping");
                return false;
            }
        }

        match self.mailer.send(kind.subject(), &kind.html(moisture)).await {
            Ok(()) => {
                info!(?kind, moisture, "moisture alert sent");
                *last = Some((Instant::now(), kind));
                true
            }
            Err(AlertError::NotConfigured) => {
                debug!(?kind, "mailer not configured; alert dropped");
                false
            }
            Err(e) => {
                warn!(?kind, error = %e, "moisture alert send failed");
                false
            }
        }
    }
}

/// Notification mail sent after an AI-generated crop profile is stored.
pub async fn send_ai_search_email(
    mailer: &dyn Mailer,
    rule: &CropRule,
    analysis: &str,
) -> Result<(), AlertError> {
    let subject = format!("Crop Analysis Search: {}", rule.name);
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; padding: 20px; border: 1px solid #ddd; border-radius: 10px;">
  <h2 style="color: #2E7D32;">New AI Crop Search</h2>
  <p><strong>User searched for:</strong> {}</p>
  <div style="background: #f8f9fa; padding: 15px; border-radius: 5px; margin: 15px 0;">
    <h3 style="margin-top:0;">AI Advice &amp; Analysis:</h3>
    <p style="line-height: 1.5; color: #444;">{analysis}</p>
  </div>
  <h3>Ideal Conditions Generated:</h3>
  <ul>
    <li><strong>Nitrogen (N):</strong> {} - {} mg/kg</li>
    <li><strong>Phosphorus (P):</strong> {} - {} mg/kg</li>
    <li><strong>Potassium (K):</strong> {} - {} mg/kg</li>
    <li><strong>pH:</strong> {} - {}</li>
    <li><strong>Temperature:</strong> {} - {} °C</li>
  </ul>
</div>"#,
        rule.name,
        rule.n_min,
        rule.n_max,
        rule.p_min,
        rule.p_max,
        rule.k_min,
        rule.k_max,
        rule.ph_min,
        rule.ph_max,
        rule.temp_min,
        rule.temp_max,
    );
    mailer.send(&subject, &html).await
}
