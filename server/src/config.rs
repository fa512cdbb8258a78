use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server listens on
    pub port: u16,
    /// Path to the crops knowledgebase JSON file
    pub crops_file: String,
    /// Path to the exported classifier parameter file
    pub model_file: String,
    /// Serial device the sensor board is attached to
    pub serial_port: String,
    /// Baud rate of the hardware link
    pub serial_baud: u32,
    /// Set false when no board is attached; HTTP push still works
    pub serial_enabled: bool,
    /// OpenRouter-compatible chat-completions base URL
    pub ai_base_url: String,
    /// Model slug sent with every completion request
    pub ai_model: String,
    /// API key for the AI oracle; absent disables AI features
    pub ai_api_key: Option<String>,
    /// Per-call timeout for AI oracle requests
    pub ai_timeout: Duration,
    /// Resend API key; absent disables email alerts
    pub resend_api_key: Option<String>,
    /// Recipients for moisture alerts and AI search notifications
    pub alert_emails: Vec<String>,
    /// Minimum gap between repeated alerts of the same kind
    pub email_cooldown: Duration,
    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            port: env_parse("SERVER_PORT", 5000)?,
            crops_file: env_str("CROPS_FILE", "./data/crops.json"),
            model_file: env_str("MODEL_FILE", "./model/crop_model.json"),
            serial_port: env_str("SERIAL_PORT", "/dev/ttyUSB0"),
            serial_baud: env_parse("SERIAL_BAUD", 9600)?,
            serial_enabled: env_flag("SERIAL_ENABLED", true),
            ai_base_url: env_str("AI_BASE_URL", "https://openrouter.ai/api/v1"),
            ai_model: env_str("AI_MODEL", "openai/gpt-oss-20b:free"),
            ai_api_key: std::env::var("AI_API_KEY").ok(),
            ai_timeout: Duration::from_secs(env_parse("AI_TIMEOUT_SECS", 45)?),
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
            alert_emails: env_csv("ALERT_EMAILS", &[]),
            email_cooldown: Duration::from_secs(env_parse("EMAIL_COOLDOWN_SECS", 300)?),
            allowed_origins: env_csv(
                "ALLOWED_ORIGINS",
                &["http://localhost:3000", "http://127.0.0.1:3000"],
            ),
        })
    }
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}")),
        Err(_) => Ok(default),
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => v != "0" && v.to_lowercase() != "false",
        Err(_) => default,
    }
}

fn env_csv(key: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect(),
        Err(_) => default.iter().map(|s| (*s).to_string()).collect(),
    }
}
