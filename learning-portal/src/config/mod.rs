use portal_core::config::{configuration_directory, load_layered};
use portal_core::error::AppError;
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub server: ServerSettings,
    pub api: ApiSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Mark the session cookie `Secure`; enable behind HTTPS.
    #[serde(default)]
    pub secure_cookies: bool,
    #[serde(default = "default_session_inactivity_hours")]
    pub session_inactivity_hours: i64,
    /// Lesson drafts untouched for this long are discarded.
    #[serde(default = "default_draft_ttl_minutes")]
    pub draft_ttl_minutes: u64,
    #[serde(default = "default_max_drafts_per_login")]
    pub max_drafts_per_login: usize,
}

impl ServerSettings {
    pub fn draft_ttl(&self) -> Duration {
        Duration::from_secs(self.draft_ttl_minutes * 60)
    }
}

fn default_session_inactivity_hours() -> i64 {
    24
}

fn default_draft_ttl_minutes() -> u64 {
    120
}

fn default_max_drafts_per_login() -> usize {
    5
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApiSettings {
    /// Base URL of the LMS REST API, e.g. `http://127.0.0.1:8000/api/`.
    pub base_url: String,
    /// Fixed per-request timeout; a timeout surfaces like any other failure.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Deserialize, Clone, Debug)]
pub struct TelemetrySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP gRPC endpoint (e.g. `http://tempo:4317`); spans are only exported
    /// when set.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn get_configuration() -> Result<Settings, AppError> {
    let directory = configuration_directory("learning-portal")?;
    load_layered(&directory)
}
