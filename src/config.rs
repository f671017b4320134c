use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::models::sizing::{PanelSpec, PanelType};
use crate::services::calculation::{PanelCatalog, DEFAULT_EFFICIENCY_FACTOR};

pub const CONFIG_PATH_ENV: &str = "SOLAR_SIZER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

fn default_geocoding_base_url() -> String { "https://nominatim.openstreetmap.org".to_string() }
fn default_forecast_base_url() -> String { "https://api.open-meteo.com".to_string() }
fn default_country() -> String { "Turkey".to_string() }
fn default_forecast_days() -> u32 { 7 }
fn default_http_timeout_seconds() -> u64 { 10 }
fn default_user_agent() -> String { format!("solar-panel-sizer/{}", env!("CARGO_PKG_VERSION")) }
fn default_smtp_port() -> u16 { 587 }
fn default_use_tls() -> bool { true }
fn default_username_env() -> String { "SOLAR_SIZER_SMTP_USER".to_string() }
fn default_password_env() -> String { "SOLAR_SIZER_SMTP_PASSWORD".to_string() }
fn default_queue_capacity() -> usize { 32 }
fn default_max_attempts() -> u32 { 3 }
fn default_retry_delay_ms() -> u64 { 2000 }

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub sunshine: SunshineConfig,
    /// Overrides for the built-in panel constants
    #[serde(default)]
    pub panels: Vec<PanelConfig>,
    /// Region name → annual sunshine hours, used by the static provider
    #[serde(default)]
    pub regions: BTreeMap<String, f64>,
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Static,
    OpenMeteo,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SunshineConfig {
    pub provider: ProviderKind,
    #[serde(default = "default_geocoding_base_url")]
    pub geocoding_base_url: String,
    #[serde(default = "default_forecast_base_url")]
    pub forecast_base_url: String,
    /// Appended to every geocoding query
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SunshineConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Static,
            geocoding_base_url: default_geocoding_base_url(),
            forecast_base_url: default_forecast_base_url(),
            country: default_country(),
            forecast_days: default_forecast_days(),
            http_timeout_seconds: default_http_timeout_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PanelConfig {
    pub panel_type: PanelType,
    pub efficiency_factor: Option<f64>,
    pub unit_cost: f64,
}

impl PanelConfig {
    pub fn to_spec(&self) -> PanelSpec {
        PanelSpec {
            panel_type: self.panel_type,
            efficiency_factor: self.efficiency_factor.unwrap_or(DEFAULT_EFFICIENCY_FACTOR),
            unit_cost: self.unit_cost,
        }
    }
}

/// SMTP settings for user feedback. Credentials are read from the
/// environment variables named here, never from the file itself.
#[derive(Debug, Deserialize, Clone)]
pub struct FeedbackConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    #[serde(default)]
    pub from_address: String,
    #[serde(default)]
    pub to_address: String,
    #[serde(default = "default_username_env")]
    pub username_env: String,
    #[serde(default = "default_password_env")]
    pub password_env: String,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            use_tls: default_use_tls(),
            from_address: String::new(),
            to_address: String::new(),
            username_env: default_username_env(),
            password_env: default_password_env(),
            queue_capacity: default_queue_capacity(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Config {
    /// Reads the file named by `SOLAR_SIZER_CONFIG`, or `config.json`.
    pub fn load_default() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(&path)
    }

    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;
        Self::from_json(&content).with_context(|| format!("invalid configuration in {}", path))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sunshine.provider == ProviderKind::Static && self.regions.is_empty() {
            bail!("static sunshine provider selected but no regions are configured");
        }
        if let Some((name, hours)) = self.regions.iter().find(|(_, h)| !h.is_finite() || **h < 0.0) {
            bail!("region '{}' has invalid sunshine hours {}", name, hours);
        }
        if !(1..=16).contains(&self.sunshine.forecast_days) {
            bail!("sunshine.forecast_days must be within 1–16, got {}", self.sunshine.forecast_days);
        }
        if self.sunshine.http_timeout_seconds == 0 {
            bail!("sunshine.http_timeout_seconds must be positive");
        }
        let fb = &self.feedback;
        if fb.enabled && (fb.smtp_host.is_empty() || fb.from_address.is_empty() || fb.to_address.is_empty()) {
            bail!("feedback is enabled but smtp_host, from_address or to_address is missing");
        }
        if fb.queue_capacity == 0 || fb.max_attempts == 0 {
            bail!("feedback.queue_capacity and feedback.max_attempts must be positive");
        }
        Ok(())
    }

    pub fn panel_catalog(&self) -> Result<PanelCatalog> {
        PanelCatalog::from_specs(self.panels.iter().map(PanelConfig::to_spec)).context("invalid panel catalog")
    }
}
