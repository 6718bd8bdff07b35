//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.store-insights.toml` files. The resulting [`Config`] is passed by value
//! into the gateway and every analytics module; nothing reads settings from a
//! global.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".store-insights.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Text-generation backend settings.
    #[serde(default)]
    pub ai: AiConfig,

    /// Per-module narrative switches.
    #[serde(default)]
    pub modules: ModulesConfig,

    /// Smart alert thresholds.
    #[serde(default)]
    pub alerts: AlertThresholds,

    /// Default lookback windows.
    #[serde(default)]
    pub windows: WindowConfig,
}

/// General store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Store name used in prompts and reports.
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// Currency symbol used when formatting amounts.
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    /// Currency code appended to amounts in prompts.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Language the generated narratives are written in.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            store_name: default_store_name(),
            currency_symbol: default_currency_symbol(),
            currency: default_currency(),
            language: default_language(),
        }
    }
}

fn default_store_name() -> String {
    "Tienda Centro".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_currency() -> String {
    "MXN".to_string()
}

fn default_language() -> String {
    "Spanish".to_string()
}

/// Backend settings for the local (Ollama) and cloud (Anthropic) generators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Master switch. When false every generation request fails fast.
    #[serde(default)]
    pub enabled: bool,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Local model name.
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,

    /// Anthropic API key. Empty or missing means the cloud backend is not configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<String>,

    /// Cloud model name.
    #[serde(default = "default_claude_model")]
    pub claude_model: String,

    /// Anthropic API base URL.
    #[serde(default = "default_anthropic_url")]
    pub anthropic_url: String,

    /// Reachability probe timeout in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,

    /// Local generation timeout in seconds (covers model cold starts).
    #[serde(default = "default_local_timeout")]
    pub local_timeout_seconds: u64,

    /// Cloud generation timeout in seconds.
    #[serde(default = "default_cloud_timeout")]
    pub cloud_timeout_seconds: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ollama_url: default_ollama_url(),
            ollama_model: default_ollama_model(),
            anthropic_api_key: None,
            claude_model: default_claude_model(),
            anthropic_url: default_anthropic_url(),
            probe_timeout_seconds: default_probe_timeout(),
            local_timeout_seconds: default_local_timeout(),
            cloud_timeout_seconds: default_cloud_timeout(),
        }
    }
}

impl AiConfig {
    /// Returns the API key when one is actually set.
    pub fn cloud_api_key(&self) -> Option<&str> {
        self.anthropic_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Whether the cloud backend has credentials.
    pub fn cloud_configured(&self) -> bool {
        self.cloud_api_key().is_some()
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_claude_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_anthropic_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_local_timeout() -> u64 {
    120
}

fn default_cloud_timeout() -> u64 {
    60
}

/// Narrative switches for each analytics module.
///
/// A disabled module still returns its structured payload; only the
/// generated narrative is skipped. Business queries have no payload without
/// the narrative, so a disabled `insights` flag rejects the call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModulesConfig {
    #[serde(default)]
    pub demand_forecast: bool,

    #[serde(default)]
    pub insights: bool,

    #[serde(default)]
    pub smart_alerts: bool,

    #[serde(default)]
    pub customer_insights: bool,
}

/// Heuristic thresholds for the smart alert checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Days of completed sales used as the revenue baseline.
    #[serde(default = "default_baseline_days")]
    pub baseline_days: i64,

    /// Hours in a normal trading day, used to project today's revenue.
    #[serde(default = "default_operating_hours")]
    pub operating_hours: f64,

    /// Projected/baseline ratio above which a spike is reported.
    #[serde(default = "default_spike_ratio")]
    pub spike_ratio: f64,

    /// Projected/baseline ratio below which a drop is reported.
    #[serde(default = "default_drop_ratio")]
    pub drop_ratio: f64,

    /// Drops are not reported before this many hours into the day.
    #[serde(default = "default_drop_min_hours")]
    pub drop_min_hours: f64,

    /// Trailing window for the void-rate check.
    #[serde(default = "default_void_window_days")]
    pub void_window_days: i64,

    /// Minimum number of sales before the void rate is considered.
    #[serde(default = "default_void_min_sales")]
    pub void_min_sales: u64,

    /// Void share above which an alert fires.
    #[serde(default = "default_void_rate")]
    pub void_rate: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            baseline_days: default_baseline_days(),
            operating_hours: default_operating_hours(),
            spike_ratio: default_spike_ratio(),
            drop_ratio: default_drop_ratio(),
            drop_min_hours: default_drop_min_hours(),
            void_window_days: default_void_window_days(),
            void_min_sales: default_void_min_sales(),
            void_rate: default_void_rate(),
        }
    }
}

fn default_baseline_days() -> i64 {
    7
}

fn default_operating_hours() -> f64 {
    14.0
}

fn default_spike_ratio() -> f64 {
    2.0
}

fn default_drop_ratio() -> f64 {
    0.3
}

fn default_drop_min_hours() -> f64 {
    4.0
}

fn default_void_window_days() -> i64 {
    1
}

fn default_void_min_sales() -> u64 {
    10
}

fn default_void_rate() -> f64 {
    0.05
}

/// Default lookback windows, overridable per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,

    #[serde(default = "default_customer_days")]
    pub customer_days: u32,

    #[serde(default = "default_query_days")]
    pub query_days: u32,

    /// Pairs bought together fewer times than this are dropped.
    #[serde(default = "default_min_occurrences")]
    pub min_occurrences: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            forecast_days: default_forecast_days(),
            customer_days: default_customer_days(),
            query_days: default_query_days(),
            min_occurrences: default_min_occurrences(),
        }
    }
}

fn default_forecast_days() -> u32 {
    14
}

fn default_customer_days() -> u32 {
    30
}

fn default_query_days() -> u32 {
    7
}

fn default_min_occurrences() -> usize {
    3
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.ollama_url {
            self.ai.ollama_url = url.clone();
        }
        if let Some(ref model) = args.model {
            self.ai.ollama_model = model.clone();
        }
        if let Some(ref key) = args.anthropic_api_key {
            self.ai.anthropic_api_key = Some(key.clone());
        }
        if let Some(enabled) = args.ai_enabled {
            self.ai.enabled = enabled;
        }
        if let Some(ref store_name) = args.store_name {
            self.general.store_name = store_name.clone();
        }
    }

    /// Check values that serde cannot reject on its own.
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("ollama_url", &self.ai.ollama_url),
            ("anthropic_url", &self.ai.anthropic_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("{} must start with 'http://' or 'https://': {}", name, url);
            }
        }

        let max_days = crate::analytics::MAX_WINDOW_DAYS;
        for (name, days) in [
            ("windows.forecast_days", i64::from(self.windows.forecast_days)),
            ("windows.customer_days", i64::from(self.windows.customer_days)),
            ("windows.query_days", i64::from(self.windows.query_days)),
            ("alerts.baseline_days", self.alerts.baseline_days),
            ("alerts.void_window_days", self.alerts.void_window_days),
        ] {
            if !(1..=max_days).contains(&days) {
                bail!("{} must be between 1 and {} days, got {}", name, max_days, days);
            }
        }

        if self.alerts.operating_hours <= 0.0 {
            bail!("operating_hours must be positive");
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
