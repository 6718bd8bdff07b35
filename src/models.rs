//! Data models for the analytics layer.
//!
//! This module contains the result shapes returned by every analytics
//! module along with the shared envelope and narrative types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which text-generation backend produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Ollama running next to the store server.
    Local,
    /// Anthropic Messages API.
    Cloud,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Local => write!(f, "local"),
            Backend::Cloud => write!(f, "cloud"),
        }
    }
}

/// Generated text attached to a structured result.
///
/// A failed attempt is kept as a structured reason; turning it into
/// user-facing text is left to whoever renders the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Narrative {
    Generated { text: String, backend: Backend },
    Unavailable { reason: String },
}

impl Narrative {
    /// Text to show a user: the narrative itself, or a bracketed placeholder.
    pub fn display_text(&self) -> String {
        match self {
            Narrative::Generated { text, .. } => text.clone(),
            Narrative::Unavailable { reason } => format!("[AI unavailable: {}]", reason),
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Narrative::Generated { .. })
    }
}

/// Common output shape for every analytics module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisEnvelope<T> {
    /// Lookback window the payload was computed over.
    pub period_days: u32,
    pub generated_at: DateTime<Utc>,
    /// Always complete, whatever happened to the narrative.
    pub payload: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<Narrative>,
}

impl<T> AnalysisEnvelope<T> {
    pub fn new(period_days: u32, generated_at: DateTime<Utc>, payload: T) -> Self {
        Self {
            period_days,
            generated_at,
            payload,
            narrative: None,
        }
    }

    pub fn with_narrative(mut self, narrative: Option<Narrative>) -> Self {
        self.narrative = narrative;
        self
    }
}

/// Stock-out risk tier. Declaration order is the sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Critical,
    Soon,
    Normal,
}

impl Urgency {
    /// Classify by days of stock left.
    pub fn from_days_left(days_until_empty: f64) -> Self {
        if days_until_empty <= 2.0 {
            Urgency::Critical
        } else if days_until_empty <= 5.0 {
            Urgency::Soon
        } else {
            Urgency::Normal
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Urgency::Critical => "🔴",
            Urgency::Soon => "🟠",
            Urgency::Normal => "🟢",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Critical => write!(f, "critical"),
            Urgency::Soon => write!(f, "soon"),
            Urgency::Normal => write!(f, "normal"),
        }
    }
}

/// Restock suggestion for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastItem {
    pub product_id: String,
    pub product_name: String,
    pub current_stock: i64,
    pub min_stock: i64,
    /// Units per day over the lookback window, one decimal.
    pub daily_avg_sales: f64,
    /// Days of stock left at the current pace, one decimal; 999 when nothing sells.
    pub days_until_empty: f64,
    pub suggested_order_qty: i64,
    pub estimated_cost: f64,
    pub urgency: Urgency,
}

/// Payload of the demand forecast module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Forecast {
    pub items: Vec<ForecastItem>,
}

/// Alert categories produced by the smart alert checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowStock,
    SalesSpike,
    SalesDrop,
    HighVoidRate,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::LowStock => write!(f, "low_stock"),
            AlertKind::SalesSpike => write!(f, "sales_spike"),
            AlertKind::SalesDrop => write!(f, "sales_drop"),
            AlertKind::HighVoidRate => write!(f, "high_void_rate"),
        }
    }
}

/// Severity level of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

impl AlertSeverity {
    pub fn emoji(&self) -> &'static str {
        match self {
            AlertSeverity::Critical => "🔴",
            AlertSeverity::Warning => "🟡",
            AlertSeverity::Info => "🔵",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Critical => write!(f, "critical"),
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Info => write!(f, "info"),
        }
    }
}

/// A single actionable alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
}

/// Payload of the smart alerts module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertReport {
    pub alert_count: usize,
    pub alerts: Vec<Alert>,
}

impl AlertReport {
    pub fn new(alerts: Vec<Alert>) -> Self {
        Self {
            alert_count: alerts.len(),
            alerts,
        }
    }
}

/// Two products bought in the same transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketPair {
    /// Lexicographically smaller product name.
    pub product_a: String,
    pub product_b: String,
    pub times_bought_together: usize,
}

/// Payload of the customer insights module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasketReport {
    pub min_occurrences: usize,
    pub frequently_bought_together: Vec<BasketPair>,
}

/// Payload of the business query module. The generated answer is the whole payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub question: String,
    pub answer: String,
    pub backend: Backend,
}

/// On/off state of one analytics module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,
    pub enabled: bool,
    pub description: String,
}

/// Snapshot of backend reachability and module switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiStatus {
    pub ai_enabled: bool,
    pub local_reachable: bool,
    /// Only present while the local backend answers.
    pub local_model: Option<String>,
    pub cloud_configured: bool,
    pub modules: Vec<ModuleDescriptor>,
}

/// Round to a fixed number of decimals for reporting.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
