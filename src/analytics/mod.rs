//! Analytics modules.
//!
//! Each module reads a fresh data snapshot, computes its structured payload,
//! and optionally asks the gateway for a narrative. Narrative failures never
//! fail forecasts, alerts or basket analysis; storage failures always do.

pub mod alerts;
pub mod basket;
pub mod forecast;
pub mod query;

pub use alerts::SmartAlerts;
pub use basket::CustomerInsights;
pub use forecast::DemandForecast;
pub use query::BusinessQuery;

use crate::gateway::{GatewayError, GenerationRequest, TextGenerator};
use crate::models::Narrative;
use crate::store::StoreError;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};

/// Why an analytics call failed as a whole.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Only business queries surface generation failures.
    #[error("AI unavailable: {0}")]
    Unavailable(#[from] GatewayError),

    #[error("module '{0}' is disabled")]
    ModuleDisabled(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Ask for a narrative, keeping a failure as a value.
pub(crate) async fn narrate(
    generator: &dyn TextGenerator,
    module: &str,
    request: GenerationRequest,
) -> Narrative {
    match generator.generate(&request).await {
        Ok(generation) => {
            info!("{} narrative generated by {} backend", module, generation.backend);
            Narrative::Generated {
                text: generation.text,
                backend: generation.backend,
            }
        }
        Err(e) => {
            warn!("{} narrative unavailable: {}", module, e);
            Narrative::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}

/// Longest lookback window any module accepts, in days.
pub const MAX_WINDOW_DAYS: i64 = 3650;

/// Start of a `days`-long window ending at `end`.
pub(crate) fn window_start(end: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>, AnalyticsError> {
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(AnalyticsError::InvalidInput(format!(
            "lookback window must be between 1 and {} days, got {}",
            MAX_WINDOW_DAYS, days
        )));
    }

    Duration::try_days(days)
        .and_then(|window| end.checked_sub_signed(window))
        .ok_or_else(|| {
            AnalyticsError::InvalidInput(format!("lookback window of {} days is out of range", days))
        })
}

/// Format an amount with thousands separators, e.g. `$12,345.60`.
pub fn format_money(symbol: &str, amount: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, amount.abs());
    let (whole, fraction) = match formatted.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && amount.abs() >= 0.5 * 10f64.powi(-(decimals as i32)) {
        "-"
    } else {
        ""
    };

    match fraction {
        Some(fraction) => format!("{}{}{}.{}", sign, symbol, grouped, fraction),
        None => format!("{}{}{}", sign, symbol, grouped),
    }
}
