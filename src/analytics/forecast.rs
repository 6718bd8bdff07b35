//! Demand forecasting: restock suggestions from recent sales velocity.

use super::{narrate, window_start, AnalyticsError};
use crate::config::Config;
use crate::gateway::{GenerationRequest, TextGenerator};
use crate::models::{round_to, AnalysisEnvelope, Forecast, ForecastItem, Urgency};
use crate::store::{ProductVelocity, SalesStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Days of supply a suggested order aims for.
const TARGET_SUPPLY_DAYS: f64 = 14.0;

/// Days-until-empty reported for products that are not selling.
pub const NEVER_EMPTY_DAYS: f64 = 999.0;

/// Products included in the narrative prompt.
const PROMPT_PRODUCT_LIMIT: usize = 20;

pub struct DemandForecast {
    store: Arc<dyn SalesStore>,
    generator: Arc<dyn TextGenerator>,
    narrative_enabled: bool,
    default_days: u32,
    language: String,
    currency: String,
}

impl DemandForecast {
    pub fn new(store: Arc<dyn SalesStore>, generator: Arc<dyn TextGenerator>, config: &Config) -> Self {
        Self {
            store,
            generator,
            narrative_enabled: config.modules.demand_forecast,
            default_days: config.windows.forecast_days,
            language: config.general.language.clone(),
            currency: config.general.currency.clone(),
        }
    }

    /// Restock suggestions over the last `days` (or the configured default).
    pub async fn run(&self, days: Option<u32>) -> Result<AnalysisEnvelope<Forecast>, AnalyticsError> {
        self.run_at(days, Utc::now()).await
    }

    pub async fn run_at(
        &self,
        days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<AnalysisEnvelope<Forecast>, AnalyticsError> {
        let days = days.unwrap_or(self.default_days);
        let since = window_start(now, i64::from(days))?;
        let rows = self.store.product_velocity(since).await?;
        info!("Forecasting {} products over {} days", rows.len(), days);

        let mut items: Vec<ForecastItem> = rows.iter().map(|row| forecast_item(row, days)).collect();
        sort_by_urgency(&mut items);

        let narrative = if self.narrative_enabled && !items.is_empty() {
            let request = self.narrative_request(&rows, days);
            debug!("Forecast prompt is {} chars", request.prompt.len());
            Some(narrate(self.generator.as_ref(), "demand_forecast", request).await)
        } else {
            None
        };

        Ok(AnalysisEnvelope::new(days, now, Forecast { items }).with_narrative(narrative))
    }

    fn narrative_request(&self, rows: &[ProductVelocity], days: u32) -> GenerationRequest {
        let mut best_sellers: Vec<&ProductVelocity> = rows.iter().collect();
        best_sellers.sort_by(|a, b| b.total_sold.cmp(&a.total_sold));

        let lines: Vec<String> = best_sellers
            .into_iter()
            .take(PROMPT_PRODUCT_LIMIT)
            .map(|row| {
                let item = forecast_item(row, days);
                format!(
                    "- {}: stock={}, daily sales={:.1}, days left={:.0}, order={} units",
                    row.name,
                    row.stock,
                    item.daily_avg_sales,
                    item.days_until_empty,
                    item.suggested_order_qty
                )
            })
            .collect();

        let prompt = format!(
            "Analyze this inventory data from the last {} days and give prioritized \
             restocking recommendations:\n\n{}\n\nGive an executive summary with the 5 most \
             urgent actions.",
            days,
            lines.join("\n")
        );

        GenerationRequest::new(prompt).with_system(format!(
            "You are a demand forecasting assistant for a convenience store. \
             You analyze sales data and predict restocking needs. \
             Always respond in {}. Be concise and actionable. Use bullet points. \
             Format currency as {}.",
            self.language, self.currency
        ))
    }
}

/// Compute the restock suggestion for one product.
pub fn forecast_item(row: &ProductVelocity, lookback_days: u32) -> ForecastItem {
    let daily_avg = row.total_sold as f64 / f64::from(lookback_days.max(1));

    let days_until_empty = if daily_avg > 0.0 {
        row.stock as f64 / daily_avg
    } else {
        NEVER_EMPTY_DAYS
    };

    let target = (daily_avg * TARGET_SUPPLY_DAYS).round() as i64;
    let suggested_order_qty = (target - row.stock).max(0);

    ForecastItem {
        product_id: row.product_id.clone(),
        product_name: row.name.clone(),
        current_stock: row.stock,
        min_stock: row.min_stock,
        daily_avg_sales: round_to(daily_avg, 1),
        days_until_empty: round_to(days_until_empty, 1),
        suggested_order_qty,
        estimated_cost: round_to(suggested_order_qty as f64 * row.cost, 2),
        urgency: Urgency::from_days_left(days_until_empty),
    }
}

/// Most urgent first; fastest sellers first within a tier.
pub fn sort_by_urgency(items: &mut [ForecastItem]) {
    items.sort_by(|a, b| {
        a.urgency
            .cmp(&b.urgency)
            .then_with(|| {
                b.daily_avg_sales
                    .partial_cmp(&a.daily_avg_sales)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
}
