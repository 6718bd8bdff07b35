//! Smart alerts: low stock, sales anomalies and void rate.
//!
//! The three checks are pure functions over data the module gathers up
//! front, and always run in the same order.

use super::{format_money, narrate, window_start, AnalyticsError};
use crate::config::{AlertThresholds, Config};
use crate::gateway::{GenerationRequest, TextGenerator};
use crate::models::{Alert, AlertKind, AlertReport, AlertSeverity, AnalysisEnvelope};
use crate::store::{SaleCounts, SalesStore, StockLevel};
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Revenue figures for the anomaly check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevenueSnapshot {
    /// Completed revenue over the baseline window, excluding today.
    pub baseline_total: f64,
    pub baseline_days: i64,
    pub today_revenue: f64,
    /// Hours since midnight.
    pub elapsed_hours: f64,
}

pub struct SmartAlerts {
    store: Arc<dyn SalesStore>,
    generator: Arc<dyn TextGenerator>,
    narrative_enabled: bool,
    thresholds: AlertThresholds,
    store_name: String,
    language: String,
    currency_symbol: String,
}

impl SmartAlerts {
    pub fn new(store: Arc<dyn SalesStore>, generator: Arc<dyn TextGenerator>, config: &Config) -> Self {
        Self {
            store,
            generator,
            narrative_enabled: config.modules.smart_alerts,
            thresholds: config.alerts.clone(),
            store_name: config.general.store_name.clone(),
            language: config.general.language.clone(),
            currency_symbol: config.general.currency_symbol.clone(),
        }
    }

    /// Run every check against the current data.
    pub async fn run(&self) -> Result<AnalysisEnvelope<AlertReport>, AnalyticsError> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<AnalysisEnvelope<AlertReport>, AnalyticsError> {
        let low_stock = self.store.low_stock_products().await?;
        let revenue = self.revenue_snapshot(now).await?;
        let counts = self
            .store
            .sale_counts(window_start(now, self.thresholds.void_window_days)?)
            .await?;

        let mut alerts = check_low_stock(&low_stock);
        alerts.extend(check_sales_anomaly(&revenue, &self.thresholds, &self.currency_symbol));
        alerts.extend(check_void_rate(counts, &self.thresholds));
        info!("Smart alerts raised {} alerts", alerts.len());

        let narrative = if self.narrative_enabled && !alerts.is_empty() {
            Some(narrate(self.generator.as_ref(), "smart_alerts", self.narrative_request(&alerts)).await)
        } else {
            None
        };

        // Widest window any check read from, normally the revenue baseline.
        let period_days = self.thresholds.baseline_days.max(self.thresholds.void_window_days) as u32;
        Ok(AnalysisEnvelope::new(period_days, now, AlertReport::new(alerts)).with_narrative(narrative))
    }

    async fn revenue_snapshot(&self, now: DateTime<Utc>) -> Result<RevenueSnapshot, AnalyticsError> {
        let today_start = start_of_day(now);
        let baseline_start = window_start(today_start, self.thresholds.baseline_days)?;

        let baseline_total = self
            .store
            .completed_revenue(baseline_start, Some(today_start))
            .await?;
        let today_revenue = self.store.completed_revenue(today_start, None).await?;
        let elapsed_hours = (now - today_start).num_seconds() as f64 / 3600.0;

        let snapshot = RevenueSnapshot {
            baseline_total,
            baseline_days: self.thresholds.baseline_days,
            today_revenue,
            elapsed_hours,
        };
        debug!("Revenue snapshot: {:?}", snapshot);
        Ok(snapshot)
    }

    fn narrative_request(&self, alerts: &[Alert]) -> GenerationRequest {
        let alert_text: Vec<String> = alerts
            .iter()
            .map(|a| format!("[{}] {}: {}", a.severity, a.title, a.detail))
            .collect();

        let prompt = format!(
            "These are the current alerts for the store {}:\n\n{}\n\n\
             Give a brief executive summary with recommended actions, prioritized by urgency.",
            self.store_name,
            alert_text.join("\n")
        );

        GenerationRequest::new(prompt).with_system(format!(
            "You are a management assistant for convenience stores. \
             Respond in {}, be concise and actionable.",
            self.language
        ))
    }
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN))
}

/// One alert per active product at or below its minimum stock.
pub fn check_low_stock(products: &[StockLevel]) -> Vec<Alert> {
    products
        .iter()
        .map(|p| {
            let out_of_stock = p.stock == 0;
            Alert {
                kind: AlertKind::LowStock,
                severity: if out_of_stock {
                    AlertSeverity::Critical
                } else {
                    AlertSeverity::Warning
                },
                title: format!(
                    "{}: {}",
                    if out_of_stock { "Out of stock" } else { "Low stock" },
                    p.name
                ),
                detail: format!("Current stock: {}, minimum: {}", p.stock, p.min_stock),
                product_id: Some(p.product_id.clone()),
            }
        })
        .collect()
}

/// Compare today's projected revenue with the daily baseline.
pub fn check_sales_anomaly(
    revenue: &RevenueSnapshot,
    thresholds: &AlertThresholds,
    currency_symbol: &str,
) -> Vec<Alert> {
    let avg_daily = if revenue.baseline_days > 0 {
        revenue.baseline_total / revenue.baseline_days as f64
    } else {
        0.0
    };
    if avg_daily <= 0.0 {
        return Vec::new();
    }

    let elapsed_hours = revenue.elapsed_hours.max(1.0);
    let projected = revenue.today_revenue * (thresholds.operating_hours / elapsed_hours);
    let ratio = projected / avg_daily;

    let comparison = format!(
        "Projected sales today: {} vs average {}",
        format_money(currency_symbol, projected, 0),
        format_money(currency_symbol, avg_daily, 0)
    );

    if ratio > thresholds.spike_ratio {
        vec![Alert {
            kind: AlertKind::SalesSpike,
            severity: AlertSeverity::Info,
            title: "Sales spike detected".to_string(),
            detail: format!("{} ({:.1}x the average)", comparison, ratio),
            product_id: None,
        }]
    } else if ratio < thresholds.drop_ratio && elapsed_hours >= thresholds.drop_min_hours {
        vec![Alert {
            kind: AlertKind::SalesDrop,
            severity: AlertSeverity::Warning,
            title: "Sales below average".to_string(),
            detail: format!("{} ({:.1}% of the average)", comparison, ratio * 100.0),
            product_id: None,
        }]
    } else {
        Vec::new()
    }
}

/// Flag an unusual share of voided sales.
pub fn check_void_rate(counts: SaleCounts, thresholds: &AlertThresholds) -> Vec<Alert> {
    if counts.total < thresholds.void_min_sales || counts.total == 0 {
        return Vec::new();
    }

    let rate = counts.voided as f64 / counts.total as f64;
    if rate <= thresholds.void_rate {
        return Vec::new();
    }

    vec![Alert {
        kind: AlertKind::HighVoidRate,
        severity: AlertSeverity::Warning,
        title: "High void rate".to_string(),
        detail: format!(
            "{} voids out of {} sales ({:.1}%) in the last {}h",
            counts.voided,
            counts.total,
            rate * 100.0,
            thresholds.void_window_days * 24
        ),
        product_id: None,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testing::ScriptedGenerator;
    use crate::gateway::GatewayError;
    use crate::models::Narrative;
    use crate::store::snapshot::fixtures::{item, product, sale};
    use crate::store::{SaleStatus, Snapshot, SnapshotStore};
    use chrono::Duration;

    fn level(id: &str, stock: i64, min_stock: i64) -> StockLevel {
        StockLevel {
            product_id: id.to_string(),
            name: format!("Product {}", id),
            stock,
            min_stock,
        }
    }

    fn revenue(baseline_total: f64, today_revenue: f64, elapsed_hours: f64) -> RevenueSnapshot {
        RevenueSnapshot {
            baseline_total,
            baseline_days: 7,
            today_revenue,
            elapsed_hours,
        }
    }

    #[test]
    fn test_low_stock_severity() {
        let alerts = check_low_stock(&[level("a", 0, 5), level("b", 3, 5)]);

        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        assert!(alerts[0].title.starts_with("Out of stock"));
        assert_eq!(alerts[1].severity, AlertSeverity::Warning);
        assert_eq!(alerts[1].product_id.as_deref(), Some("b"));
    }

    #[test]
    fn test_spike_detected() {
        // Average 1,000/day; 1,500 by 7h projects to 3,000.
        let alerts = check_sales_anomaly(&revenue(7000.0, 1500.0, 7.0), &AlertThresholds::default(), "$");

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::SalesSpike);
        assert_eq!(alerts[0].severity, AlertSeverity::Info);
        assert!(alerts[0].detail.contains("$3,000"));
    }

    #[test]
    fn test_drop_needs_four_hours() {
        let thresholds = AlertThresholds::default();

        let early = check_sales_anomaly(&revenue(7000.0, 10.0, 3.0), &thresholds, "$");
        assert!(early.is_empty());

        let later = check_sales_anomaly(&revenue(7000.0, 10.0, 4.0), &thresholds, "$");
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].kind, AlertKind::SalesDrop);
        assert_eq!(later[0].severity, AlertSeverity::Warning);
    }

    #[test]
    fn test_ratio_boundaries_are_strict() {
        let thresholds = AlertThresholds::default();

        // Average 1,000/day; 1,000 by 7h projects to exactly 2.0x.
        let at_spike = check_sales_anomaly(&revenue(7000.0, 1000.0, 7.0), &thresholds, "$");
        assert!(at_spike.is_empty());

        // 300 by 14h is exactly 0.3x.
        let at_drop = check_sales_anomaly(&revenue(7000.0, 300.0, 14.0), &thresholds, "$");
        assert!(at_drop.is_empty());

        let below_drop = check_sales_anomaly(&revenue(7000.0, 290.0, 14.0), &thresholds, "$");
        assert_eq!(below_drop[0].kind, AlertKind::SalesDrop);
    }

    #[test]
    fn test_no_baseline_no_anomaly() {
        let alerts = check_sales_anomaly(&revenue(0.0, 5000.0, 2.0), &AlertThresholds::default(), "$");
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_elapsed_hours_floor_of_one() {
        // At 00:15 the projection uses one hour, not a quarter: 100 * 14 = 1,400.
        let alerts = check_sales_anomaly(&revenue(7000.0, 100.0, 0.25), &AlertThresholds::default(), "$");
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_void_rate_boundary() {
        let thresholds = AlertThresholds::default();

        let fires = check_void_rate(SaleCounts { total: 10, voided: 1 }, &thresholds);
        assert_eq!(fires.len(), 1);
        assert_eq!(fires[0].kind, AlertKind::HighVoidRate);

        let too_few = check_void_rate(SaleCounts { total: 9, voided: 1 }, &thresholds);
        assert!(too_few.is_empty());

        let at_threshold = check_void_rate(SaleCounts { total: 20, voided: 1 }, &thresholds);
        assert!(at_threshold.is_empty());
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = AlertThresholds {
            void_min_sales: 5,
            ..AlertThresholds::default()
        };
        assert_eq!(check_void_rate(SaleCounts { total: 5, voided: 1 }, &thresholds).len(), 1);
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 12, 10, 0, 0).unwrap()
    }

    /// Low stock on one product, a sales spike, and 2 voids out of 10 sales today.
    fn busy_store() -> Arc<SnapshotStore> {
        let mut sales = vec![sale(
            "baseline",
            SaleStatus::Completed,
            now() - Duration::days(3),
            vec![item("p1", "Refresco", 100, 700.0)],
        )];
        for i in 0..8 {
            sales.push(sale(
                &format!("today-{}", i),
                SaleStatus::Completed,
                now() - Duration::minutes(30 + i),
                vec![item("p1", "Refresco", 5, 50.0)],
            ));
        }
        for i in 0..2 {
            sales.push(sale(
                &format!("void-{}", i),
                SaleStatus::Voided,
                now() - Duration::minutes(5 + i),
                vec![item("p1", "Refresco", 1, 10.0)],
            ));
        }

        Arc::new(SnapshotStore::new(Snapshot {
            products: vec![
                product("p1", "Refresco", 2, 10, 7.0),
                product("p2", "Galletas", 40, 10, 5.0),
            ],
            sales,
        }))
    }

    #[tokio::test]
    async fn test_run_orders_checks() {
        let generator = Arc::new(ScriptedGenerator::answering("unused"));
        let module = SmartAlerts::new(busy_store(), generator.clone(), &Config::default());

        let envelope = module.run_at(now()).await.unwrap();
        let kinds: Vec<AlertKind> = envelope.payload.alerts.iter().map(|a| a.kind).collect();

        assert_eq!(
            kinds,
            vec![AlertKind::LowStock, AlertKind::SalesSpike, AlertKind::HighVoidRate]
        );
        assert_eq!(envelope.payload.alert_count, 3);
        assert_eq!(envelope.period_days, 7);
        assert!(envelope.narrative.is_none());
        assert!(generator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_narrative_failure_keeps_alerts() {
        let mut config = Config::default();
        config.modules.smart_alerts = true;
        let generator = Arc::new(ScriptedGenerator::failing(GatewayError::Configuration(
            "AI is disabled".to_string(),
        )));
        let module = SmartAlerts::new(busy_store(), generator.clone(), &config);

        let envelope = module.run_at(now()).await.unwrap();

        assert_eq!(envelope.payload.alerts.len(), 3);
        match envelope.narrative {
            Some(Narrative::Unavailable { reason }) => assert!(reason.contains("AI is disabled")),
            other => panic!("expected unavailable narrative, got {:?}", other),
        }
        let prompt = &generator.requests()[0].prompt;
        assert!(prompt.contains("[warning] Low stock: Refresco"));
        assert!(prompt.contains("[info] Sales spike detected"));
    }

    #[tokio::test]
    async fn test_oversized_alert_window_is_rejected() {
        let mut config = Config::default();
        config.alerts.baseline_days = i64::MAX;
        let generator = Arc::new(ScriptedGenerator::answering("unused"));
        let module = SmartAlerts::new(busy_store(), generator, &config);

        assert!(matches!(
            module.run_at(now()).await,
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_quiet_store_has_no_alerts_and_no_narrative() {
        let mut config = Config::default();
        config.modules.smart_alerts = true;
        let generator = Arc::new(ScriptedGenerator::answering("unused"));
        let quiet = Arc::new(SnapshotStore::new(Snapshot {
            products: vec![product("p2", "Galletas", 40, 10, 5.0)],
            sales: vec![],
        }));
        let module = SmartAlerts::new(quiet, generator.clone(), &config);

        let envelope = module.run_at(now()).await.unwrap();

        assert!(envelope.payload.alerts.is_empty());
        assert!(envelope.narrative.is_none());
        assert!(generator.requests().is_empty());
    }
}
