//! Business questions answered over a digest of recent sales.

use super::{format_money, window_start, AnalyticsError};
use crate::config::Config;
use crate::gateway::{GenerationRequest, TextGenerator};
use crate::models::{AnalysisEnvelope, QueryAnswer};
use crate::store::{HourlyCount, ProductRevenue, SalesStore, SalesTotals, StockLevel, WeekdayRevenue};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Products listed in the digest.
const TOP_PRODUCTS: usize = 15;

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Everything the digest is built from.
#[derive(Debug, Clone, Default)]
pub struct DigestData {
    pub totals: SalesTotals,
    pub top_products: Vec<ProductRevenue>,
    pub by_weekday: Vec<WeekdayRevenue>,
    pub by_hour: Vec<HourlyCount>,
    pub low_stock: Vec<StockLevel>,
}

pub struct BusinessQuery {
    store: Arc<dyn SalesStore>,
    generator: Arc<dyn TextGenerator>,
    enabled: bool,
    default_days: u32,
    store_name: String,
    language: String,
    currency: String,
    currency_symbol: String,
}

impl BusinessQuery {
    pub fn new(store: Arc<dyn SalesStore>, generator: Arc<dyn TextGenerator>, config: &Config) -> Self {
        Self {
            store,
            generator,
            enabled: config.modules.insights,
            default_days: config.windows.query_days,
            store_name: config.general.store_name.clone(),
            language: config.general.language.clone(),
            currency: config.general.currency.clone(),
            currency_symbol: config.general.currency_symbol.clone(),
        }
    }

    /// Answer a free-text question about the last `days` of sales.
    ///
    /// Generation failures are returned as [`AnalyticsError::Unavailable`]:
    /// there is nothing to show without the answer.
    pub async fn ask(
        &self,
        question: &str,
        days: Option<u32>,
        force_cloud: bool,
    ) -> Result<AnalysisEnvelope<QueryAnswer>, AnalyticsError> {
        self.ask_at(question, days, force_cloud, Utc::now()).await
    }

    pub async fn ask_at(
        &self,
        question: &str,
        days: Option<u32>,
        force_cloud: bool,
        now: DateTime<Utc>,
    ) -> Result<AnalysisEnvelope<QueryAnswer>, AnalyticsError> {
        if !self.enabled {
            return Err(AnalyticsError::ModuleDisabled("insights"));
        }
        let question = question.trim();
        if question.is_empty() {
            return Err(AnalyticsError::InvalidInput("question must not be empty".to_string()));
        }
        let days = days.unwrap_or(self.default_days);
        let since = window_start(now, i64::from(days))?;

        let data = self.gather(since).await?;
        let digest = build_digest(&data, days, &self.store_name, &self.currency_symbol, &self.currency);
        debug!("Business digest is {} chars", digest.len());

        let prompt = format!(
            "Using the following store data:\n\n{}\n\nUser question: {}\n\n\
             Answer clearly and concisely, with specific figures.",
            digest, question
        );
        let request = GenerationRequest::new(prompt)
            .with_system(format!(
                "You are a business intelligence assistant for a chain of convenience stores. \
                 You receive sales data and answer questions about it clearly and concisely. \
                 Always respond in {}. Use tables when comparing data. Format currency as {} {}. \
                 Be specific with numbers: give units and amounts, not just \"sold well\".",
                self.language, self.currency_symbol, self.currency
            ))
            .with_force_cloud(force_cloud);

        let generation = self.generator.generate(&request).await?;
        info!("Business question answered by {} backend", generation.backend);

        let answer = QueryAnswer {
            question: question.to_string(),
            answer: generation.text,
            backend: generation.backend,
        };
        Ok(AnalysisEnvelope::new(days, now, answer))
    }

    async fn gather(&self, since: DateTime<Utc>) -> Result<DigestData, AnalyticsError> {
        let (totals, top_products, by_weekday, by_hour, low_stock) = futures::try_join!(
            self.store.completed_totals(since),
            self.store.top_products_by_revenue(since, TOP_PRODUCTS),
            self.store.revenue_by_weekday(since),
            self.store.transactions_by_hour(since),
            self.store.low_stock_products(),
        )?;

        Ok(DigestData {
            totals,
            top_products,
            by_weekday,
            by_hour,
            low_stock,
        })
    }
}

/// Render the fixed-shape text digest handed to the model.
pub fn build_digest(data: &DigestData, days: u32, store_name: &str, symbol: &str, currency: &str) -> String {
    let average_ticket = if data.totals.transactions > 0 {
        data.totals.revenue / data.totals.transactions as f64
    } else {
        0.0
    };

    let mut lines = vec![
        format!("SALES DATA: last {} days (store: {})", days, store_name),
        format!("Total transactions: {}", data.totals.transactions),
        format!("Total revenue: {} {}", format_money(symbol, data.totals.revenue, 2), currency),
        format!("Average ticket: {} {}", format_money(symbol, average_ticket, 2), currency),
        String::new(),
        "TOP PRODUCTS BY REVENUE:".to_string(),
    ];
    for p in &data.top_products {
        lines.push(format!(
            "  - {}: {} units, {}",
            p.product_name,
            p.quantity,
            format_money(symbol, p.revenue, 2)
        ));
    }

    lines.push(String::new());
    lines.push("SALES BY DAY OF WEEK:".to_string());
    for d in &data.by_weekday {
        let name = WEEKDAY_NAMES
            .get(d.weekday as usize)
            .map(|n| n.to_string())
            .unwrap_or_else(|| d.weekday.to_string());
        lines.push(format!(
            "  - {}: {} txns, {}",
            name,
            d.transactions,
            format_money(symbol, d.revenue, 2)
        ));
    }

    lines.push(String::new());
    lines.push("SALES BY HOUR:".to_string());
    for h in &data.by_hour {
        lines.push(format!("  - {:02}:00: {} transactions", h.hour, h.transactions));
    }

    if !data.low_stock.is_empty() {
        lines.push(String::new());
        lines.push("LOW STOCK PRODUCTS:".to_string());
        for p in &data.low_stock {
            lines.push(format!("  - {}: {} units (min: {})", p.name, p.stock, p.min_stock));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testing::ScriptedGenerator;
    use crate::gateway::GatewayError;
    use crate::models::Backend;
    use crate::store::snapshot::fixtures::{item, product, sale};
    use crate::store::{SaleStatus, Snapshot, SnapshotStore};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        // Wednesday
        Utc.with_ymd_and_hms(2024, 6, 12, 20, 0, 0).unwrap()
    }

    fn store() -> Arc<SnapshotStore> {
        Arc::new(SnapshotStore::new(Snapshot {
            products: vec![
                product("p1", "Tortillas", 1, 5, 15.0),
                product("p2", "Refresco", 50, 10, 12.0),
            ],
            sales: vec![
                sale(
                    "s1",
                    SaleStatus::Completed,
                    Utc.with_ymd_and_hms(2024, 6, 10, 9, 30, 0).unwrap(),
                    vec![item("p2", "Refresco", 10, 1800.0)],
                ),
                sale(
                    "s2",
                    SaleStatus::Completed,
                    Utc.with_ymd_and_hms(2024, 6, 12, 9, 45, 0).unwrap(),
                    vec![item("p1", "Tortillas", 2, 40.0), item("p2", "Refresco", 1, 18.0)],
                ),
            ],
        }))
    }

    fn config(enabled: bool) -> Config {
        let mut config = Config::default();
        config.modules.insights = enabled;
        config
    }

    #[test]
    fn test_digest_shape() {
        let data = DigestData {
            totals: SalesTotals {
                transactions: 4,
                revenue: 12000.0,
            },
            top_products: vec![ProductRevenue {
                product_name: "Refresco".to_string(),
                quantity: 300,
                revenue: 5400.0,
            }],
            by_weekday: vec![WeekdayRevenue {
                weekday: 5,
                transactions: 4,
                revenue: 12000.0,
            }],
            by_hour: vec![HourlyCount {
                hour: 8,
                transactions: 4,
            }],
            low_stock: vec![],
        };

        let digest = build_digest(&data, 7, "Tienda Centro", "$", "MXN");

        assert!(digest.starts_with("SALES DATA: last 7 days (store: Tienda Centro)"));
        assert!(digest.contains("Total revenue: $12,000.00 MXN"));
        assert!(digest.contains("Average ticket: $3,000.00 MXN"));
        assert!(digest.contains("  - Refresco: 300 units, $5,400.00"));
        assert!(digest.contains("  - Friday: 4 txns, $12,000.00"));
        assert!(digest.contains("  - 08:00: 4 transactions"));
        assert!(!digest.contains("LOW STOCK"));
    }

    #[test]
    fn test_empty_digest_has_zero_ticket() {
        let digest = build_digest(&DigestData::default(), 7, "Tienda", "$", "MXN");
        assert!(digest.contains("Total transactions: 0"));
        assert!(digest.contains("Average ticket: $0.00 MXN"));
    }

    #[tokio::test]
    async fn test_ask_builds_prompt_and_forwards_force_cloud() {
        let generator = Arc::new(ScriptedGenerator::answering("Refresco fue el más vendido"));
        let module = BusinessQuery::new(store(), generator.clone(), &config(true));

        let envelope = module
            .ask_at("¿Qué se vendió más?", None, true, now())
            .await
            .unwrap();

        assert_eq!(envelope.period_days, 7);
        assert_eq!(envelope.payload.answer, "Refresco fue el más vendido");
        assert_eq!(envelope.payload.backend, Backend::Local);

        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].force_cloud);
        let prompt = &requests[0].prompt;
        assert!(prompt.contains("User question: ¿Qué se vendió más?"));
        assert!(prompt.contains("Total transactions: 2"));
        assert!(prompt.contains("  - Monday: 1 txns, $1,800.00"));
        assert!(prompt.contains("  - 09:00: 2 transactions"));
        assert!(prompt.contains("  - Tortillas: 1 units (min: 5)"));
    }

    #[tokio::test]
    async fn test_gateway_failure_is_surfaced() {
        let generator = Arc::new(ScriptedGenerator::failing(GatewayError::NoBackendAvailable));
        let module = BusinessQuery::new(store(), generator, &config(true));

        let err = module.ask_at("¿Ventas?", None, false, now()).await.unwrap_err();

        assert!(matches!(
            err,
            AnalyticsError::Unavailable(GatewayError::NoBackendAvailable)
        ));
    }

    #[tokio::test]
    async fn test_disabled_module_makes_no_calls() {
        let generator = Arc::new(ScriptedGenerator::answering("unused"));
        let module = BusinessQuery::new(store(), generator.clone(), &config(false));

        let err = module.ask_at("¿Ventas?", None, false, now()).await.unwrap_err();

        assert!(matches!(err, AnalyticsError::ModuleDisabled("insights")));
        assert!(generator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_window_is_rejected() {
        let generator = Arc::new(ScriptedGenerator::answering("unused"));
        let module = BusinessQuery::new(store(), generator.clone(), &config(true));

        assert!(matches!(
            module.ask_at("¿Ventas?", Some(u32::MAX), false, now()).await,
            Err(AnalyticsError::InvalidInput(_))
        ));
        assert!(generator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected() {
        let generator = Arc::new(ScriptedGenerator::answering("unused"));
        let module = BusinessQuery::new(store(), generator, &config(true));

        assert!(matches!(
            module.ask_at("   ", None, false, now()).await,
            Err(AnalyticsError::InvalidInput(_))
        ));
    }
}
