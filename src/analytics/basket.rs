//! Customer insights: which products end up in the same basket.

use super::{narrate, window_start, AnalyticsError};
use crate::config::Config;
use crate::gateway::{GenerationRequest, TextGenerator};
use crate::models::{AnalysisEnvelope, BasketPair, BasketReport};
use crate::store::{Basket, SalesStore};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::info;

/// Pairs kept before the minimum-occurrence filter.
const TOP_PAIRS: usize = 20;

/// Pairs shown to the model when asking for promotions.
const PROMPT_PAIR_LIMIT: usize = 15;

pub struct CustomerInsights {
    store: Arc<dyn SalesStore>,
    generator: Arc<dyn TextGenerator>,
    narrative_enabled: bool,
    default_days: u32,
    default_min_occurrences: usize,
    store_name: String,
    language: String,
    currency: String,
}

impl CustomerInsights {
    pub fn new(store: Arc<dyn SalesStore>, generator: Arc<dyn TextGenerator>, config: &Config) -> Self {
        Self {
            store,
            generator,
            narrative_enabled: config.modules.customer_insights,
            default_days: config.windows.customer_days,
            default_min_occurrences: config.windows.min_occurrences,
            store_name: config.general.store_name.clone(),
            language: config.general.language.clone(),
            currency: config.general.currency.clone(),
        }
    }

    /// Frequently-bought-together pairs, with promotion ideas when enabled.
    pub async fn run(
        &self,
        days: Option<u32>,
        min_occurrences: Option<usize>,
    ) -> Result<AnalysisEnvelope<BasketReport>, AnalyticsError> {
        self.run_at(days, min_occurrences, Utc::now()).await
    }

    pub async fn run_at(
        &self,
        days: Option<u32>,
        min_occurrences: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<AnalysisEnvelope<BasketReport>, AnalyticsError> {
        let days = days.unwrap_or(self.default_days);
        let since = window_start(now, i64::from(days))?;
        let min_occurrences = min_occurrences.unwrap_or(self.default_min_occurrences);

        let baskets = self
            .store
            .completed_baskets(since)
            .await?;
        let pairs = top_pairs(count_pairs(&baskets), TOP_PAIRS, min_occurrences);
        info!(
            "Basket analysis over {} transactions found {} pairs",
            baskets.len(),
            pairs.len()
        );

        let narrative = if self.narrative_enabled && !pairs.is_empty() {
            Some(narrate(self.generator.as_ref(), "customer_insights", self.narrative_request(&pairs, days)).await)
        } else {
            None
        };

        let report = BasketReport {
            min_occurrences,
            frequently_bought_together: pairs,
        };
        Ok(AnalysisEnvelope::new(days, now, report).with_narrative(narrative))
    }

    fn narrative_request(&self, pairs: &[BasketPair], days: u32) -> GenerationRequest {
        let pairs_text: Vec<String> = pairs
            .iter()
            .take(PROMPT_PAIR_LIMIT)
            .map(|p| format!("- {} + {}: {} times", p.product_a, p.product_b, p.times_bought_together))
            .collect();

        let prompt = format!(
            "These are the products frequently bought together at the store {} \
             (last {} days):\n\n{}\n\nSuggest 3-5 promotions or bundles based on these \
             patterns. Include the suggested bundle price and the savings for the customer.",
            self.store_name,
            days,
            pairs_text.join("\n")
        );

        GenerationRequest::new(prompt).with_system(format!(
            "You are a merchandising expert for convenience stores. \
             Respond in {}. Be specific with prices in {}.",
            self.language, self.currency
        ))
    }
}

/// Count every unordered pair of distinct products per basket.
pub fn count_pairs(baskets: &[Basket]) -> HashMap<(String, String), usize> {
    let mut counts: HashMap<(String, String), usize> = HashMap::new();

    for basket in baskets {
        let names: Vec<&str> = basket
            .product_names
            .iter()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if names.len() < 2 {
            continue;
        }

        for (i, first) in names.iter().enumerate() {
            for second in &names[i + 1..] {
                *counts
                    .entry((first.to_string(), second.to_string()))
                    .or_default() += 1;
            }
        }
    }

    counts
}

/// Highest counts first, ties in name order; cut to `limit`, then drop rare pairs.
pub fn top_pairs(
    counts: HashMap<(String, String), usize>,
    limit: usize,
    min_occurrences: usize,
) -> Vec<BasketPair> {
    let mut ranked: Vec<((String, String), usize)> = counts.into_iter().collect();
    ranked.sort_by(|(pair_a, count_a), (pair_b, count_b)| {
        count_b.cmp(count_a).then_with(|| pair_a.cmp(pair_b))
    });

    ranked
        .into_iter()
        .take(limit)
        .filter(|(_, count)| *count >= min_occurrences)
        .map(|((product_a, product_b), times_bought_together)| BasketPair {
            product_a,
            product_b,
            times_bought_together,
        })
        .collect()
}
