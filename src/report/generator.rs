//! Markdown and JSON report generation.
//!
//! This module renders analysis envelopes and the AI status snapshot for the
//! command line.

use crate::analytics::format_money;
use crate::models::{
    AiStatus, AlertReport, AnalysisEnvelope, BasketReport, Forecast, Narrative, QueryAnswer,
};
use anyhow::Result;
use serde::Serialize;

/// A payload that knows how to render its own Markdown body.
pub trait MarkdownSection {
    /// Report title.
    fn title(&self) -> &'static str;

    /// Body rendered between the metadata and the narrative.
    fn markdown_body(&self, currency_symbol: &str) -> String;
}

/// Generate a complete Markdown report for an envelope.
pub fn generate_markdown_report<T: MarkdownSection>(
    envelope: &AnalysisEnvelope<T>,
    currency_symbol: &str,
) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", envelope.payload.title()));
    output.push_str(&format!(
        "- **Generated:** {}\n",
        envelope.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!("- **Period:** last {} days\n\n", envelope.period_days));

    output.push_str(&envelope.payload.markdown_body(currency_symbol));

    if let Some(ref narrative) = envelope.narrative {
        output.push_str(&generate_narrative_section(narrative));
    }

    output.push_str(&generate_footer());
    output
}

fn generate_narrative_section(narrative: &Narrative) -> String {
    let mut section = String::new();

    section.push_str("## AI Summary\n\n");
    match narrative {
        Narrative::Generated { text, backend } => {
            section.push_str(text.trim());
            section.push_str(&format!("\n\n*Generated by the {} backend.*\n\n", backend));
        }
        Narrative::Unavailable { .. } => {
            section.push_str(&format!("> ⚠️ {}\n\n", narrative.display_text()));
        }
    }

    section
}

impl MarkdownSection for Forecast {
    fn title(&self) -> &'static str {
        "Restock Forecast"
    }

    fn markdown_body(&self, currency_symbol: &str) -> String {
        let mut section = String::new();

        section.push_str("## Restock Suggestions\n\n");
        if self.items.is_empty() {
            section.push_str("No sales in this period.\n\n");
            return section;
        }

        section.push_str(
            "| Urgency | Product | Stock | Min | Daily Avg | Days Left | Order | Est. Cost |\n",
        );
        section.push_str("|:---|:---|:---:|:---:|:---:|:---:|:---:|---:|\n");
        for item in &self.items {
            section.push_str(&format!(
                "| {} {} | {} | {} | {} | {:.1} | {:.1} | {} | {} |\n",
                item.urgency.emoji(),
                item.urgency,
                item.product_name,
                item.current_stock,
                item.min_stock,
                item.daily_avg_sales,
                item.days_until_empty,
                item.suggested_order_qty,
                format_money(currency_symbol, item.estimated_cost, 2)
            ));
        }
        section.push('\n');

        let total: f64 = self.items.iter().map(|i| i.estimated_cost).sum();
        section.push_str(&format!(
            "**Total estimated cost:** {}\n\n",
            format_money(currency_symbol, total, 2)
        ));

        section
    }
}

impl MarkdownSection for AlertReport {
    fn title(&self) -> &'static str {
        "Smart Alerts"
    }

    fn markdown_body(&self, _currency_symbol: &str) -> String {
        let mut section = String::new();

        section.push_str(&format!("## Alerts ({})\n\n", self.alert_count));
        if self.alerts.is_empty() {
            section.push_str("No alerts. Everything looks normal. 🎉\n\n");
            return section;
        }

        for alert in &self.alerts {
            section.push_str(&format!(
                "- {} **{}** {}: {}\n",
                alert.severity.emoji(),
                alert.severity.to_string().to_uppercase(),
                alert.title,
                alert.detail
            ));
        }
        section.push('\n');

        section
    }
}

impl MarkdownSection for BasketReport {
    fn title(&self) -> &'static str {
        "Customer Insights"
    }

    fn markdown_body(&self, _currency_symbol: &str) -> String {
        let mut section = String::new();

        section.push_str("## Frequently Bought Together\n\n");
        if self.frequently_bought_together.is_empty() {
            section.push_str(&format!(
                "No product pairs bought together at least {} times.\n\n",
                self.min_occurrences
            ));
            return section;
        }

        section.push_str("| Product A | Product B | Times |\n");
        section.push_str("|:---|:---|:---:|\n");
        for pair in &self.frequently_bought_together {
            section.push_str(&format!(
                "| {} | {} | {} |\n",
                pair.product_a, pair.product_b, pair.times_bought_together
            ));
        }
        section.push('\n');

        section
    }
}

impl MarkdownSection for QueryAnswer {
    fn title(&self) -> &'static str {
        "Business Question"
    }

    fn markdown_body(&self, _currency_symbol: &str) -> String {
        format!(
            "## Question\n\n> {}\n\n## Answer\n\n{}\n\n*Answered by the {} backend.*\n\n",
            self.question,
            self.answer.trim(),
            self.backend
        )
    }
}

/// Generate the Markdown status page.
pub fn generate_status_markdown(status: &AiStatus) -> String {
    let mut output = String::new();

    let yes_no = |flag: bool| if flag { "✅" } else { "❌" };

    output.push_str("# AI Status\n\n");
    output.push_str(&format!("- **AI enabled:** {}\n", yes_no(status.ai_enabled)));
    output.push_str(&format!(
        "- **Local backend:** {}{}\n",
        yes_no(status.local_reachable),
        status
            .local_model
            .as_deref()
            .map(|m| format!(" (`{}`)", m))
            .unwrap_or_default()
    ));
    output.push_str(&format!(
        "- **Cloud backend configured:** {}\n\n",
        yes_no(status.cloud_configured)
    ));

    output.push_str("## Modules\n\n");
    output.push_str("| Module | Enabled | Description |\n");
    output.push_str("|:---|:---:|:---|\n");
    for module in &status.modules {
        output.push_str(&format!(
            "| `{}` | {} | {} |\n",
            module.name,
            yes_no(module.enabled),
            module.description
        ));
    }
    output.push('\n');

    output
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by store-insights*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Alert, AlertKind, AlertSeverity, Backend, BasketPair, ForecastItem, ModuleDescriptor,
        Urgency,
    };
    use chrono::{TimeZone, Utc};

    fn envelope<T>(payload: T) -> AnalysisEnvelope<T> {
        AnalysisEnvelope::new(14, Utc.with_ymd_and_hms(2024, 6, 12, 8, 0, 0).unwrap(), payload)
    }

    fn forecast() -> Forecast {
        Forecast {
            items: vec![ForecastItem {
                product_id: "p1".to_string(),
                product_name: "Leche".to_string(),
                current_stock: 2,
                min_stock: 5,
                daily_avg_sales: 2.0,
                days_until_empty: 1.0,
                suggested_order_qty: 26,
                estimated_cost: 1300.0,
                urgency: Urgency::Critical,
            }],
        }
    }

    #[test]
    fn test_forecast_markdown() {
        let markdown = generate_markdown_report(&envelope(forecast()), "$");

        assert!(markdown.starts_with("# Restock Forecast"));
        assert!(markdown.contains("2024-06-12 08:00:00 UTC"));
        assert!(markdown.contains("| 🔴 critical | Leche | 2 | 5 | 2.0 | 1.0 | 26 | $1,300.00 |"));
        assert!(markdown.contains("**Total estimated cost:** $1,300.00"));
        assert!(!markdown.contains("## AI Summary"));
    }

    #[test]
    fn test_unavailable_narrative_renders_placeholder() {
        let report = envelope(forecast()).with_narrative(Some(Narrative::Unavailable {
            reason: "no AI backend available".to_string(),
        }));
        let markdown = generate_markdown_report(&report, "$");

        assert!(markdown.contains("## AI Summary"));
        assert!(markdown.contains("[AI unavailable: no AI backend available]"));
    }

    #[test]
    fn test_alerts_markdown() {
        let report = envelope(AlertReport::new(vec![Alert {
            kind: AlertKind::LowStock,
            severity: AlertSeverity::Critical,
            title: "Out of stock: Pan".to_string(),
            detail: "Current stock: 0, minimum: 3".to_string(),
            product_id: Some("p3".to_string()),
        }]))
        .with_narrative(Some(Narrative::Generated {
            text: "Resurtir pan".to_string(),
            backend: Backend::Cloud,
        }));
        let markdown = generate_markdown_report(&report, "$");

        assert!(markdown.contains("## Alerts (1)"));
        assert!(markdown.contains("🔴 **CRITICAL** Out of stock: Pan"));
        assert!(markdown.contains("Resurtir pan"));
        assert!(markdown.contains("Generated by the cloud backend"));
    }

    #[test]
    fn test_basket_markdown() {
        let report = envelope(BasketReport {
            min_occurrences: 3,
            frequently_bought_together: vec![BasketPair {
                product_a: "Café".to_string(),
                product_b: "Pan".to_string(),
                times_bought_together: 7,
            }],
        });

        assert!(generate_markdown_report(&report, "$").contains("| Café | Pan | 7 |"));

        let empty = envelope(BasketReport {
            min_occurrences: 3,
            frequently_bought_together: vec![],
        });
        assert!(generate_markdown_report(&empty, "$").contains("at least 3 times"));
    }

    #[test]
    fn test_status_markdown() {
        let status = AiStatus {
            ai_enabled: true,
            local_reachable: false,
            local_model: None,
            cloud_configured: true,
            modules: vec![ModuleDescriptor {
                name: "insights".to_string(),
                enabled: true,
                description: "Natural language business reports".to_string(),
            }],
        };

        let markdown = generate_status_markdown(&status);
        assert!(markdown.contains("- **Local backend:** ❌\n"));
        assert!(markdown.contains("| `insights` | ✅ |"));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&envelope(forecast())).unwrap();

        assert!(json.contains("\"period_days\": 14"));
        assert!(json.contains("\"urgency\": \"critical\""));
        assert!(!json.contains("\"narrative\""));
    }
}
