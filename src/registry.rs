//! Module registry: which analytics modules are on, and which backends answer.

use crate::config::{Config, ModulesConfig};
use crate::gateway::Gateway;
use crate::models::{AiStatus, ModuleDescriptor};
use std::sync::Arc;

/// Read-only view over configuration and live backend reachability.
pub struct ModuleRegistry {
    gateway: Arc<Gateway>,
    ai_enabled: bool,
    modules: ModulesConfig,
}

impl ModuleRegistry {
    pub fn new(gateway: Arc<Gateway>, config: &Config) -> Self {
        Self {
            gateway,
            ai_enabled: config.ai.enabled,
            modules: config.modules.clone(),
        }
    }

    /// Module switches in their fixed listing order.
    pub fn modules(&self) -> Vec<ModuleDescriptor> {
        describe_modules(&self.modules)
    }

    /// Probe the local backend once and report everything.
    pub async fn status(&self) -> AiStatus {
        let local_reachable = self.gateway.probe_local().await.is_reachable();

        AiStatus {
            ai_enabled: self.ai_enabled,
            local_reachable,
            local_model: local_reachable.then(|| self.gateway.local_model().to_string()),
            cloud_configured: self.gateway.cloud_configured(),
            modules: self.modules(),
        }
    }
}

pub fn describe_modules(modules: &ModulesConfig) -> Vec<ModuleDescriptor> {
    [
        (
            "demand_forecast",
            modules.demand_forecast,
            "Demand prediction and restock alerts",
        ),
        (
            "insights",
            modules.insights,
            "Natural language business reports",
        ),
        (
            "smart_alerts",
            modules.smart_alerts,
            "Anomaly detection and low-stock warnings",
        ),
        (
            "customer_insights",
            modules.customer_insights,
            "Purchase pattern analysis",
        ),
    ]
    .into_iter()
    .map(|(name, enabled, description)| ModuleDescriptor {
        name: name.to_string(),
        enabled,
        description: description.to_string(),
    })
    .collect()
}
