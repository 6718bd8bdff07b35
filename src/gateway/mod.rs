//! Text-generation gateway.
//!
//! Routes each request to the local Ollama server when it answers a probe,
//! and falls back to the Anthropic API at most once. `force_cloud` skips the
//! probe entirely when cloud credentials exist.

pub mod cloud;
pub mod error;
pub mod local;

pub use cloud::CloudBackend;
pub use error::GatewayError;
pub use local::{LocalBackend, ProbeOutcome};

use crate::config::AiConfig;
use crate::models::Backend;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One stateless generation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub force_cloud: bool,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_force_cloud(mut self, force_cloud: bool) -> Self {
        self.force_cloud = force_cloud;
        self
    }
}

/// Successful generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub backend: Backend,
}

pub type GenerationResult = Result<Generation, GatewayError>;

/// Local backend reachability as seen by routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    Unreachable,
}

impl Reachability {
    pub fn is_reachable(self) -> bool {
        self == Reachability::Reachable
    }
}

/// Anything that can turn a prompt into text.
///
/// Analytics modules depend on this rather than on [`Gateway`] directly.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult;
}

/// Stateless client for the two backends.
#[derive(Debug, Clone)]
pub struct Gateway {
    enabled: bool,
    local: LocalBackend,
    cloud: CloudBackend,
    http_client: reqwest::Client,
}

impl Gateway {
    /// Build a gateway from the `[ai]` configuration section.
    pub fn new(config: &AiConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::Configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            enabled: config.enabled,
            local: LocalBackend {
                base_url: config.ollama_url.clone(),
                model: config.ollama_model.clone(),
                probe_timeout: Duration::from_secs(config.probe_timeout_seconds),
                generate_timeout: Duration::from_secs(config.local_timeout_seconds),
            },
            cloud: CloudBackend {
                base_url: config.anthropic_url.clone(),
                model: config.claude_model.clone(),
                api_key: config.cloud_api_key().map(String::from),
                timeout: Duration::from_secs(config.cloud_timeout_seconds),
            },
            http_client,
        })
    }

    pub fn local_model(&self) -> &str {
        &self.local.model
    }

    pub fn cloud_configured(&self) -> bool {
        self.cloud.is_configured()
    }

    /// Probe the local backend. Never fails; every problem reads as unreachable.
    pub async fn probe_local(&self) -> Reachability {
        let outcome = self.local.probe(&self.http_client).await;
        match &outcome {
            ProbeOutcome::Reachable => debug!("Ollama reachable at {}", self.local.base_url),
            ProbeOutcome::Unreachable(status) => {
                debug!("Ollama at {} answered {}", self.local.base_url, status)
            }
            ProbeOutcome::Indeterminate(reason) => {
                debug!("Ollama at {} did not answer: {}", self.local.base_url, reason)
            }
        }

        if outcome.is_reachable() {
            Reachability::Reachable
        } else {
            Reachability::Unreachable
        }
    }

    /// Route a request to a backend and return its text.
    pub async fn query(&self, request: &GenerationRequest) -> GenerationResult {
        if !self.enabled {
            return Err(GatewayError::Configuration(
                "AI is disabled; set ai.enabled = true".to_string(),
            ));
        }

        if request.force_cloud && self.cloud.is_configured() {
            info!("Routing to cloud backend (forced)");
            return self.call_cloud(request).await;
        }

        if self.probe_local().await.is_reachable() {
            info!("Routing to local backend ({})", self.local.model);
            return self.call_local(request).await;
        }

        if self.cloud.is_configured() {
            warn!("Ollama unreachable, falling back to cloud backend");
            return self.call_cloud(request).await;
        }

        Err(GatewayError::NoBackendAvailable)
    }

    async fn call_local(&self, request: &GenerationRequest) -> GenerationResult {
        let text = self.local.generate(&self.http_client, request).await?;
        Ok(Generation {
            text,
            backend: Backend::Local,
        })
    }

    async fn call_cloud(&self, request: &GenerationRequest) -> GenerationResult {
        let text = self.cloud.generate(&self.http_client, request).await?;
        Ok(Generation {
            text,
            backend: Backend::Cloud,
        })
    }
}

#[async_trait]
impl TextGenerator for Gateway {
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        self.query(request).await
    }
}
