//! Ollama client: reachability probe and single-shot generation.

use super::error::GatewayError;
use super::GenerationRequest;
use crate::models::Backend;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Result of probing the local backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// `GET /api/tags` answered 200.
    Reachable,
    /// The server answered, but not with 200.
    Unreachable(StatusCode),
    /// No answer: connection refused, DNS failure, timeout.
    Indeterminate(String),
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable)
    }
}

/// Ollama generate API request.
#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
}

/// Ollama generate API response.
#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Connection details for the local backend.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    pub base_url: String,
    pub model: String,
    pub probe_timeout: Duration,
    pub generate_timeout: Duration,
}

impl LocalBackend {
    pub async fn probe(&self, client: &reqwest::Client) -> ProbeOutcome {
        let url = format!("{}/api/tags", self.base_url.trim_end_matches('/'));

        match client.get(&url).timeout(self.probe_timeout).send().await {
            Ok(response) if response.status() == StatusCode::OK => ProbeOutcome::Reachable,
            Ok(response) => ProbeOutcome::Unreachable(response.status()),
            Err(e) if e.is_timeout() => ProbeOutcome::Indeterminate(format!(
                "probe timed out after {}s",
                self.probe_timeout.as_secs()
            )),
            Err(e) => ProbeOutcome::Indeterminate(e.to_string()),
        }
    }

    pub async fn generate(
        &self,
        client: &reqwest::Client,
        request: &GenerationRequest,
    ) -> Result<String, GatewayError> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));

        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            system: request.system_prompt.as_deref().filter(|s| !s.is_empty()),
            stream: false,
        };

        debug!(
            "Sending {} prompt chars to Ollama model {}",
            request.prompt.len(),
            self.model
        );

        let response = client
            .post(&url)
            .timeout(self.generate_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                GatewayError::from_transport(Backend::Local, e, self.generate_timeout.as_secs())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::BackendError {
                backend: Backend::Local,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse =
            response.json().await.map_err(|e| GatewayError::Parse {
                backend: Backend::Local,
                reason: e.to_string(),
            })?;

        Ok(parsed.response)
    }
}
