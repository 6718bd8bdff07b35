//! Anthropic Messages API client.

use super::error::GatewayError;
use super::GenerationRequest;
use crate::models::Backend;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_OUTPUT_TOKENS: u32 = 2048;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// Connection details for the cloud backend.
#[derive(Debug, Clone)]
pub struct CloudBackend {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl CloudBackend {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub async fn generate(
        &self,
        client: &reqwest::Client,
        request: &GenerationRequest,
    ) -> Result<String, GatewayError> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                GatewayError::Configuration("ANTHROPIC_API_KEY not configured".to_string())
            })?;

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_OUTPUT_TOKENS,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
            system: request.system_prompt.as_deref().filter(|s| !s.is_empty()),
        };

        debug!(
            "Sending {} prompt chars to cloud model {}",
            request.prompt.len(),
            self.model
        );

        let response = client
            .post(&url)
            .timeout(self.timeout)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::from_transport(Backend::Cloud, e, self.timeout.as_secs()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::BackendError {
                backend: Backend::Cloud,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| GatewayError::Parse {
            backend: Backend::Cloud,
            reason: e.to_string(),
        })?;

        parsed
            .content
            .into_iter()
            .find(|block| block.block_type == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| GatewayError::Parse {
                backend: Backend::Cloud,
                reason: "response has no text content block".to_string(),
            })
    }
}
