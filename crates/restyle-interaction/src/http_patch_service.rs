//! HttpPatchService - generative service over the messages HTTP API.
//!
//! One request per instruction: system prompt plus a single user message. The
//! first text block of the reply must hold the patch JSON.

use crate::prompt::PromptRenderer;
use crate::response::extract_patch_response;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use restyle_core::config::{ServiceConfig, TimeoutConfig};
use restyle_core::generative::{GenerativeService, PatchRequest};
use restyle_core::patch::PatchResponse;
use restyle_core::secret::Credential;
use restyle_core::{RestyleError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_VERSION: &str = "2023-06-01";

/// [`GenerativeService`] backed by an HTTP endpoint.
pub struct HttpPatchService {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    prompts: PromptRenderer,
}

impl HttpPatchService {
    /// Builds a client whose every request is bounded by `timeouts.transport()`.
    ///
    /// # Errors
    ///
    /// Returns `RestyleError::Config` if the HTTP client cannot be built.
    pub fn new(service: &ServiceConfig, timeouts: &TimeoutConfig) -> Result<Self> {
        let timeout = timeouts.transport();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RestyleError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: service.endpoint.clone(),
            model: service.model.clone(),
            max_tokens: service.max_tokens,
            timeout,
            prompts: PromptRenderer::new()?,
        })
    }

    fn build_body(&self, request: &PatchRequest) -> Result<CreateMessageRequest> {
        Ok(CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: self.prompts.system(request)?,
            messages: vec![Message {
                role: "user",
                content: self.prompts.user(request)?,
            }],
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> RestyleError {
        if err.is_timeout() {
            RestyleError::TransportTimeout {
                elapsed_ms: self.timeout.as_millis() as u64,
            }
        } else {
            RestyleError::transport(format!("request failed: {}", err.without_url()))
        }
    }
}

#[async_trait]
impl GenerativeService for HttpPatchService {
    async fn request_patch(&self, credential: &Credential, request: &PatchRequest) -> Result<PatchResponse> {
        let body = self.build_body(request)?;
        tracing::info!(
            "[HttpPatchService] Requesting patch from {} (model: {}, context: {})",
            self.endpoint,
            self.model,
            request.context.is_some()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", credential.expose())
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("[HttpPatchService] Service returned {}", status);
            return Err(map_http_error(status, &text));
        }

        let parsed: CreateMessageResponse = response
            .json()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let text = parsed
            .content
            .into_iter()
            .find_map(|block| (block.kind == "text").then_some(block.text).flatten())
            .ok_or_else(|| RestyleError::patch_validation("response contained no text"))?;

        extract_patch_response(&text)
    }
}

#[derive(Debug, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn map_http_error(status: StatusCode, body: &str) -> RestyleError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => RestyleError::transport(format!(
            "service timed out ({}): {}",
            status.as_u16(),
            message
        )),
        _ => RestyleError::transport(format!("service returned {}: {}", status.as_u16(), message)),
    }
}
