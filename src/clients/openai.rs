//! OpenAI-compatible chat completion client

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clients::traits::CompletionClient;
use crate::config::CompletionConfig;
use crate::credentials::Credential;
use crate::error::{GENERIC_SERVICE_ERROR, Result, WizardError};

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, model, None)
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout_ms: Option<u64>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(ms) = timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let client = builder.build().map_err(|e| WizardError::Config {
            message: format!("Failed to build HTTP client: {}", e),
        })?;
        Ok(Self {
            endpoint: endpoint.into(),
            model: model.into(),
            client,
        })
    }

    pub fn from_config(config: &CompletionConfig) -> Result<Self> {
        Self::with_timeout(
            config.endpoint.clone(),
            config.model.clone(),
            config.request_timeout_ms,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, credential: &Credential, instruction: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: instruction,
            }],
        };

        tracing::debug!(
            model = %self.model,
            instruction_chars = instruction.len(),
            "sending completion request"
        );
        let start = Instant::now();

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(credential.expose())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            let message = service_error_detail(&body_text)
                .unwrap_or_else(|| GENERIC_SERVICE_ERROR.to_string());
            tracing::warn!(status = status.as_u16(), "completion endpoint returned {}", message);
            return Err(WizardError::Service { message });
        }

        let parsed: ChatResponse = resp.json().await.map_err(|e| {
            WizardError::format(format!("completion response is not valid JSON: {}", e))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| WizardError::format("completion response has no choices[0].message.content"))?;

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            response_chars = content.len(),
            "completion received"
        );

        Ok(content)
    }
}

/// Extract `error.message` from an error body, if the service reported one.
pub fn service_error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
