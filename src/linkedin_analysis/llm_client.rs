// src/linkedin_analysis/llm_client.rs
use super::types::{
    AnthropicRequest, AnthropicResponse, ChatMessage, OpenAiChatRequest, OpenAiChatResponse,
    ResponseFormat,
};
use crate::core::config_manager::{AppConfig, ModelTier, Provider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 2000;

/// A text-generation endpoint that is asked for a JSON object and answers with text.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider and model, for logs.
    fn describe(&self) -> String;

    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Build the client for the configured provider. Fails when the credential is missing.
pub fn build_client(config: &AppConfig) -> Result<Arc<dyn LlmClient>> {
    let api_key = config.api_key()?.to_string();
    let client: Arc<dyn LlmClient> = match config.provider {
        Provider::OpenAi => Arc::new(OpenAiClient::new(
            api_key,
            config.base_url().to_string(),
            config.model(),
            config.model_tier,
            config.request_timeout,
        )?),
        Provider::Anthropic => Arc::new(AnthropicClient::new(
            api_key,
            config.base_url().to_string(),
            config.model(),
            config.request_timeout,
        )?),
    };
    Ok(client)
}

fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiClient {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        tier: ModelTier,
        timeout: Duration,
    ) -> Result<Self> {
        // Reasoning-tier models reject a custom temperature
        let temperature = match tier {
            ModelTier::Standard => Some(0.3),
            ModelTier::Advanced => None,
        };

        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            temperature,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn describe(&self) -> String {
        format!("OpenAI {}", self.model)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = OpenAiChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
            response_format: Some(ResponseFormat {
                kind: "json_object".to_string(),
            }),
        };

        debug!("Sending request to OpenAI model {}", self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to OpenAI")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI API error {}: {}", status, error_text);
            anyhow::bail!("OpenAI API returned error {}: {}", status, error_text);
        }

        let chat_response: OpenAiChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .context("OpenAI response contained no message content")
    }
}

pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, base_url: String, model: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    fn describe(&self) -> String {
        format!("Anthropic {}", self.model)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: ANTHROPIC_MAX_TOKENS,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        debug!("Sending request to Anthropic model {}", self.model);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Anthropic")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Anthropic API error {}: {}", status, error_text);
            anyhow::bail!("Anthropic API returned error {}: {}", status, error_text);
        }

        let message: AnthropicResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic response")?;

        message
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .context("Anthropic response contained no text block")
    }
}
