//! OpenRouter provider implementation for LLM scoring
//!
//! OpenRouter routes across models that don't all honor JSON schemas, so this provider
//! only asks for a JSON object and leaves validation to the feedback service.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::CoachConfig;
use crate::error::{Error, Result};

use super::scoring::{TokenUsage, parse_json_object};
use super::{ScoringProvider, ScoringRequest, ScoringResponse};

pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

/// Models tried in order when none is configured
pub const DEFAULT_OPENROUTER_MODELS: [&str; 2] =
    ["openai/gpt-4o-mini", "meta-llama/llama-4-maverick"];

fn default_models() -> Vec<String> {
    DEFAULT_OPENROUTER_MODELS.iter().map(|m| m.to_string()).collect()
}

/// A namespaced model goes first with the defaults behind it. Bare ids such as
/// `gpt-4o-mini` are OpenAI names OpenRouter can't route, so the defaults are used.
fn models_for(configured: &str) -> Vec<String> {
    let configured = configured.trim();
    if !configured.contains('/') {
        debug!(
            "Model '{}' has no provider prefix, using OpenRouter defaults",
            configured
        );
        return default_models();
    }

    let mut models = vec![configured.to_string()];
    models.extend(default_models().into_iter().filter(|m| m != configured));
    models
}

/// OpenRouter scoring provider
pub struct OpenRouterScoringProvider {
    client: Client,
    api_key: Option<String>,
    models: Vec<String>,
    base_url: String,
}

impl OpenRouterScoringProvider {
    /// Create a new provider (API key loaded from environment if not provided)
    pub fn new(api_key: Option<String>) -> Self {
        let key = api_key.or_else(|| std::env::var("OPENROUTER_API_KEY").ok());

        Self {
            client: Client::new(),
            api_key: key,
            models: default_models(),
            base_url: OPENROUTER_API_BASE.to_string(),
        }
    }

    /// Create a provider from resolved configuration (no environment fallback)
    pub fn from_config(config: &CoachConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.openrouter_api_key.clone(),
            models: models_for(&config.scoring_model),
            base_url: OPENROUTER_API_BASE.to_string(),
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Set the models to use (with fallbacks)
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    /// Set a single model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.models = vec![model.into()];
        self
    }

    /// Point the provider at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::ProviderNotConfigured("OpenRouter API key not set".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    models: Vec<String>,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f32,
    response_format: JsonObjectFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<ProviderConfig>,
}

#[derive(Debug, Serialize)]
struct JsonObjectFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    allow_fallbacks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    require_parameters: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[async_trait]
impl ScoringProvider for OpenRouterScoringProvider {
    fn name(&self) -> &'static str {
        "OpenRouter"
    }

    async fn score(&self, request: ScoringRequest) -> Result<ScoringResponse> {
        let api_key = self.api_key()?;

        let chat_request = ChatRequest {
            models: self.models.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system_prompt,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user_prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: JsonObjectFormat {
                kind: "json_object",
            },
            provider: Some(ProviderConfig {
                allow_fallbacks: Some(true),
                require_parameters: Some(true),
            }),
        };

        debug!(
            "Sending scoring request to OpenRouter with models: {:?}",
            self.models
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&chat_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("Unknown error"));
            error!("OpenRouter API error ({}): {}", status, error_text);
            return Err(Error::Upstream(format!(
                "OpenRouter API error ({}): {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response.json().await?;

        let text = chat_response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| Error::Upstream("No completion returned".to_string()))?;

        let usage = chat_response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        debug!("Received scoring from OpenRouter");

        Ok(ScoringResponse {
            content: parse_json_object(&text)?,
            usage,
            model: Some(chat_response.model),
        })
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
