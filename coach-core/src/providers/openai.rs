//! OpenAI provider implementations for Whisper transcription and GPT scoring

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::config::CoachConfig;
use crate::error::{Error, Result};

use super::scoring::{TokenUsage, parse_json_object};
use super::{
    ScoringProvider, ScoringRequest, ScoringResponse, TranscriptionProvider, TranscriptionRequest,
    TranscriptionResponse, WordTimestamp,
};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI Whisper transcription provider
pub struct OpenAITranscriptionProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAITranscriptionProvider {
    /// Create a new provider (API key loaded from environment if not provided)
    pub fn new(api_key: Option<String>) -> Self {
        let key = api_key.or_else(|| std::env::var("OPENAI_API_KEY").ok());

        Self {
            client: Client::new(),
            api_key: key,
            model: "whisper-1".to_string(),
            base_url: OPENAI_API_BASE.to_string(),
        }
    }

    /// Create a provider from resolved configuration (no environment fallback)
    pub fn from_config(config: &CoachConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.openai_api_key.clone(),
            model: config.transcription_model.clone(),
            base_url: config.api_base.clone(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
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
            .ok_or_else(|| Error::ProviderNotConfigured("OpenAI API key not set".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    end: f64,
}

#[async_trait]
impl TranscriptionProvider for OpenAITranscriptionProvider {
    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }

    async fn transcribe(&self, request: TranscriptionRequest) -> Result<TranscriptionResponse> {
        let api_key = self.api_key()?;

        if request.audio.is_empty() {
            return Err(Error::InvalidInput("audio payload is empty".to_string()));
        }

        let file_part = reqwest::multipart::Part::bytes(request.audio)
            .file_name(request.file_name)
            .mime_str(&request.mime_type)
            .map_err(|e| Error::InvalidInput(format!("Failed to create form part: {e}")))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word");

        if let Some(lang) = request.language {
            form = form.text("language", lang);
        }

        debug!("Sending transcription request to OpenAI Whisper");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Whisper API error: {} - {}", status, error_text);
            return Err(Error::Upstream(format!(
                "Whisper API error: {} - {}",
                status, error_text
            )));
        }

        let whisper_response: WhisperResponse = response.json().await?;

        Ok(TranscriptionResponse {
            text: whisper_response.text,
            duration_seconds: whisper_response.duration.unwrap_or(0.0),
            words: whisper_response
                .words
                .into_iter()
                .map(|w| WordTimestamp {
                    word: w.word,
                    start: w.start,
                    end: w.end,
                })
                .collect(),
        })
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// OpenAI GPT scoring provider using schema-enforced structured output
pub struct OpenAIScoringProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAIScoringProvider {
    /// Create a new provider (API key loaded from environment if not provided)
    pub fn new(api_key: Option<String>) -> Self {
        let key = api_key.or_else(|| std::env::var("OPENAI_API_KEY").ok());

        Self {
            client: Client::new(),
            api_key: key,
            model: "gpt-4o-mini".to_string(),
            base_url: OPENAI_API_BASE.to_string(),
        }
    }

    /// Create a provider from resolved configuration (no environment fallback)
    pub fn from_config(config: &CoachConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.openai_api_key.clone(),
            model: config.scoring_model.clone(),
            base_url: config.api_base.clone(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
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
            .ok_or_else(|| Error::ProviderNotConfigured("OpenAI API key not set".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseFormat {
    JsonObject,
    JsonSchema { json_schema: JsonSchemaFormat },
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    strict: bool,
    schema: Value,
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
impl ScoringProvider for OpenAIScoringProvider {
    fn name(&self) -> &'static str {
        "OpenAI GPT"
    }

    async fn score(&self, request: ScoringRequest) -> Result<ScoringResponse> {
        let api_key = self.api_key()?;

        let response_format = match request.response_schema {
            Some(schema) => ResponseFormat::JsonSchema {
                json_schema: JsonSchemaFormat {
                    name: request.schema_name,
                    strict: true,
                    schema,
                },
            },
            None => ResponseFormat::JsonObject,
        };

        let chat_request = ChatRequest {
            model: self.model.clone(),
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
            response_format,
        };

        debug!("Sending scoring request to OpenAI");

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
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI API error: {} - {}", status, error_text);
            return Err(Error::Upstream(format!(
                "OpenAI API error: {} - {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response.json().await?;

        let text = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Upstream("No completion returned".to_string()))?;

        Ok(ScoringResponse {
            content: parse_json_object(&text)?,
            usage: chat_response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: Some(chat_response.model),
        })
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn supports_structured_output(&self) -> bool {
        true
    }
}
