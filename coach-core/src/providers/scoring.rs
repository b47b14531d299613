//! Scoring provider trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Request for a structured scoring completion
#[derive(Debug, Clone)]
pub struct ScoringRequest {
    /// Rubric and output-format instructions
    pub system_prompt: String,
    /// Transcripts and computed metrics
    pub user_prompt: String,
    /// Name for the schema when sent as structured output
    pub schema_name: String,
    /// JSON schema the answer must satisfy
    pub response_schema: Option<Value>,
    pub temperature: f32,
    /// Max tokens to generate
    pub max_tokens: Option<u32>,
}

impl ScoringRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            schema_name: String::new(),
            response_schema: None,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.schema_name = name.into();
        self.response_schema = Some(schema);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }
}

/// Parsed answer from a scoring provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResponse {
    /// The model's answer, always a JSON object
    pub content: Value,
    /// Token usage information
    pub usage: Option<TokenUsage>,
    /// Model used for scoring
    pub model: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Trait for language-model scoring providers
#[async_trait]
pub trait ScoringProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Score a transcript; a single upstream call, never retried
    async fn score(&self, request: ScoringRequest) -> Result<ScoringResponse>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool;

    /// Whether the provider enforces the response schema server-side
    fn supports_structured_output(&self) -> bool {
        false
    }
}

/// Parse model output into a JSON object, tolerating a surrounding code fence
pub fn parse_json_object(content: &str) -> Result<Value> {
    let trimmed = strip_code_fence(content.trim());

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| Error::Upstream(format!("Model returned malformed JSON: {e}")))?;

    if !value.is_object() {
        return Err(Error::Upstream(
            "Model returned JSON that is not an object".to_string(),
        ));
    }

    Ok(value)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_object() {
        let value = parse_json_object(r#"{"clarity_score": 7}"#).unwrap();
        assert_eq!(value["clarity_score"], 7);
    }

    #[test]
    fn test_parse_fenced_json() {
        let value = parse_json_object("```json\n{\"summary\": \"ok\"}\n```").unwrap();
        assert_eq!(value["summary"], "ok");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            parse_json_object("not json at all"),
            Err(Error::Upstream(_))
        ));
        assert!(matches!(parse_json_object("[1, 2]"), Err(Error::Upstream(_))));
        assert!(matches!(parse_json_object(""), Err(Error::Upstream(_))));
    }
}
