//! Transcription provider trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Request for transcription of one recorded segment
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    /// Encoded audio file contents (WAV, M4A, ...)
    pub audio: Vec<u8>,
    /// File name sent with the upload; the extension tells the provider the format
    pub file_name: String,
    /// MIME type of the audio
    pub mime_type: String,
    /// Optional language hint (ISO 639-1 code, e.g., "en")
    pub language: Option<String>,
}

impl TranscriptionRequest {
    /// A WAV recording with an English language hint
    pub fn wav(audio: Vec<u8>) -> Self {
        Self {
            audio,
            file_name: "audio.wav".to_string(),
            mime_type: "audio/wav".to_string(),
            language: Some("en".to_string()),
        }
    }

    pub fn with_file(mut self, file_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Response from transcription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    /// Transcribed text
    pub text: String,
    /// Total duration of the audio in seconds
    pub duration_seconds: f64,
    /// Word-level timestamps, when the provider returns them
    #[serde(default)]
    pub words: Vec<WordTimestamp>,
}

/// A single transcribed word with timing in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTimestamp {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// Trait for transcription providers
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Transcribe audio to text
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<TranscriptionResponse>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool;
}
