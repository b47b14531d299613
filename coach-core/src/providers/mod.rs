//! Provider abstraction layer for scoring and transcription services
//!
//! The language model is the only non-deterministic collaborator, so it sits behind
//! the narrow `ScoringProvider` trait; everything around it is testable with a fake.
mod openai;
mod openrouter;
mod scoring;
mod transcription;

pub use openai::{OPENAI_API_BASE, OpenAIScoringProvider, OpenAITranscriptionProvider};
pub use openrouter::{DEFAULT_OPENROUTER_MODELS, OPENROUTER_API_BASE, OpenRouterScoringProvider};
pub use scoring::{
    ScoringProvider, ScoringRequest, ScoringResponse, TokenUsage, parse_json_object,
};
pub use transcription::{
    TranscriptionProvider, TranscriptionRequest, TranscriptionResponse, WordTimestamp,
};
