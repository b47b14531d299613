//! Coach Core - feedback scoring for spoken conversation practice
//!
//! Turns a practice session's transcript into a scored coaching report, tracks practice
//! streaks and score averages, and awards milestone badges. Deterministic speech metrics
//! are computed locally; the narrative and scores come from a pluggable LLM provider.

pub mod badges;
pub mod config;
pub mod error;
pub mod feedback;
pub mod migrations;
pub mod pipeline;
pub mod progress;
pub mod prompt;
pub mod providers;
pub mod sessions;
pub mod storage;
pub mod text_metrics;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Re-export the main components for convenience
pub use badges::{BadgeAwarder, BadgeNotifier, TracingNotifier, default_catalog, evaluate};
pub use config::{CoachConfig, ScoringBackend, ZeroDurationPolicy};
pub use feedback::FeedbackService;
pub use pipeline::{CoachingPipeline, SessionOutcome};
pub use progress::{ProgressAggregator, ProgressService, aggregate};
pub use providers::{ScoringProvider, TranscriptionProvider};
pub use sessions::SessionService;
pub use storage::Storage;
pub use text_metrics::{
    FillerAnalysis, PacingBand, ScoreBand, TranscriptMetrics, detect_filler_words,
    question_ratio, words_per_minute,
};
