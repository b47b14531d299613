//! Core types used throughout the coaching core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for users (issued by the auth provider)
pub type UserId = Uuid;

/// Unique identifier for practice sessions
pub type SessionId = Uuid;

/// Unique identifier for scenarios
pub type ScenarioId = Uuid;

/// Unique identifier for feedback reports
pub type FeedbackId = Uuid;

/// Catalog identifier for badges (externally managed, e.g. "first_steps")
pub type BadgeId = String;

/// One practice attempt against a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub scenario_id: ScenarioId,
    /// What the user said, replaced as recording segments are transcribed
    pub transcript: String,
    /// What the AI persona said
    pub ai_transcript: String,
    pub duration_seconds: f64,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: UserId, scenario_id: ScenarioId) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            scenario_id,
            transcript: String::new(),
            ai_transcript: String::new(),
            duration_seconds: 0.0,
            created_at: Utc::now(),
        }
    }
}

/// Input to feedback generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateFeedbackRequest {
    pub session_id: SessionId,
    pub user_transcript: String,
    #[serde(default)]
    pub ai_transcript: String,
    pub duration_seconds: f64,
}

/// Per-filler occurrence count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillerWordCount {
    pub word: String,
    pub count: u32,
}

/// The nested analysis block of a feedback report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedAnalysis {
    pub filler_words: Vec<FillerWordCount>,
    pub tone_analysis: String,
    pub structure_quality: String,
    /// Percentage of sentences that were questions (0-100)
    pub question_ratio: f64,
    /// Mirrors the empathy score
    pub active_listening_score: f64,
}

/// A scored coaching report for one session. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub session_id: SessionId,
    pub clarity_score: f64,
    pub confidence_score: f64,
    pub empathy_score: f64,
    pub pacing_score: f64,
    pub filler_count: u32,
    pub words_per_minute: u32,
    pub summary: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub practice_drill: String,
    pub detailed_analysis: DetailedAnalysis,
    /// Model that produced the narrative, when the provider reports one
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    /// The four primary scores in a fixed order: clarity, confidence, empathy, pacing
    pub fn scores(&self) -> [f64; 4] {
        [
            self.clarity_score,
            self.confidence_score,
            self.empathy_score,
            self.pacing_score,
        ]
    }
}

/// A session together with its feedback, if any has been generated
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session: Session,
    pub feedback: Option<Feedback>,
}

/// Threshold a badge requires, exactly one per badge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BadgeRequirement {
    SessionCount { required_sessions: u32 },
    Streak { required_streak: u32 },
    Score { required_score: f64 },
}

impl BadgeRequirement {
    /// Storage tag for the requirement type
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionCount { .. } => "session_count",
            Self::Streak { .. } => "streak",
            Self::Score { .. } => "score",
        }
    }

    /// Threshold as a plain number, for storage
    pub fn threshold(&self) -> f64 {
        match self {
            Self::SessionCount { required_sessions } => f64::from(*required_sessions),
            Self::Streak { required_streak } => f64::from(*required_streak),
            Self::Score { required_score } => *required_score,
        }
    }

    /// Rebuild a requirement from its storage tag and threshold
    pub fn from_parts(kind: &str, threshold: f64) -> Option<Self> {
        match kind {
            "session_count" => Some(Self::SessionCount {
                required_sessions: threshold.max(0.0) as u32,
            }),
            "streak" => Some(Self::Streak {
                required_streak: threshold.max(0.0) as u32,
            }),
            "score" => Some(Self::Score {
                required_score: threshold,
            }),
            _ => None,
        }
    }
}

/// A badge catalog entry (not per-user)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: BadgeId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(flatten)]
    pub requirement: BadgeRequirement,
}

impl Badge {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        requirement: BadgeRequirement,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            icon: None,
            requirement,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// A badge a user has earned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBadge {
    pub user_id: UserId,
    pub badge_id: BadgeId,
    pub earned_at: DateTime<Utc>,
}

/// Per-dimension mean scores
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageScores {
    pub clarity: f64,
    pub confidence: f64,
    pub empathy: f64,
    pub pacing: f64,
}

impl AverageScores {
    /// Unweighted mean of the four dimensions
    pub fn overall(&self) -> f64 {
        (self.clarity + self.confidence + self.empathy + self.pacing) / 4.0
    }
}

/// Derived view of a user's progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub current_streak: u32,
    pub total_sessions: u32,
    pub average_scores: AverageScores,
    /// Latest sessions, newest first
    #[serde(default)]
    pub recent_sessions: Vec<Session>,
}
