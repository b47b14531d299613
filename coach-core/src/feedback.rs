//! Feedback generation
//!
//! Validates a finished session, computes the deterministic transcript metrics, asks the
//! scoring provider for the narrative and scores, and persists the merged report exactly
//! once. Nothing is written on any failure path.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{CoachConfig, ZeroDurationPolicy};
use crate::error::{Error, Result};
use crate::prompt::{PromptInput, SCORING_TEMPERATURE, build_scoring_request};
use crate::providers::{ScoringProvider, ScoringResponse};
use crate::storage::Storage;
use crate::text_metrics::{TranscriptMetrics, analyze};
use crate::types::{DetailedAnalysis, Feedback, GenerateFeedbackRequest, Session, UserId};

/// Score used when the model omits one or returns something unusable
pub const DEFAULT_SCORE: f64 = 5.0;
pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

const DEFAULT_SUMMARY: &str = "Feedback analysis completed.";
const DEFAULT_PRACTICE_DRILL: &str = "Continue practicing to improve your skills.";
const NOT_AVAILABLE: &str = "N/A";

/// The model's half of a feedback report, after lenient parsing and clamping
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAssessment {
    pub clarity_score: f64,
    pub confidence_score: f64,
    pub empathy_score: f64,
    pub pacing_score: f64,
    pub summary: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub practice_drill: String,
    pub tone_analysis: String,
    pub structure_quality: String,
}

impl ModelAssessment {
    /// Read the model's JSON object, filling defaults for anything missing or malformed
    pub fn from_json(content: &Value) -> Result<Self> {
        let object = content.as_object().ok_or_else(|| {
            Error::Upstream("model response was not a JSON object".to_string())
        })?;

        Ok(Self {
            clarity_score: score_field(object, "clarity_score"),
            confidence_score: score_field(object, "confidence_score"),
            empathy_score: score_field(object, "empathy_score"),
            pacing_score: score_field(object, "pacing_score"),
            summary: text_field(object, "summary", DEFAULT_SUMMARY),
            strengths: list_field(object, "strengths"),
            improvements: list_field(object, "improvements"),
            practice_drill: text_field(object, "practice_drill", DEFAULT_PRACTICE_DRILL),
            tone_analysis: text_field(object, "tone_analysis", NOT_AVAILABLE),
            structure_quality: text_field(object, "structure_quality", NOT_AVAILABLE),
        })
    }
}

/// Numbers and numeric strings are accepted; anything else falls back to the default
fn score_field(object: &Map<String, Value>, field: &str) -> f64 {
    let parsed = match object.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite());

    match parsed {
        Some(score) => clamp_score(score),
        None => {
            warn!(
                "Model returned no usable {}, defaulting to {}",
                field, DEFAULT_SCORE
            );
            DEFAULT_SCORE
        }
    }
}

fn text_field(object: &Map<String, Value>, field: &str, default: &str) -> String {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn list_field(object: &Map<String, Value>, field: &str) -> Vec<String> {
    object
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Clamp a score into [0, 10]
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Generates and stores one feedback report per session
pub struct FeedbackService {
    storage: Arc<Storage>,
    scorer: Arc<dyn ScoringProvider>,
    request_timeout: Option<Duration>,
    zero_duration_policy: ZeroDurationPolicy,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl FeedbackService {
    /// Create a service with no request timeout and the default zero-duration policy
    pub fn new(storage: Arc<Storage>, scorer: Arc<dyn ScoringProvider>) -> Self {
        Self {
            storage,
            scorer,
            request_timeout: None,
            zero_duration_policy: ZeroDurationPolicy::default(),
            temperature: SCORING_TEMPERATURE,
            max_tokens: None,
        }
    }

    /// Create a service using the configured scoring provider and limits
    pub fn from_config(storage: Arc<Storage>, config: &CoachConfig) -> Result<Self> {
        let scorer = config.scoring_provider()?;
        Ok(Self::new(storage, scorer)
            .with_timeout(config.request_timeout)
            .with_zero_duration_policy(config.zero_duration_policy)
            .with_temperature(config.scoring_temperature)
            .with_max_tokens(config.scoring_max_tokens))
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_zero_duration_policy(mut self, policy: ZeroDurationPolicy) -> Self {
        self.zero_duration_policy = policy;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Generate, persist and return feedback for a session the caller owns
    pub async fn generate(
        &self,
        caller: &UserId,
        request: GenerateFeedbackRequest,
    ) -> Result<Feedback> {
        self.validate(&request)?;
        let session = self.authorize(caller, &request)?;

        if self.storage.has_feedback(&session.id)? {
            return Err(Error::Conflict(format!(
                "feedback already exists for session {}",
                session.id
            )));
        }

        let metrics = analyze(&request.user_transcript, request.duration_seconds);
        debug!(
            "Session {} metrics: {} words, {} wpm, {} fillers, {:.1}% questions",
            session.id,
            metrics.word_count,
            metrics.words_per_minute,
            metrics.fillers.count,
            metrics.question_ratio
        );

        let response = self.score(&request, &metrics).await?;
        let assessment = ModelAssessment::from_json(&response.content)?;
        let feedback = merge(session.id, metrics, assessment, response.model);

        self.storage.save_feedback(&feedback)?;
        info!(
            "Generated feedback {} for session {} with {}",
            feedback.id,
            session.id,
            self.scorer.name()
        );

        Ok(feedback)
    }

    fn validate(&self, request: &GenerateFeedbackRequest) -> Result<()> {
        if request.user_transcript.trim().is_empty() {
            return Err(Error::InvalidInput("user transcript is empty".to_string()));
        }

        let duration = request.duration_seconds;
        if !duration.is_finite() || duration < 0.0 {
            return Err(Error::InvalidInput(format!(
                "duration must be a non-negative number of seconds, got {duration}"
            )));
        }

        if duration == 0.0 && self.zero_duration_policy == ZeroDurationPolicy::Reject {
            return Err(Error::InvalidInput(
                "duration must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// A missing session and someone else's session are indistinguishable to the caller
    fn authorize(&self, caller: &UserId, request: &GenerateFeedbackRequest) -> Result<Session> {
        self.storage
            .get_session_for_user(&request.session_id, caller)?
            .ok_or_else(|| Error::NotFound(format!("session {}", request.session_id)))
    }

    async fn score(
        &self,
        request: &GenerateFeedbackRequest,
        metrics: &TranscriptMetrics,
    ) -> Result<ScoringResponse> {
        let input = PromptInput {
            user_transcript: &request.user_transcript,
            ai_transcript: &request.ai_transcript,
            duration_seconds: request.duration_seconds,
        };
        let mut scoring_request =
            build_scoring_request(&input, metrics).with_temperature(self.temperature);
        if let Some(max) = self.max_tokens {
            scoring_request = scoring_request.with_max_tokens(max);
        }

        debug!(
            "Requesting feedback for session {} from {}",
            request.session_id,
            self.scorer.name()
        );

        let call = self.scorer.score(scoring_request);
        let result = match self.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(limit)),
            },
            None => call.await,
        };

        result.map_err(|e| {
            let e = self.normalize_provider_error(e);
            error!("{} scoring failed: {}", self.scorer.name(), e);
            e
        })
    }

    fn normalize_provider_error(&self, err: Error) -> Error {
        match err {
            Error::Network(e) if e.is_timeout() => {
                Error::Timeout(self.request_timeout.unwrap_or_default())
            }
            Error::Network(e) => Error::Upstream(e.to_string()),
            Error::Serialization(e) => Error::Upstream(format!("invalid model response: {e}")),
            other => other,
        }
    }
}

fn merge(
    session_id: Uuid,
    metrics: TranscriptMetrics,
    assessment: ModelAssessment,
    model: Option<String>,
) -> Feedback {
    Feedback {
        id: Uuid::new_v4(),
        session_id,
        clarity_score: assessment.clarity_score,
        confidence_score: assessment.confidence_score,
        empathy_score: assessment.empathy_score,
        pacing_score: assessment.pacing_score,
        filler_count: metrics.fillers.count,
        words_per_minute: metrics.words_per_minute,
        summary: assessment.summary,
        strengths: assessment.strengths,
        improvements: assessment.improvements,
        practice_drill: assessment.practice_drill,
        detailed_analysis: DetailedAnalysis {
            filler_words: metrics.fillers.per_word,
            tone_analysis: assessment.tone_analysis,
            structure_quality: assessment.structure_quality,
            question_ratio: metrics.question_ratio,
            active_listening_score: assessment.empathy_score,
        },
        model,
        created_at: Utc::now(),
    }
}
