//! End-of-session pipeline: feedback, then progress, then badges

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::badges::{BadgeAwarder, BadgeNotifier, TracingNotifier};
use crate::config::CoachConfig;
use crate::error::Result;
use crate::feedback::FeedbackService;
use crate::progress::ProgressService;
use crate::providers::ScoringProvider;
use crate::storage::Storage;
use crate::types::{Badge, Feedback, GenerateFeedbackRequest, ProgressSnapshot, UserId};

/// Everything a finished session produces
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub feedback: Feedback,
    pub progress: ProgressSnapshot,
    /// Badges awarded by this session, in catalog order
    pub new_badges: Vec<Badge>,
}

pub struct CoachingPipeline {
    feedback: FeedbackService,
    progress: ProgressService,
    awarder: BadgeAwarder,
}

impl CoachingPipeline {
    pub fn new(
        storage: Arc<Storage>,
        scorer: Arc<dyn ScoringProvider>,
        notifier: Arc<dyn BadgeNotifier>,
    ) -> Self {
        Self {
            feedback: FeedbackService::new(storage.clone(), scorer),
            progress: ProgressService::new(storage.clone()),
            awarder: BadgeAwarder::new(storage, notifier),
        }
    }

    /// Assemble the pipeline from configuration, logging awards through `tracing`
    pub fn from_config(storage: Arc<Storage>, config: &CoachConfig) -> Result<Self> {
        Ok(Self {
            feedback: FeedbackService::from_config(storage.clone(), config)?,
            progress: ProgressService::new(storage.clone()),
            awarder: BadgeAwarder::new(storage, Arc::new(TracingNotifier)),
        })
    }

    /// Replace the feedback stage, e.g. to change its timeout
    pub fn with_feedback_service(mut self, feedback: FeedbackService) -> Self {
        self.feedback = feedback;
        self
    }

    /// Replace the progress stage, e.g. to use a local day boundary
    pub fn with_progress_service(mut self, progress: ProgressService) -> Self {
        self.progress = progress;
        self
    }

    /// Generate feedback, recompute progress as of `as_of`, and award any new badges.
    ///
    /// Fails without touching progress or badges if feedback generation fails.
    pub async fn complete_session(
        &self,
        caller: &UserId,
        request: GenerateFeedbackRequest,
        as_of: NaiveDate,
    ) -> Result<SessionOutcome> {
        let session_id = request.session_id;
        let feedback = self.feedback.generate(caller, request).await?;

        let progress = self.progress.snapshot(caller, as_of)?;
        let new_badges = match self.awarder.award(caller, &progress) {
            Ok(badges) => badges,
            Err(e) => {
                // Feedback is already stored; awards are retried on the next session.
                warn!("Badge evaluation failed for session {}: {}", session_id, e);
                Vec::new()
            }
        };

        info!(
            "Completed session {}: {} day streak, {} new badge(s)",
            session_id,
            progress.current_streak,
            new_badges.len()
        );

        Ok(SessionOutcome {
            feedback,
            progress,
            new_badges,
        })
    }

    /// Same as [`complete_session`](Self::complete_session) using today's date
    pub async fn complete_session_today(
        &self,
        caller: &UserId,
        request: GenerateFeedbackRequest,
    ) -> Result<SessionOutcome> {
        let today = self.progress.aggregator().today();
        self.complete_session(caller, request, today).await
    }
}
