//! Badge rules and awards
//!
//! [`evaluate`] is a pure function of a progress snapshot, the catalog and the set of
//! badges already earned. [`BadgeAwarder`] wraps it with storage and notification.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::Result;
use crate::storage::Storage;
use crate::types::{Badge, BadgeId, BadgeRequirement, ProgressSnapshot, UserId};

/// The catalog seeded into a fresh database, in catalog order
pub fn default_catalog() -> Vec<Badge> {
    vec![
        Badge::new(
            "first_steps",
            "First Steps",
            "Complete your first practice session",
            BadgeRequirement::SessionCount {
                required_sessions: 1,
            },
        ),
        Badge::new(
            "conversationalist",
            "Conversationalist",
            "Complete 10 practice sessions",
            BadgeRequirement::SessionCount {
                required_sessions: 10,
            },
        ),
        Badge::new(
            "marathon_speaker",
            "Marathon Speaker",
            "Complete 50 practice sessions",
            BadgeRequirement::SessionCount {
                required_sessions: 50,
            },
        ),
        Badge::new(
            "week_warrior",
            "Week Warrior",
            "Practice 7 days in a row",
            BadgeRequirement::Streak { required_streak: 7 },
        ),
        Badge::new(
            "monthly_master",
            "Monthly Master",
            "Practice 30 days in a row",
            BadgeRequirement::Streak {
                required_streak: 30,
            },
        ),
    ]
}

/// Whether a progress snapshot meets a badge's requirement
pub fn qualifies(progress: &ProgressSnapshot, requirement: &BadgeRequirement) -> bool {
    match requirement {
        BadgeRequirement::SessionCount { required_sessions } => {
            progress.total_sessions >= *required_sessions
        }
        BadgeRequirement::Streak { required_streak } => {
            progress.current_streak >= *required_streak
        }
        BadgeRequirement::Score { required_score } => {
            progress.average_scores.overall() >= *required_score
        }
    }
}

/// Badges newly earned by this progress, in catalog order
pub fn evaluate(
    progress: &ProgressSnapshot,
    catalog: &[Badge],
    already_earned: &HashSet<BadgeId>,
) -> Vec<Badge> {
    catalog
        .iter()
        .filter(|badge| !already_earned.contains(&badge.id))
        .filter(|badge| qualifies(progress, &badge.requirement))
        .cloned()
        .collect()
}

/// Receives badges as they are awarded
pub trait BadgeNotifier: Send + Sync {
    fn badge_earned(&self, user_id: &UserId, badge: &Badge);
}

/// Logs each award
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl BadgeNotifier for TracingNotifier {
    fn badge_earned(&self, user_id: &UserId, badge: &Badge) {
        info!("User {} earned badge '{}' ({})", user_id, badge.name, badge.id);
    }
}

/// Evaluates a user's progress against the stored catalog and records new awards
pub struct BadgeAwarder {
    storage: Arc<Storage>,
    notifier: Arc<dyn BadgeNotifier>,
}

impl BadgeAwarder {
    pub fn new(storage: Arc<Storage>, notifier: Arc<dyn BadgeNotifier>) -> Self {
        Self { storage, notifier }
    }

    /// An awarder that reports through `tracing`
    pub fn with_tracing(storage: Arc<Storage>) -> Self {
        Self::new(storage, Arc::new(TracingNotifier))
    }

    /// Award every badge the progress newly qualifies for.
    ///
    /// Returns only the badges this call actually inserted; an award that a concurrent
    /// call got to first is skipped and not notified twice.
    pub fn award(&self, user_id: &UserId, progress: &ProgressSnapshot) -> Result<Vec<Badge>> {
        let catalog = self.storage.get_badge_catalog()?;
        let earned = self.storage.get_earned_badge_ids(user_id)?;
        let candidates = evaluate(progress, &catalog, &earned);

        let earned_at = Utc::now();
        let mut awarded = Vec::with_capacity(candidates.len());
        for badge in candidates {
            if self.storage.award_badge(user_id, &badge.id, earned_at)? {
                self.notifier.badge_earned(user_id, &badge);
                awarded.push(badge);
            } else {
                debug!("Badge {} already awarded to user {}", badge.id, user_id);
            }
        }

        Ok(awarded)
    }
}
