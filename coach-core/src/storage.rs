//! SQLite storage layer for sessions, feedback, badges and settings

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use crate::badges::default_catalog;
use crate::config::CoachConfig;
use crate::error::{Error, Result};
use crate::migrations::run_migrations;
use crate::types::{
    Badge, BadgeId, BadgeRequirement, Feedback, Session, SessionId, SessionRecord, UserBadge,
    UserId,
};

/// Storage backend using SQLite
pub struct Storage {
    conn: Mutex<Connection>,
}

pub const SETTING_OPENAI_API_KEY: &str = "openai_api_key";
pub const SETTING_OPENROUTER_API_KEY: &str = "openrouter_api_key";
/// Scoring backend: "openai" (default) | "openrouter"
pub const SETTING_SCORING_PROVIDER: &str = "scoring_provider";
pub const SETTING_SCORING_MODEL: &str = "scoring_model";
pub const SETTING_REQUEST_TIMEOUT_SECS: &str = "request_timeout_secs";
/// "default_to_zero" (default) | "reject"
pub const SETTING_ZERO_DURATION_POLICY: &str = "zero_duration_policy";

const SESSION_COLUMNS: &str = "s.id, s.user_id, s.scenario_id, s.transcript, s.ai_transcript, \
     s.duration_seconds, s.created_at";

const FEEDBACK_COLUMNS: &str = "f.id, f.session_id, f.clarity_score, f.confidence_score, \
     f.empathy_score, f.pacing_score, f.filler_count, f.words_per_minute, f.summary, \
     f.strengths, f.improvements, f.practice_drill, f.detailed_analysis, f.model, f.created_at";

/// Number of columns in `SESSION_COLUMNS`
const SESSION_COLUMN_COUNT: usize = 7;

impl Storage {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Create an in-memory database (useful for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Apply migrations and seed the badge catalog into an empty database
    /// Open the configured database file, creating its directory if needed, or an
    /// in-memory database when no path is set
    pub fn from_config(config: &CoachConfig) -> Result<Self> {
        let Some(path) = config.database_path.as_deref() else {
            debug!("No database path configured, using in-memory storage");
            return Self::in_memory();
        };

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        info!("Opening database at {}", path.display());
        Self::open(path)
    }

    fn init_schema(&self) -> Result<()> {
        {
            let conn = self.conn.lock();
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            run_migrations(&conn)?;
        }

        let badge_count: i64 = {
            let conn = self.conn.lock();
            conn.query_row("SELECT COUNT(*) FROM badges", [], |row| row.get(0))?
        };

        if badge_count == 0 {
            let catalog = default_catalog();
            for badge in &catalog {
                self.save_badge(badge)?;
            }
            debug!("Seeded {} default badges", catalog.len());
        }

        info!("Database schema initialized");
        Ok(())
    }

    // ========== Settings ==========

    /// Save or update a setting value
    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value, format_timestamp(&Utc::now())],
        )?;
        Ok(())
    }

    /// Get a setting value
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    // ========== Sessions ==========

    /// Save a new session
    pub fn save_session(&self, session: &Session) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO sessions (id, user_id, scenario_id, transcript, ai_transcript,
                                  duration_seconds, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                session.id.to_string(),
                session.user_id.to_string(),
                session.scenario_id.to_string(),
                session.transcript,
                session.ai_transcript,
                session.duration_seconds,
                format_timestamp(&session.created_at),
            ],
        )?;
        debug!("Saved session {}", session.id);
        Ok(())
    }

    /// Get a session, but only if it belongs to the given user
    pub fn get_session_for_user(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> Result<Option<Session>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions s WHERE s.id = ?1 AND s.user_id = ?2"),
            params![session_id.to_string(), user_id.to_string()],
            |row| session_from_row(row, 0),
        )
        .optional()
        .map_err(Into::into)
    }

    /// Replace a session's transcripts and duration.
    ///
    /// `ai_transcript` of `None` leaves the stored AI transcript untouched. Fails with
    /// `NotFound` if the user doesn't own the session and `Conflict` once feedback exists.
    pub fn update_session_transcripts(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        transcript: &str,
        ai_transcript: Option<&str>,
        duration_seconds: f64,
    ) -> Result<()> {
        let conn = self.conn.lock();
        let id = session_id.to_string();

        let owned: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sessions WHERE id = ?1 AND user_id = ?2)",
            params![id, user_id.to_string()],
            |row| row.get(0),
        )?;
        if !owned {
            return Err(Error::NotFound(format!("session {session_id}")));
        }

        if feedback_exists(&conn, &id)? {
            return Err(Error::Conflict(format!(
                "session {session_id} already has feedback"
            )));
        }

        conn.execute(
            r#"
            UPDATE sessions
            SET transcript = ?2,
                ai_transcript = COALESCE(?3, ai_transcript),
                duration_seconds = ?4
            WHERE id = ?1
            "#,
            params![id, transcript, ai_transcript, duration_seconds],
        )?;
        debug!("Updated transcripts for session {}", session_id);
        Ok(())
    }

    /// Get a user's sessions, newest first
    pub fn get_user_sessions(&self, user_id: &UserId, limit: usize) -> Result<Vec<Session>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM sessions s
            WHERE s.user_id = ?1
            ORDER BY s.created_at DESC, s.rowid DESC
            LIMIT ?2
            "#
        ))?;

        let sessions = stmt
            .query_map(params![user_id.to_string(), limit as i64], |row| {
                session_from_row(row, 0)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    /// Every session a user has, each with its feedback if generated, oldest first
    pub fn get_session_history(&self, user_id: &UserId) -> Result<Vec<SessionRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {SESSION_COLUMNS}, {FEEDBACK_COLUMNS}
            FROM sessions s
            LEFT JOIN feedback f ON f.session_id = s.id
            WHERE s.user_id = ?1
            ORDER BY s.created_at ASC, s.rowid ASC
            "#
        ))?;

        let records = stmt
            .query_map(params![user_id.to_string()], |row| {
                let session = session_from_row(row, 0)?;
                let feedback_id: Option<String> = row.get(SESSION_COLUMN_COUNT)?;
                let feedback = match feedback_id {
                    Some(_) => Some(feedback_from_row(row, SESSION_COLUMN_COUNT)?),
                    None => None,
                };
                Ok(SessionRecord { session, feedback })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    // ========== Feedback ==========

    /// Persist a feedback report. A second report for the same session is a `Conflict`;
    /// the existing row is never overwritten.
    pub fn save_feedback(&self, feedback: &Feedback) -> Result<()> {
        let strengths = serde_json::to_string(&feedback.strengths)?;
        let improvements = serde_json::to_string(&feedback.improvements)?;
        let detailed_analysis = serde_json::to_string(&feedback.detailed_analysis)?;

        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO feedback (id, session_id, clarity_score, confidence_score, empathy_score,
                                  pacing_score, filler_count, words_per_minute, summary,
                                  strengths, improvements, practice_drill, detailed_analysis,
                                  model, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                feedback.id.to_string(),
                feedback.session_id.to_string(),
                feedback.clarity_score,
                feedback.confidence_score,
                feedback.empathy_score,
                feedback.pacing_score,
                feedback.filler_count,
                feedback.words_per_minute,
                feedback.summary,
                strengths,
                improvements,
                feedback.practice_drill,
                detailed_analysis,
                feedback.model,
                format_timestamp(&feedback.created_at),
            ],
        )
        .map_err(|e| {
            if Error::is_unique_violation(&e) {
                Error::Conflict(format!(
                    "feedback already exists for session {}",
                    feedback.session_id
                ))
            } else {
                e.into()
            }
        })?;

        debug!("Saved feedback {} for session {}", feedback.id, feedback.session_id);
        Ok(())
    }

    /// Get the feedback generated for a session, if any
    pub fn get_feedback_for_session(&self, session_id: &SessionId) -> Result<Option<Feedback>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {FEEDBACK_COLUMNS} FROM feedback f WHERE f.session_id = ?1"),
            params![session_id.to_string()],
            |row| feedback_from_row(row, 0),
        )
        .optional()
        .map_err(Into::into)
    }

    /// Whether feedback has been generated for a session
    pub fn has_feedback(&self, session_id: &SessionId) -> Result<bool> {
        let conn = self.conn.lock();
        feedback_exists(&conn, &session_id.to_string())
    }

    /// Number of feedback rows for a session (0 or 1)
    pub fn count_feedback(&self, session_id: &SessionId) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM feedback WHERE session_id = ?1",
            params![session_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ========== Badges ==========

    /// Insert a catalog badge, or update it in place keeping its catalog position.
    /// New badges are appended to the end of the catalog.
    pub fn save_badge(&self, badge: &Badge) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO badges (id, name, description, icon, badge_type, threshold, position)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6,
                    (SELECT COALESCE(MAX(position), -1) + 1 FROM badges))
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                icon = excluded.icon,
                badge_type = excluded.badge_type,
                threshold = excluded.threshold
            "#,
            params![
                badge.id,
                badge.name,
                badge.description,
                badge.icon,
                badge.requirement.kind(),
                badge.requirement.threshold(),
            ],
        )?;
        debug!("Saved badge {}", badge.id);
        Ok(())
    }

    /// The badge catalog in catalog order
    pub fn get_badge_catalog(&self) -> Result<Vec<Badge>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, description, icon, badge_type, threshold
            FROM badges
            ORDER BY position ASC
            "#,
        )?;

        let badges = stmt
            .query_map([], |row| {
                let kind: String = row.get(4)?;
                let threshold: f64 = row.get(5)?;
                let requirement = BadgeRequirement::from_parts(&kind, threshold).ok_or_else(
                    || {
                        rusqlite::Error::FromSqlConversionFailure(
                            4,
                            Type::Text,
                            format!("unknown badge type '{kind}'").into(),
                        )
                    },
                )?;

                Ok(Badge {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    icon: row.get(3)?,
                    requirement,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(badges)
    }

    /// Remove a badge from the catalog (and every award of it)
    pub fn delete_badge(&self, badge_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute("DELETE FROM badges WHERE id = ?1", params![badge_id])?;
        if rows > 0 {
            debug!("Deleted badge {}", badge_id);
        }
        Ok(rows > 0)
    }

    /// Record that a user earned a badge. Returns false when the award already existed.
    pub fn award_badge(
        &self,
        user_id: &UserId,
        badge_id: &str,
        earned_at: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            r#"
            INSERT OR IGNORE INTO user_badges (user_id, badge_id, earned_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![user_id.to_string(), badge_id, format_timestamp(&earned_at)],
        )?;

        if rows > 0 {
            debug!("Awarded badge {} to user {}", badge_id, user_id);
        }
        Ok(rows > 0)
    }

    /// Ids of every badge a user has earned
    pub fn get_earned_badge_ids(&self, user_id: &UserId) -> Result<HashSet<BadgeId>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT badge_id FROM user_badges WHERE user_id = ?1")?;
        let ids: HashSet<BadgeId> = stmt
            .query_map(params![user_id.to_string()], |row| row.get(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    /// A user's awards in the order they were earned
    pub fn get_user_badges(&self, user_id: &UserId) -> Result<Vec<UserBadge>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT ub.user_id, ub.badge_id, ub.earned_at
            FROM user_badges ub
            JOIN badges b ON b.id = ub.badge_id
            WHERE ub.user_id = ?1
            ORDER BY ub.earned_at ASC, b.position ASC
            "#,
        )?;

        let badges = stmt
            .query_map(params![user_id.to_string()], |row| {
                let user_id: String = row.get(0)?;
                let earned_at: String = row.get(2)?;
                Ok(UserBadge {
                    user_id: parse_uuid(0, &user_id)?,
                    badge_id: row.get(1)?,
                    earned_at: parse_timestamp(2, &earned_at)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(badges)
    }
}

fn feedback_exists(conn: &Connection, session_id: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM feedback WHERE session_id = ?1)",
        params![session_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_uuid(idx: usize, value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_json<T: DeserializeOwned>(idx: usize, value: &str) -> rusqlite::Result<T> {
    serde_json::from_str(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn session_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Session> {
    let id: String = row.get(offset)?;
    let user_id: String = row.get(offset + 1)?;
    let scenario_id: String = row.get(offset + 2)?;
    let created_at: String = row.get(offset + 6)?;

    Ok(Session {
        id: parse_uuid(offset, &id)?,
        user_id: parse_uuid(offset + 1, &user_id)?,
        scenario_id: parse_uuid(offset + 2, &scenario_id)?,
        transcript: row.get(offset + 3)?,
        ai_transcript: row.get(offset + 4)?,
        duration_seconds: row.get(offset + 5)?,
        created_at: parse_timestamp(offset + 6, &created_at)?,
    })
}

fn feedback_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Feedback> {
    let id: String = row.get(offset)?;
    let session_id: String = row.get(offset + 1)?;
    let strengths: String = row.get(offset + 9)?;
    let improvements: String = row.get(offset + 10)?;
    let detailed_analysis: String = row.get(offset + 12)?;
    let created_at: String = row.get(offset + 14)?;

    Ok(Feedback {
        id: parse_uuid(offset, &id)?,
        session_id: parse_uuid(offset + 1, &session_id)?,
        clarity_score: row.get(offset + 2)?,
        confidence_score: row.get(offset + 3)?,
        empathy_score: row.get(offset + 4)?,
        pacing_score: row.get(offset + 5)?,
        filler_count: row.get(offset + 6)?,
        words_per_minute: row.get(offset + 7)?,
        summary: row.get(offset + 8)?,
        strengths: parse_json(offset + 9, &strengths)?,
        improvements: parse_json(offset + 10, &improvements)?,
        practice_drill: row.get(offset + 11)?,
        detailed_analysis: parse_json(offset + 12, &detailed_analysis)?,
        model: row.get(offset + 13)?,
        created_at: parse_timestamp(offset + 14, &created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DetailedAnalysis, FillerWordCount};

    fn sample_feedback(session_id: SessionId) -> Feedback {
        Feedback {
            id: Uuid::new_v4(),
            session_id,
            clarity_score: 7.5,
            confidence_score: 6.0,
            empathy_score: 8.0,
            pacing_score: 5.5,
            filler_count: 2,
            words_per_minute: 140,
            summary: "Solid opener.".to_string(),
            strengths: vec!["Warm greeting".to_string()],
            improvements: vec!["Fewer fillers".to_string()],
            practice_drill: "Pause instead of saying um.".to_string(),
            detailed_analysis: DetailedAnalysis {
                filler_words: vec![FillerWordCount {
                    word: "um".to_string(),
                    count: 2,
                }],
                tone_analysis: "Friendly".to_string(),
                structure_quality: "Clear".to_string(),
                question_ratio: 25.0,
                active_listening_score: 8.0,
            },
            model: Some("gpt-4o-mini".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_settings_roundtrip() {
        let storage = Storage::in_memory().unwrap();

        storage
            .set_setting(SETTING_OPENAI_API_KEY, "test-key")
            .unwrap();
        storage.set_setting(SETTING_OPENAI_API_KEY, "new-key").unwrap();

        let value = storage.get_setting(SETTING_OPENAI_API_KEY).unwrap();
        assert_eq!(value, Some("new-key".to_string()));
        assert_eq!(storage.get_setting(SETTING_SCORING_MODEL).unwrap(), None);
    }

    #[test]
    fn test_session_ownership() {
        let storage = Storage::in_memory().unwrap();
        let owner = Uuid::new_v4();
        let session = Session::new(owner, Uuid::new_v4());
        storage.save_session(&session).unwrap();

        let found = storage.get_session_for_user(&session.id, &owner).unwrap();
        assert_eq!(found.map(|s| s.id), Some(session.id));

        let stranger = Uuid::new_v4();
        assert!(storage
            .get_session_for_user(&session.id, &stranger)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_update_transcripts_keeps_ai_transcript_when_absent() {
        let storage = Storage::in_memory().unwrap();
        let user = Uuid::new_v4();
        let session = Session::new(user, Uuid::new_v4());
        storage.save_session(&session).unwrap();

        storage
            .update_session_transcripts(&session.id, &user, "Hi there", Some("Hello!"), 4.0)
            .unwrap();
        storage
            .update_session_transcripts(&session.id, &user, "Hi there, how are you", None, 9.0)
            .unwrap();

        let stored = storage
            .get_session_for_user(&session.id, &user)
            .unwrap()
            .unwrap();
        assert_eq!(stored.transcript, "Hi there, how are you");
        assert_eq!(stored.ai_transcript, "Hello!");
        assert_eq!(stored.duration_seconds, 9.0);
    }

    #[test]
    fn test_feedback_roundtrip_and_conflict() {
        let storage = Storage::in_memory().unwrap();
        let user = Uuid::new_v4();
        let session = Session::new(user, Uuid::new_v4());
        storage.save_session(&session).unwrap();

        let feedback = sample_feedback(session.id);
        storage.save_feedback(&feedback).unwrap();

        let stored = storage.get_feedback_for_session(&session.id).unwrap().unwrap();
        assert_eq!(stored.id, feedback.id);
        assert_eq!(stored.strengths, feedback.strengths);
        assert_eq!(stored.detailed_analysis, feedback.detailed_analysis);
        assert_eq!(stored.model, feedback.model);

        let err = storage.save_feedback(&sample_feedback(session.id)).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(storage.count_feedback(&session.id).unwrap(), 1);

        let err = storage
            .update_session_transcripts(&session.id, &user, "changed", None, 1.0)
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_default_catalog_seeded_in_order() {
        let storage = Storage::in_memory().unwrap();
        let ids: Vec<String> = storage
            .get_badge_catalog()
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();

        assert_eq!(
            ids,
            vec![
                "first_steps",
                "conversationalist",
                "marathon_speaker",
                "week_warrior",
                "monthly_master"
            ]
        );
    }

    #[test]
    fn test_save_badge_keeps_position_on_update() {
        let storage = Storage::in_memory().unwrap();

        let mut badge = storage.get_badge_catalog().unwrap().remove(0);
        badge.name = "Baby Steps".to_string();
        storage.save_badge(&badge).unwrap();

        storage
            .save_badge(&Badge::new(
                "high_achiever",
                "High Achiever",
                "Average 8 or better",
                BadgeRequirement::Score {
                    required_score: 8.0,
                },
            ))
            .unwrap();

        let catalog = storage.get_badge_catalog().unwrap();
        assert_eq!(catalog[0].name, "Baby Steps");
        assert_eq!(catalog.last().map(|b| b.id.as_str()), Some("high_achiever"));
    }

    #[test]
    fn test_award_badge_is_idempotent() {
        let storage = Storage::in_memory().unwrap();
        let user = Uuid::new_v4();

        assert!(storage.award_badge(&user, "first_steps", Utc::now()).unwrap());
        assert!(!storage.award_badge(&user, "first_steps", Utc::now()).unwrap());

        let earned = storage.get_earned_badge_ids(&user).unwrap();
        assert_eq!(earned.len(), 1);
        assert!(earned.contains("first_steps"));
        assert_eq!(storage.get_user_badges(&user).unwrap().len(), 1);
    }

    #[test]
    fn test_session_history_joins_feedback() {
        let storage = Storage::in_memory().unwrap();
        let user = Uuid::new_v4();

        let first = Session::new(user, Uuid::new_v4());
        let second = Session::new(user, Uuid::new_v4());
        storage.save_session(&first).unwrap();
        storage.save_session(&second).unwrap();
        storage.save_feedback(&sample_feedback(first.id)).unwrap();

        let history = storage.get_session_history(&user).unwrap();
        assert_eq!(history.len(), 2);
        let with_feedback = history.iter().filter(|r| r.feedback.is_some()).count();
        assert_eq!(with_feedback, 1);

        assert!(storage.get_session_history(&Uuid::new_v4()).unwrap().is_empty());
    }
}
