//! Practice session lifecycle: start, record transcripts, look up

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::providers::TranscriptionResponse;
use crate::storage::Storage;
use crate::types::{ScenarioId, Session, SessionId, UserId};

/// Default page size for session listings
pub const DEFAULT_SESSION_LIMIT: usize = 20;

pub struct SessionService {
    storage: Arc<Storage>,
}

impl SessionService {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Start an empty session for a scenario
    pub fn start_session(&self, user_id: &UserId, scenario_id: ScenarioId) -> Result<Session> {
        let session = Session::new(*user_id, scenario_id);
        self.storage.save_session(&session)?;
        info!("Started session {} for user {}", session.id, user_id);
        Ok(session)
    }

    /// Replace both transcripts and the duration. Refused once feedback exists.
    pub fn update_transcripts(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
        user_transcript: &str,
        ai_transcript: &str,
        duration_seconds: f64,
    ) -> Result<Session> {
        validate_duration(duration_seconds)?;
        self.storage.update_session_transcripts(
            session_id,
            user_id,
            user_transcript,
            Some(ai_transcript),
            duration_seconds,
        )?;
        self.get_session(user_id, session_id)
    }

    /// Store a speech-to-text result as the user's transcript, with the duration rounded
    /// to whole seconds. The AI transcript is left as is.
    pub fn apply_transcription(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
        transcription: &TranscriptionResponse,
    ) -> Result<Session> {
        let duration = transcription.duration_seconds.round();
        validate_duration(duration)?;

        self.storage.update_session_transcripts(
            session_id,
            user_id,
            transcription.text.trim(),
            None,
            duration,
        )?;
        debug!(
            "Applied transcription to session {} ({} words, {}s)",
            session_id,
            transcription.words.len(),
            duration
        );
        self.get_session(user_id, session_id)
    }

    pub fn get_session(&self, user_id: &UserId, session_id: &SessionId) -> Result<Session> {
        self.storage
            .get_session_for_user(session_id, user_id)?
            .ok_or_else(|| Error::NotFound(format!("session {session_id}")))
    }

    /// A user's most recent sessions, newest first
    pub fn list_sessions(&self, user_id: &UserId, limit: usize) -> Result<Vec<Session>> {
        self.storage.get_user_sessions(user_id, limit)
    }
}

fn validate_duration(duration_seconds: f64) -> Result<()> {
    if !duration_seconds.is_finite() || duration_seconds < 0.0 {
        return Err(Error::InvalidInput(format!(
            "duration must be a non-negative number of seconds, got {duration_seconds}"
        )));
    }
    Ok(())
}
