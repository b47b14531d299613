//! Runtime configuration
//!
//! Resolved from defaults, then environment variables, then the settings table in
//! storage. Later sources win.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::prompt::SCORING_TEMPERATURE;
use crate::providers::{
    OPENAI_API_BASE, OpenAIScoringProvider, OpenAITranscriptionProvider,
    OpenRouterScoringProvider, ScoringProvider, TranscriptionProvider,
};
use crate::storage::{
    SETTING_OPENAI_API_KEY, SETTING_OPENROUTER_API_KEY, SETTING_REQUEST_TIMEOUT_SECS,
    SETTING_SCORING_MODEL, SETTING_SCORING_PROVIDER, SETTING_ZERO_DURATION_POLICY, Storage,
};

pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";
pub const ENV_SCORING_PROVIDER: &str = "COACH_SCORING_PROVIDER";
pub const ENV_SCORING_MODEL: &str = "COACH_SCORING_MODEL";
pub const ENV_SCORING_MAX_TOKENS: &str = "COACH_SCORING_MAX_TOKENS";
pub const ENV_TRANSCRIPTION_MODEL: &str = "COACH_TRANSCRIPTION_MODEL";
pub const ENV_API_BASE: &str = "COACH_API_BASE";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "COACH_REQUEST_TIMEOUT_SECS";
pub const ENV_ZERO_DURATION_POLICY: &str = "COACH_ZERO_DURATION_POLICY";
pub const ENV_DB_PATH: &str = "COACH_DB_PATH";

const DEFAULT_SCORING_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Which backend scores transcripts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringBackend {
    #[default]
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "openrouter")]
    OpenRouter,
}

impl ScoringBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "openrouter" => Ok(Self::OpenRouter),
            other => Err(Error::Config(format!("unknown scoring provider '{other}'"))),
        }
    }
}

/// What feedback generation does with a session whose duration is zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroDurationPolicy {
    /// Score the session anyway and report 0 words per minute
    #[default]
    DefaultToZero,
    /// Refuse with `InvalidInput`
    Reject,
}

impl ZeroDurationPolicy {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "default_to_zero" | "zero" => Ok(Self::DefaultToZero),
            "reject" => Ok(Self::Reject),
            other => Err(Error::Config(format!(
                "unknown zero-duration policy '{other}'"
            ))),
        }
    }
}

/// Resolved configuration for the coaching core
#[derive(Debug, Clone)]
pub struct CoachConfig {
    pub openai_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub scoring_backend: ScoringBackend,
    pub scoring_model: String,
    /// Sampling temperature for scoring requests
    pub scoring_temperature: f32,
    /// Cap on generated tokens per scoring call; `None` leaves it to the provider
    pub scoring_max_tokens: Option<u32>,
    pub transcription_model: String,
    /// API root for OpenAI-compatible endpoints
    pub api_base: String,
    /// Upper bound on a single upstream call; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
    pub zero_duration_policy: ZeroDurationPolicy,
    /// SQLite file opened by [`Storage::from_config`]; in-memory when unset
    pub database_path: Option<PathBuf>,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openrouter_api_key: None,
            scoring_backend: ScoringBackend::default(),
            scoring_model: DEFAULT_SCORING_MODEL.to_string(),
            scoring_temperature: SCORING_TEMPERATURE,
            scoring_max_tokens: None,
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            api_base: OPENAI_API_BASE.to_string(),
            request_timeout: Some(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            zero_duration_policy: ZeroDurationPolicy::default(),
            database_path: None,
        }
    }
}

impl CoachConfig {
    /// Defaults overlaid with process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(key) = get(ENV_OPENAI_API_KEY) {
            config.openai_api_key = Some(key);
        }
        if let Some(key) = get(ENV_OPENROUTER_API_KEY) {
            config.openrouter_api_key = Some(key);
        }
        if let Some(backend) = get(ENV_SCORING_PROVIDER) {
            config.scoring_backend = ScoringBackend::parse(&backend)?;
        }
        if let Some(model) = get(ENV_SCORING_MODEL) {
            config.scoring_model = model;
        }
        if let Some(max) = get(ENV_SCORING_MAX_TOKENS) {
            config.scoring_max_tokens = parse_max_tokens(&max)?;
        }
        if let Some(model) = get(ENV_TRANSCRIPTION_MODEL) {
            config.transcription_model = model;
        }
        if let Some(base) = get(ENV_API_BASE) {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(secs) = get(ENV_REQUEST_TIMEOUT_SECS) {
            config.request_timeout = parse_timeout(&secs)?;
        }
        if let Some(policy) = get(ENV_ZERO_DURATION_POLICY) {
            config.zero_duration_policy = ZeroDurationPolicy::parse(&policy)?;
        }
        if let Some(path) = get(ENV_DB_PATH) {
            config.database_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    /// Overlay values saved in the settings table
    pub fn apply_settings(&mut self, storage: &Storage) -> Result<()> {
        if let Some(key) = storage.get_setting(SETTING_OPENAI_API_KEY)? {
            self.openai_api_key = Some(key);
        }
        if let Some(key) = storage.get_setting(SETTING_OPENROUTER_API_KEY)? {
            self.openrouter_api_key = Some(key);
        }
        if let Some(backend) = storage.get_setting(SETTING_SCORING_PROVIDER)? {
            self.scoring_backend = ScoringBackend::parse(&backend)?;
        }
        if let Some(model) = storage.get_setting(SETTING_SCORING_MODEL)? {
            self.scoring_model = model;
        }
        if let Some(secs) = storage.get_setting(SETTING_REQUEST_TIMEOUT_SECS)? {
            self.request_timeout = parse_timeout(&secs)?;
        }
        if let Some(policy) = storage.get_setting(SETTING_ZERO_DURATION_POLICY)? {
            self.zero_duration_policy = ZeroDurationPolicy::parse(&policy)?;
        }

        debug!("Applied stored settings to configuration");
        Ok(())
    }

    /// Build the configured scoring provider
    pub fn scoring_provider(&self) -> Result<Arc<dyn ScoringProvider>> {
        let provider: Arc<dyn ScoringProvider> = match self.scoring_backend {
            ScoringBackend::OpenAI => Arc::new(OpenAIScoringProvider::from_config(self)),
            ScoringBackend::OpenRouter => Arc::new(OpenRouterScoringProvider::from_config(self)),
        };

        if !provider.is_configured() {
            return Err(Error::ProviderNotConfigured(format!(
                "{} API key not set",
                provider.name()
            )));
        }

        Ok(provider)
    }

    /// Build the configured transcription provider
    pub fn transcription_provider(&self) -> Result<Arc<dyn TranscriptionProvider>> {
        let provider = OpenAITranscriptionProvider::from_config(self);
        if !provider.is_configured() {
            return Err(Error::ProviderNotConfigured(
                "OpenAI API key not set".to_string(),
            ));
        }
        Ok(Arc::new(provider))
    }
}

/// "0" disables the timeout
fn parse_timeout(value: &str) -> Result<Option<Duration>> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid request timeout '{value}'")))?;

    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}

/// "0" removes the cap
fn parse_max_tokens(value: &str) -> Result<Option<u32>> {
    let max: u32 = value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid max tokens '{value}'")))?;

    Ok((max > 0).then_some(max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CoachConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.scoring_backend, ScoringBackend::OpenAI);
        assert_eq!(config.scoring_model, "gpt-4o-mini");
        assert_eq!(config.api_base, OPENAI_API_BASE);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.zero_duration_policy, ZeroDurationPolicy::DefaultToZero);
        assert!(config.openai_api_key.is_none());
        assert!(config.scoring_max_tokens.is_none());
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let config = CoachConfig::from_lookup(lookup(&[
            (ENV_OPENAI_API_KEY, "sk-test"),
            (ENV_SCORING_PROVIDER, "OpenRouter"),
            (ENV_SCORING_MODEL, "openai/gpt-4o"),
            (ENV_API_BASE, "http://localhost:8080/v1/"),
            (ENV_REQUEST_TIMEOUT_SECS, "0"),
            (ENV_ZERO_DURATION_POLICY, "reject"),
            (ENV_DB_PATH, "/tmp/coach.db"),
            (ENV_SCORING_MAX_TOKENS, "800"),
        ]))
        .unwrap();

        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.scoring_backend, ScoringBackend::OpenRouter);
        assert_eq!(config.scoring_model, "openai/gpt-4o");
        assert_eq!(config.api_base, "http://localhost:8080/v1");
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.zero_duration_policy, ZeroDurationPolicy::Reject);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/coach.db")));
        assert_eq!(config.scoring_max_tokens, Some(800));
    }

    #[test]
    fn test_blank_values_ignored() {
        let config = CoachConfig::from_lookup(lookup(&[(ENV_OPENAI_API_KEY, "  ")])).unwrap();
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = CoachConfig::from_lookup(lookup(&[(ENV_REQUEST_TIMEOUT_SECS, "soon")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = CoachConfig::from_lookup(lookup(&[(ENV_SCORING_PROVIDER, "carrier-pigeon")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = CoachConfig::from_lookup(lookup(&[(ENV_SCORING_MAX_TOKENS, "-1")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_stored_settings_win() {
        let storage = Storage::in_memory().unwrap();
        storage.set_setting(SETTING_OPENAI_API_KEY, "sk-stored").unwrap();
        storage.set_setting(SETTING_REQUEST_TIMEOUT_SECS, "15").unwrap();

        let mut config =
            CoachConfig::from_lookup(lookup(&[(ENV_OPENAI_API_KEY, "sk-env")])).unwrap();
        config.apply_settings(&storage).unwrap();

        assert_eq!(config.openai_api_key.as_deref(), Some("sk-stored"));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_scoring_provider_requires_key() {
        let config = CoachConfig::default();
        assert!(matches!(
            config.scoring_provider(),
            Err(Error::ProviderNotConfigured(_))
        ));

        let config = CoachConfig {
            openai_api_key: Some("sk-test".to_string()),
            ..CoachConfig::default()
        };
        let provider = config.scoring_provider().unwrap();
        assert_eq!(provider.name(), "OpenAI GPT");
        assert!(provider.supports_structured_output());
    }
}
