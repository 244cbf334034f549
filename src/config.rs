//! Configuration, read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Runtime configuration for the bot.
#[derive(Debug, Clone)]
pub struct CoachConfig {
    /// Anthropic API key.
    pub api_key: SecretString,
    /// Model identifier for the Messages API.
    pub model: String,
    /// Completion token budget per reply.
    pub max_tokens: u32,
    /// Upper bound on one completion attempt.
    pub llm_timeout: Duration,
    /// Path of the local profile database.
    pub db_path: PathBuf,
    /// Webhook listen port.
    pub port: u16,
    /// Twilio credentials for fetching inbound media, when configured.
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<SecretString>,
}

impl CoachConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("ANTHROPIC_API_KEY".to_string()))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            model: std::env::var("MIKA_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
            max_tokens: env_parse_or("MIKA_MAX_TOKENS", 1024)?,
            llm_timeout: Duration::from_secs(env_parse_or("MIKA_LLM_TIMEOUT_SECS", 120u64)?),
            db_path: std::env::var("MIKA_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/mika.db")),
            port: env_parse_or("PORT", 5000)?,
            twilio_account_sid: std::env::var("TWILIO_ACCOUNT_SID").ok(),
            twilio_auth_token: std::env::var("TWILIO_AUTH_TOKEN")
                .ok()
                .map(SecretString::from),
        })
    }
}

/// Parse an env var, falling back to `default` when unset. An unparsable
/// value is a configuration error, not a silent fallback.
fn env_parse_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{e}"),
        }),
        Err(_) => Ok(default),
    }
}
