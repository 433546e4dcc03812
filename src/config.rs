//! Process configuration read from the environment

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RELISTEN_DELAY_MS: u64 = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Which local synthesizer to use when remote speech is unavailable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalTts {
    /// Look for a known synthesizer on `PATH`
    Detect,
    Disabled,
    Program(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_url: String,
    pub db_path: PathBuf,
    pub http_timeout: Duration,
    pub relisten_delay: Duration,
    /// Overrides audio player detection; the payload is piped to its stdin
    pub audio_player: Option<String>,
    pub local_tts: LocalTts,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_url = get("TUTOR_API_URL").ok_or(ConfigError::Missing("TUTOR_API_URL"))?;

        let db_path = get("TUTOR_DB_PATH").map_or_else(
            || {
                let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.tutor-call/tutor.db"))
            },
            PathBuf::from,
        );

        let http_timeout = Duration::from_secs(parse_positive(
            "TUTOR_HTTP_TIMEOUT_SECS",
            get("TUTOR_HTTP_TIMEOUT_SECS"),
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);
        let relisten_delay = Duration::from_millis(parse_positive(
            "TUTOR_RELISTEN_DELAY_MS",
            get("TUTOR_RELISTEN_DELAY_MS"),
            DEFAULT_RELISTEN_DELAY_MS,
        )?);

        let local_tts = match get("TUTOR_LOCAL_TTS") {
            None => LocalTts::Detect,
            Some(v) if v.eq_ignore_ascii_case("none") => LocalTts::Disabled,
            Some(program) => LocalTts::Program(program),
        };

        Ok(Self {
            api_url,
            db_path,
            http_timeout,
            relisten_delay,
            audio_player: get("TUTOR_AUDIO_PLAYER"),
            local_tts,
        })
    }
}

fn parse_positive(
    name: &'static str,
    value: Option<String>,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber { name, value }),
    }
}
