//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use duet_session::SessionConfig;
use duet_session::config::{
    DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_QUESTIONS_PER_SESSION, DEFAULT_SESSION_ID_LENGTH,
};

use crate::error::AppError;

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 3001;

/// Default period between idle sweeps.
pub const DEFAULT_REAPER_INTERVAL_SECS: u64 = 60;

/// Everything the binary needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Session tunables.
    pub session: SessionConfig,
    /// YAML question bank; the built-in bank when `None`.
    pub question_bank_path: Option<PathBuf>,
    /// Period between idle sweeps.
    pub reaper_interval: Duration,
    /// Single allowed browser origin; any origin when `None`.
    pub cors_allowed_origin: Option<String>,
}

impl ServerConfig {
    /// Reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when a variable is present but invalid.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when a value is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let host = non_empty("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;

        let questions_per_session =
            parse_or(&lookup, "QUESTIONS_PER_SESSION", DEFAULT_QUESTIONS_PER_SESSION)?;
        if questions_per_session == 0 {
            return Err(AppError::Config(
                "QUESTIONS_PER_SESSION must be greater than zero".to_owned(),
            ));
        }
        let session_id_length = parse_or(&lookup, "SESSION_ID_LENGTH", DEFAULT_SESSION_ID_LENGTH)?;
        if session_id_length == 0 {
            return Err(AppError::Config(
                "SESSION_ID_LENGTH must be greater than zero".to_owned(),
            ));
        }

        let idle_secs: u32 = parse_or(
            &lookup,
            "SESSION_IDLE_TIMEOUT_SECS",
            u32::try_from(DEFAULT_IDLE_TIMEOUT_SECS).unwrap_or(u32::MAX),
        )?;
        let idle_timeout = (idle_secs > 0).then(|| TimeDelta::seconds(i64::from(idle_secs)));

        let reaper_secs = parse_or(&lookup, "REAPER_INTERVAL_SECS", DEFAULT_REAPER_INTERVAL_SECS)?;
        if reaper_secs == 0 {
            return Err(AppError::Config(
                "REAPER_INTERVAL_SECS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            host,
            port,
            session: SessionConfig {
                questions_per_session,
                session_id_length,
                idle_timeout,
            },
            question_bank_path: non_empty("QUESTION_BANK_PATH").map(PathBuf::from),
            reaper_interval: Duration::from_secs(reaper_secs),
            cors_allowed_origin: non_empty("CORS_ALLOWED_ORIGIN"),
        })
    }

    /// Socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `host:port` is not a valid address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        _ => Ok(default),
    }
}
