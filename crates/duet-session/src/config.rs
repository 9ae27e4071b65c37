//! Tunables for session creation and expiry.

use chrono::TimeDelta;

/// Default number of questions assigned to a new session.
pub const DEFAULT_QUESTIONS_PER_SESSION: usize = 10;

/// Default length of generated session tokens.
pub const DEFAULT_SESSION_ID_LENGTH: usize = 8;

/// Default idle period after which a session is reaped.
pub const DEFAULT_IDLE_TIMEOUT_SECS: i64 = 30 * 60;

/// Session behaviour knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How many questions each new session draws from the provider.
    pub questions_per_session: usize,
    /// Number of characters in a generated session token.
    pub session_id_length: usize,
    /// Sessions without activity for this long are closed. `None` disables
    /// reaping.
    pub idle_timeout: Option<TimeDelta>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            questions_per_session: DEFAULT_QUESTIONS_PER_SESSION,
            session_id_length: DEFAULT_SESSION_ID_LENGTH,
            idle_timeout: Some(TimeDelta::seconds(DEFAULT_IDLE_TIMEOUT_SECS)),
        }
    }
}
