//! Shared application state.

use crate::gateway::GatewayHandle;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Sender side of the session coordinator.
    pub gateway: GatewayHandle,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(gateway: GatewayHandle) -> Self {
        Self { gateway }
    }
}
