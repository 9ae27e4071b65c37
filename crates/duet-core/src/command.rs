//! Command abstractions.

use uuid::Uuid;

use crate::ids::ConnectionId;

/// Trait that all session commands implement.
///
/// Every command originates from a single connection; errors raised while
/// handling it are reported back to that connection only.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;

    /// The connection that issued the command.
    fn issued_by(&self) -> ConnectionId;
}
