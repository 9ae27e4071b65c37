//! Messaging gateway: binds connections to session participants and fans
//! session events out to every connection they address.

pub mod coordinator;
pub mod protocol;
pub mod reaper;

pub use coordinator::{Coordinator, GatewayEvent, GatewayHandle, OUTBOX_CAPACITY, Outbox, outbox};
