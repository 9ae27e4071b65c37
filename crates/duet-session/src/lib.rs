//! Duet: session lifecycle and turn/answer coordination.
//!
//! Owns the in-memory session table, the per-question answer state machine
//! and the create/join/leave lifecycle. Every mutation produces domain
//! events carrying their recipients; delivering them is the gateway's job.

pub mod application;
pub mod config;
pub mod domain;

pub use application::service::SessionService;
pub use config::SessionConfig;
