//! Duet API: HTTP and WebSocket surface of the session coordinator.

pub mod config;
pub mod error;
pub mod gateway;
pub mod routes;
pub mod state;
