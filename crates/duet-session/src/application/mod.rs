//! Application layer: store, command handlers, queries and the service
//! facade the gateway drives.

pub mod command_handlers;
pub mod query_handlers;
pub mod service;
pub mod store;
