//! Duet: question content.
//!
//! Loads the question bank the server draws session questions from and
//! implements the pseudo-random selection used when a session is created.

pub mod bank;
pub mod error;

pub use bank::QuestionBank;
pub use error::ContentError;
