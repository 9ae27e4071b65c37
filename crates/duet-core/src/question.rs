//! Question content and the provider capability consumed by sessions.

use serde::{Deserialize, Serialize};

use crate::rng::DeterministicRng;

/// A single prompt shown to both participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// The question itself.
    pub text: String,
    /// Short description helping participants interpret the question.
    #[serde(default)]
    pub hint: String,
}

impl Question {
    /// Creates a question.
    #[must_use]
    pub fn new(text: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hint: hint.into(),
        }
    }
}

/// Source of question sequences.
///
/// Implementations must not have side effects: given the same rng state
/// they return the same selection.
pub trait QuestionProvider: Send + Sync {
    /// Picks up to `count` questions in a pseudo-random order.
    fn select_questions(&self, count: usize, rng: &mut dyn DeterministicRng) -> Vec<Question>;
}
