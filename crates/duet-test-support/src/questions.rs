//! Question providers for tests.

use duet_core::question::{Question, QuestionProvider};
use duet_core::rng::DeterministicRng;

/// Builds `count` questions named `question 0`, `question 1`, ...
#[must_use]
pub fn numbered_questions(count: usize) -> Vec<Question> {
    (0..count)
        .map(|i| Question::new(format!("question {i}"), format!("hint {i}")))
        .collect()
}

/// A provider that ignores the rng and returns its questions in order.
#[derive(Debug, Clone)]
pub struct StaticQuestionProvider {
    questions: Vec<Question>,
}

impl StaticQuestionProvider {
    /// Creates a provider over the given questions.
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// Creates a provider with `count` numbered questions.
    #[must_use]
    pub fn numbered(count: usize) -> Self {
        Self::new(numbered_questions(count))
    }
}

impl QuestionProvider for StaticQuestionProvider {
    fn select_questions(&self, count: usize, _rng: &mut dyn DeterministicRng) -> Vec<Question> {
        self.questions.iter().take(count).cloned().collect()
    }
}
