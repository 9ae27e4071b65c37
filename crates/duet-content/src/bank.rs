//! The question bank and its selection policy.

use std::fs;
use std::path::Path;

use duet_core::question::{Question, QuestionProvider};
use duet_core::rng::DeterministicRng;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ContentError;

const BUILT_IN_BANK: &str = include_str!("../assets/questions.yaml");

#[derive(Debug, Deserialize)]
struct BankDocument {
    questions: Vec<Question>,
}

/// Static list of questions that sessions draw from.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Builds a bank from already-loaded questions, skipping blank entries.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Empty` if no question has non-blank text.
    pub fn new(questions: Vec<Question>) -> Result<Self, ContentError> {
        let questions: Vec<Question> = questions
            .into_iter()
            .filter(|q| !q.text.trim().is_empty())
            .collect();
        if questions.is_empty() {
            return Err(ContentError::Empty);
        }
        Ok(Self { questions })
    }

    /// Parses a YAML document of the form `questions: [{text, hint}]`.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Parse` for malformed YAML and
    /// `ContentError::Empty` when no questions remain.
    pub fn from_yaml(document: &str) -> Result<Self, ContentError> {
        let parsed: BankDocument = serde_yaml::from_str(document)?;
        Self::new(parsed.questions)
    }

    /// Loads a bank from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Io` if the file cannot be read, otherwise the
    /// errors of [`QuestionBank::from_yaml`].
    pub fn from_path(path: &Path) -> Result<Self, ContentError> {
        let document = fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let bank = Self::from_yaml(&document)?;
        info!(path = %path.display(), questions = bank.len(), "loaded question bank");
        Ok(bank)
    }

    /// The bank compiled into the binary.
    ///
    /// # Errors
    ///
    /// Only fails if the embedded asset is broken.
    pub fn built_in() -> Result<Self, ContentError> {
        Self::from_yaml(BUILT_IN_BANK)
    }

    /// Number of questions in the bank.
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the bank is empty. Always false for a constructed bank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl QuestionProvider for QuestionBank {
    /// Partial Fisher–Yates shuffle: the first `count` slots of a shuffled
    /// copy. Never repeats a question; returns the whole bank when `count`
    /// exceeds it.
    #[allow(clippy::cast_possible_truncation)]
    fn select_questions(&self, count: usize, rng: &mut dyn DeterministicRng) -> Vec<Question> {
        let take = count.min(self.questions.len());
        let mut pool: Vec<&Question> = self.questions.iter().collect();
        let last = (pool.len() - 1) as u32;
        for i in 0..take {
            let j = rng.next_u32_range(i as u32, last) as usize;
            pool.swap(i, j);
        }
        debug!(requested = count, selected = take, "selected questions");
        pool.into_iter().take(take).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use duet_core::rng::SystemRng;
    use duet_test_support::{MockRng, SequenceRng, numbered_questions};

    use super::*;

    #[test]
    fn test_built_in_bank_has_enough_questions_for_a_default_session() {
        let bank = QuestionBank::built_in().unwrap();
        assert!(bank.len() >= 10);
    }

    #[test]
    fn test_from_yaml_skips_blank_questions() {
        // Arrange
        let yaml = "questions:\n  - text: First?\n    hint: one\n  - text: '  '\n  - text: Second?\n";

        // Act
        let bank = QuestionBank::from_yaml(yaml).unwrap();

        // Assert
        assert_eq!(bank.len(), 2);
        let selected = bank.select_questions(2, &mut MockRng);
        assert_eq!(selected[1].hint, "");
    }

    #[test]
    fn test_from_yaml_rejects_empty_bank() {
        let result = QuestionBank::from_yaml("questions: []");
        assert!(matches!(result, Err(ContentError::Empty)));
    }

    #[test]
    fn test_from_yaml_rejects_malformed_document() {
        let result = QuestionBank::from_yaml("questions: {text: nope");
        assert!(matches!(result, Err(ContentError::Parse(_))));
    }

    #[test]
    fn test_from_path_reports_missing_file() {
        let result = QuestionBank::from_path(Path::new("/definitely/not/here.yaml"));
        assert!(matches!(result, Err(ContentError::Io { .. })));
    }

    #[test]
    fn test_select_questions_follows_rng_swaps() {
        // Arrange
        let bank = QuestionBank::new(numbered_questions(4)).unwrap();
        // Swap slot 0 with 3, then slot 1 with 1.
        let mut rng = SequenceRng::new(vec![3, 1]);

        // Act
        let selected = bank.select_questions(2, &mut rng);

        // Assert
        let texts: Vec<&str> = selected.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["question 3", "question 1"]);
    }

    #[test]
    fn test_select_questions_never_repeats() {
        let bank = QuestionBank::new(numbered_questions(30)).unwrap();
        let mut rng = SystemRng::seeded(11);

        let selected = bank.select_questions(10, &mut rng);

        let unique: HashSet<&str> = selected.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(selected.len(), 10);
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn test_select_questions_caps_at_bank_size() {
        let bank = QuestionBank::new(numbered_questions(3)).unwrap();

        let selected = bank.select_questions(10, &mut MockRng);

        assert_eq!(selected.len(), 3);
    }
}
