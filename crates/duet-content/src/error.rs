//! Content loading errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a question bank.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The bank file could not be read.
    #[error("failed to read question bank {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The bank document is not valid YAML for the expected shape.
    #[error("failed to parse question bank: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The bank parsed but holds no usable questions.
    #[error("question bank contains no questions")]
    Empty,
}
