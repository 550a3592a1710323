//! Error types for the CLI

use core_types::JsError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Lexing, parsing, deserializing or evaluation failed
    #[error(transparent)]
    Js(#[from] JsError),

    /// A source or JSON file could not be read
    #[error("Could not read '{}': {source}", .path.display())]
    Io {
        /// File that was requested
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// The JSON form could not be rendered
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The line editor failed
    #[error("REPL error: {0}")]
    Repl(String),
}

impl CliError {
    /// True for lex and parse errors, which the REPL treats as a possible
    /// request for more input.
    pub fn is_syntax_error(&self) -> bool {
        matches!(self, CliError::Js(JsError::Lex { .. } | JsError::Parse { .. }))
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
