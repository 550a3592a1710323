//! Error types for lexing, parsing and evaluation.
//!
//! Lexer and parser errors are fatal to the current parse and carry source
//! coordinates. Evaluation errors abort the current `get`/`set` call and
//! propagate to the caller unless an in-language `try` intercepts them.

use crate::{SourcePosition, Value};
use std::fmt;

/// The kind of an evaluation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation applied to a value of the wrong type
    TypeError,
    /// Reference to a binding that cannot be resolved
    ReferenceError,
    /// Value out of allowed range
    RangeError,
    /// `set` called on a node that is not an assignment target
    NotAssignable,
    /// Call of a value that is not a function
    NotCallable,
    /// Malformed or unknown serialized AST
    Deserialize,
    /// Internal engine invariant violated
    InternalError,
}

impl ErrorKind {
    /// Name used for the `name` property of caught error objects.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::TypeError | ErrorKind::NotCallable => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::NotAssignable => "SyntaxError",
            ErrorKind::Deserialize => "DeserializeError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Any error raised by the engine.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, JsError};
///
/// let err = JsError::type_error("undefined is not a function");
/// assert_eq!(err.kind(), Some(ErrorKind::TypeError));
/// assert_eq!(err.to_string(), "TypeError: undefined is not a function");
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum JsError {
    /// Unrecognized character, unterminated literal or invalid escape.
    #[error("LexError: {message} ({position})")]
    Lex {
        /// Human-readable message
        message: String,
        /// Where the offending input starts
        position: SourcePosition,
    },

    /// Malformed expression or statement.
    #[error("ParseError: {message} ({position})")]
    Parse {
        /// Human-readable message
        message: String,
        /// Token that triggered the error
        position: SourcePosition,
    },

    /// Error raised while evaluating or deserializing nodes.
    #[error("{kind}: {message}")]
    Eval {
        /// Error classification
        kind: ErrorKind,
        /// Human-readable message
        message: String,
    },

    /// A value thrown by a `throw` statement or a rejected await.
    #[error("Uncaught {0}")]
    Throw(Value),

    /// Evaluation stopped at an `await` whose promise has not settled. The
    /// statement runner replays the statement once it does; script code
    /// never observes this error.
    #[error("InternalError: evaluation suspended at a pending await")]
    Suspended,
}

impl JsError {
    /// Create a lexer error at the given position.
    pub fn lex(message: impl Into<String>, position: SourcePosition) -> Self {
        JsError::Lex {
            message: message.into(),
            position,
        }
    }

    /// Create a parser error at the given position.
    pub fn parse(message: impl Into<String>, position: SourcePosition) -> Self {
        JsError::Parse {
            message: message.into(),
            position,
        }
    }

    /// Create an evaluation error of the given kind.
    pub fn eval(kind: ErrorKind, message: impl Into<String>) -> Self {
        JsError::Eval {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::eval(ErrorKind::TypeError, message)
    }

    /// Shorthand for a `ReferenceError`.
    pub fn reference_error(message: impl Into<String>) -> Self {
        Self::eval(ErrorKind::ReferenceError, message)
    }

    /// Shorthand for a `RangeError`.
    pub fn range_error(message: impl Into<String>) -> Self {
        Self::eval(ErrorKind::RangeError, message)
    }

    /// Error raised by `set` on a node that cannot be assigned to.
    pub fn not_assignable(target: impl fmt::Display) -> Self {
        Self::eval(
            ErrorKind::NotAssignable,
            format!("unsupported assignment target: {}", target),
        )
    }

    /// Error raised when calling a value that is not a function.
    pub fn not_callable(callee: impl fmt::Display) -> Self {
        Self::eval(ErrorKind::NotCallable, format!("{} is not a function", callee))
    }

    /// Error raised by the AST deserializer.
    pub fn deserialize(message: impl Into<String>) -> Self {
        Self::eval(ErrorKind::Deserialize, message)
    }

    /// Evaluation error kind, if this is an evaluation error.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            JsError::Eval { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Source position for lexer and parser errors.
    pub fn position(&self) -> Option<&SourcePosition> {
        match self {
            JsError::Lex { position, .. } | JsError::Parse { position, .. } => Some(position),
            _ => None,
        }
    }

    /// Returns true if a `try` statement may intercept this error.
    pub fn is_catchable(&self) -> bool {
        matches!(self, JsError::Eval { .. } | JsError::Throw(_))
    }

    /// Convert this error into the value seen by a `catch` clause.
    ///
    /// Thrown values are passed through unchanged; engine errors become an
    /// error object carrying `name` and `message`.
    pub fn to_value(&self) -> Value {
        match self {
            JsError::Throw(value) => value.clone(),
            JsError::Eval { kind, message } => Value::new_error(kind.name(), message),
            JsError::Lex { message, .. } => Value::new_error("SyntaxError", message),
            JsError::Parse { message, .. } => Value::new_error("SyntaxError", message),
            JsError::Suspended => Value::new_error("InternalError", "evaluation suspended"),
        }
    }
}

/// Result type used throughout the engine.
pub type JsResult<T> = Result<T, JsError>;
