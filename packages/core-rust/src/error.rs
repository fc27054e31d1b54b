//! Structured calculator failures.
//!
//! Every failure the core can produce is a [`CalcError`] value carrying a
//! machine-readable [`ErrorKind`] and a human-readable message (its
//! `Display` output). Nothing in the core panics on bad input.

use serde::{Deserialize, Serialize};

/// Logical failure category, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UnknownOperation,
    ArityMismatch,
    InsufficientStackDepth,
    InvalidInput,
    Underflow,
    DivisionByZero,
    InvalidDomain,
    Overflow,
}

impl ErrorKind {
    /// Stable string form, used in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownOperation => "UnknownOperation",
            Self::ArityMismatch => "ArityMismatch",
            Self::InsufficientStackDepth => "InsufficientStackDepth",
            Self::InvalidInput => "InvalidInput",
            Self::Underflow => "Underflow",
            Self::DivisionByZero => "DivisionByZero",
            Self::InvalidDomain => "InvalidDomain",
            Self::Overflow => "Overflow",
        }
    }
}

/// Errors returned by the operation registry, the operand stack and the
/// calculator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalcError {
    #[error("Error: unknown operation: {name}")]
    UnknownOperation { name: String },

    #[error(
        "Error: {} arguments to perform the operation {operation}",
        arity_word(*.expected, *.actual)
    )]
    ArityMismatch {
        operation: String,
        expected: usize,
        actual: usize,
    },

    #[error(
        "Error: cannot implement operation {operation}. It requires {required} arguments and the stack has only {available} arguments"
    )]
    InsufficientStackDepth {
        operation: String,
        required: usize,
        available: usize,
    },

    #[error("{message}")]
    InvalidInput { message: String },

    #[error("Error: cannot remove {requested} from the stack. It has only {available} arguments")]
    /// `requested` is the decimal count as asked for, which may not fit a `usize`.
    Underflow { requested: String, available: usize },

    #[error("Error while performing operation {operation}: division by 0")]
    DivisionByZero { operation: &'static str },

    #[error("Error while performing operation {operation}: not supported for the negative number")]
    InvalidDomain { operation: &'static str },

    #[error("Error while performing operation {operation}: integer overflow")]
    Overflow { operation: &'static str },
}

fn arity_word(expected: usize, actual: usize) -> &'static str {
    if actual < expected {
        "Not enough"
    } else {
        "Too many"
    }
}

impl CalcError {
    /// Shorthand for an [`CalcError::InvalidInput`] with the given message.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Returns the logical kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownOperation { .. } => ErrorKind::UnknownOperation,
            Self::ArityMismatch { .. } => ErrorKind::ArityMismatch,
            Self::InsufficientStackDepth { .. } => ErrorKind::InsufficientStackDepth,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Underflow { .. } => ErrorKind::Underflow,
            Self::DivisionByZero { .. } => ErrorKind::DivisionByZero,
            Self::InvalidDomain { .. } => ErrorKind::InvalidDomain,
            Self::Overflow { .. } => ErrorKind::Overflow,
        }
    }
}

pub type CalcResult<T> = Result<T, CalcError>;
