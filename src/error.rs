//! Error types and `Result` alias for the planner.
//!
//! A flat `ErrorCode` enum plus a struct that pairs a code with an optional
//! message, constructed with `Error::new` or `Error::with_message`. Three
//! disjoint codes, one per failure kind the planner can raise: bad input,
//! no feasible join order, and an internal invariant violation.

use std::fmt;

/// Result codes, disjoint, one per distinct failure kind the planner can
/// raise (see DESIGN.md for the full rationale).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Generic invalid-input failure (empty table list, unknown column, …).
    Error,
    /// No valid join order exists for the given terms.
    Empty,
    /// An internal invariant was violated; indicates a planner bug.
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::Error => "error",
            ErrorCode::Empty => "no plan",
            ErrorCode::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// A planner error: a code plus an optional human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub code: ErrorCode,
    pub message: Option<String>,
}

impl Error {
    pub fn new(code: ErrorCode) -> Self {
        Error {
            code,
            message: None,
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Error {
            code,
            message: Some(message.into()),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {}", self.code, msg),
            None => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for Error {}

/// Result type alias used throughout the planner.
pub type Result<T> = std::result::Result<T, Error>;
