//! Error types for the SIP message core

use thiserror::Error;

/// Result type for message-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing, mutating, or serializing messages
#[derive(Debug, Error)]
pub enum Error {
    /// Grammar/syntax error raised by the tokenizer.
    ///
    /// Non-fatal to the owning container: a failed split or promotion
    /// leaves the entry in its prior form and only the requesting caller
    /// sees the error.
    #[error("parse error: {0}")]
    Parser(String),

    /// A header listener rejected content it cannot accept at that
    /// position. Distinct from [`Error::Parser`] so callers can tolerate
    /// semantic issues while treating syntax errors as fatal to the
    /// element.
    #[error("header {header} rejected: {reason}")]
    HeaderRejected {
        /// Canonical name of the rejecting header
        header: String,
        /// What the listener objected to
        reason: String,
    },

    /// A transaction key is missing a recognizable branch or CSeq method.
    /// Raised only by an explicit `validate()` call, never during
    /// construction.
    #[error("invalid transaction key: {0}")]
    InvalidTransactionKey(String),

    /// Cursor misuse on a linked container (remove/replace without a
    /// current element).
    #[error("cursor misuse: {0}")]
    CursorMisuse(&'static str),

    /// Sink failure while writing wire bytes.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed compact ("token") encoding.
    #[error("token encoding error: {0}")]
    TokenEncoding(String),
}

impl Error {
    /// Shorthand used throughout the parser modules.
    pub(crate) fn parser(msg: impl Into<String>) -> Self {
        Error::Parser(msg.into())
    }
}
