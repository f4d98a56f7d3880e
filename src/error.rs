//! Error types for the crate.
//!
//! Internally everything is an `anyhow::Error` (see `Res`). At the public boundary errors are
//! wrapped in `Error`, which also carries an `ErrorType` so that a caller can tell a ledger that
//! does not have the expected layout apart from a failed network call.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// The result type used inside the crate.
pub(crate) type Res<T> = std::result::Result<T, anyhow::Error>;

/// The result type returned by public functions.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an `Error`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The configuration directory or one of its files is missing or invalid.
    Config,
    /// OAuth credentials are missing, invalid or could not be refreshed.
    Auth,
    /// The ledger tab does not have the layout we expect, e.g. there is no `Total Net income`
    /// row. Writing is refused rather than guessing where the expense log starts.
    Format,
    /// A call to the spreadsheet or to the chat service failed.
    Transport,
    /// A message could not be understood as an expense.
    Parse,
    /// A request to the webhook server was malformed.
    Request,
    /// Anything else.
    Internal,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// The public error type. Pairs an `ErrorType` with the underlying error chain.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub fn new(error_type: ErrorType, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            inner: inner.into(),
        }
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.inner)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.inner)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// Converts an internal result into a public `Result` by tagging the error with an `ErrorType`.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_type_display() {
        assert_eq!(ErrorType::Format.to_string(), "format");
        assert_eq!(ErrorType::Transport.to_string(), "transport");
        assert_eq!("parse".parse::<ErrorType>().unwrap(), ErrorType::Parse);
    }

    #[test]
    fn test_pub_result_keeps_context_chain() {
        let res: Res<()> = Err(anyhow::anyhow!("connection reset")).context("Failed to write");
        let err = res.pub_result(ErrorType::Transport).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Transport);
        assert_eq!(err.to_string(), "Failed to write: connection reset");
    }
}
