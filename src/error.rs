//! Error handling for the crate.
//!
//! Internally everything is an `anyhow::Error`. At the public boundary (command handlers and the
//! MCP server) errors are tagged with an `ErrorType` so that callers can tell a bad request apart
//! from a broken database.

use std::fmt::{Debug, Display, Formatter};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The broad category of a failure surfaced by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Invalid arguments or environment.
    Config,
    /// The QIF source could not be opened, read, or was empty.
    Source,
    /// A SQLite operation failed.
    Database,
    /// The caller asked for something that is not allowed, e.g. a write statement.
    Request,
    /// The MCP service failed to start or run.
    Service,
}

impl Display for ErrorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorType::Config => "configuration",
            ErrorType::Source => "source",
            ErrorType::Database => "database",
            ErrorType::Request => "request",
            ErrorType::Service => "service",
        };
        f.write_str(s)
    }
}

/// An error that has been categorized for public consumption.
pub struct PubError {
    error_type: ErrorType,
    inner: Error,
}

impl PubError {
    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    /// Finds the `ErrorType` of an error, if it passed through `pub_result`.
    pub fn type_of(e: &Error) -> Option<ErrorType> {
        e.downcast_ref::<PubError>().map(|p| p.error_type)
    }
}

impl Debug for PubError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PubError({:?}, {:?})", self.error_type, self.inner)
    }
}

impl Display for PubError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:#}", self.error_type, self.inner)
    }
}

impl std::error::Error for PubError {}

/// Extension for tagging a `Result` with an `ErrorType`.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T> IntoResult<T> for Result<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|inner| {
            // Keep the innermost classification.
            if inner.downcast_ref::<PubError>().is_some() {
                inner
            } else {
                PubError { error_type, inner }.into()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn pub_result_tags_error() {
        let r: Result<()> = Err(anyhow!("disk on fire")).context("Unable to insert accounts");
        let e = r.pub_result(ErrorType::Database).unwrap_err();
        assert_eq!(PubError::type_of(&e), Some(ErrorType::Database));
        let message = e.to_string();
        assert!(message.starts_with("database error: "), "{message}");
        assert!(message.contains("disk on fire"), "{message}");
    }

    #[test]
    fn pub_result_keeps_first_classification() {
        let r: Result<()> = Err(anyhow!("nope"));
        let e = r
            .pub_result(ErrorType::Request)
            .pub_result(ErrorType::Service)
            .unwrap_err();
        assert_eq!(PubError::type_of(&e), Some(ErrorType::Request));
    }

    #[test]
    fn untagged_error_has_no_type() {
        let e = anyhow!("plain");
        assert_eq!(PubError::type_of(&e), None);
    }
}
