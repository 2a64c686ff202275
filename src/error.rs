//! Error values produced by the form pipeline.
//!
//! None of these is fatal to a form: each one is recorded on the attempt that
//! produced it and the form stays usable.

use std::time::Duration;
use thiserror::Error;

/// Failure of one outbound call to the remote service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// Connection refused, DNS failure, reset mid-body and the like.
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-success status. `message` comes from the `{"error": ...}` body
    /// when the service sent one.
    #[error("service returned {code}: {message}")]
    Status { code: u16, message: String },

    /// Success status but the body was not the expected JSON.
    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// Weather lookup failure
pub type ResolveError = RemoteError;

/// Prediction request failure
pub type SubmitError = RemoteError;

impl RemoteError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// A manual field that cannot be used for submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("unknown field '{name}'")]
    UnknownField { name: String },

    #[error("field '{name}' is empty")]
    Empty { name: String },

    #[error("field '{name}' must be a number, got '{value}'")]
    NotNumeric { name: String, value: String },
}

/// The form's event loop has shut down.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("form is closed")]
pub struct FormClosed;
