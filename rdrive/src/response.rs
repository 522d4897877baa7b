//! Module for errors returned from the Drive API.

use serde::Deserialize;
use thiserror::Error;

#[derive(Deserialize)]
struct Envelope {
    error: InnerError,
}

#[derive(Deserialize)]
struct InnerError {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

/// An error returned from the Drive API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("status {status}: {message}")]
pub struct Error {
    /// The HTTP status code.
    pub status: u16,
    pub message: String,
    pub errors: Vec<ErrorDetail>,
}

impl Error {
    /// Builds an error from the status and raw body of a failed response.
    ///
    /// Bodies that are not the JSON error envelope of the API are kept as plain text.
    pub fn from_body(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<Envelope>(body) {
            Ok(Envelope { error }) => Self {
                status,
                message: error.message.unwrap_or_default(),
                errors: error.errors,
            },
            Err(_) => Self {
                status,
                message: String::from_utf8_lossy(body).into_owned(),
                errors: Vec::new(),
            },
        }
    }

    /// Returns the reason of the first error detail, e.g. `notFound` or `rateLimitExceeded`.
    pub fn reason(&self) -> Option<&str> {
        self.errors.first().and_then(|v| v.reason.as_deref())
    }
}

/// A single entry of the `errors` list of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct ErrorDetail {
    pub domain: Option<String>,
    pub reason: Option<String>,
    pub message: Option<String>,
}
