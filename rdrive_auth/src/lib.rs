//! Credentials and access tokens for the Google Drive API.
//!
//! This crate knows how to hold credentials and how to hand out bearer tokens. It does not
//! implement any OAuth consent or service-account signing flow: key based credentials are turned
//! into tokens by an [`AuthProvider`] supplied by the caller.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

use async_trait::async_trait;
use std::{error::Error as StdError, sync::Arc};
use thiserror::Error as ThisError;

pub use credentials::{Credentials, RefreshCredentials};
pub use service_account::ServiceAccountKey;
pub use token::{AccessToken, RefreshingToken, StaticToken, TokenProvider};

mod credentials;
mod service_account;
mod token;

/// The single permission scope requested for key based credentials: full read/write access to
/// the files of the account.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving credentials or fetching access tokens.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Failed to read the key file.
    #[error("failed to read key file")]
    ReadKeyFile(#[source] std::io::Error),
    /// Failed to parse the service account key.
    #[error("failed to parse service account key")]
    ParseKey(#[from] serde_json::Error),
    /// Failed to send the token request.
    #[error("failed to send token request")]
    Request(#[from] reqwest::Error),
    /// The token endpoint rejected the request.
    #[error("token endpoint returned status {status}: {error}")]
    TokenEndpoint {
        status: u16,
        error: String,
        description: Option<String>,
    },
    /// Key based credentials were configured without an [`AuthProvider`].
    #[error("no auth provider configured for service account credentials")]
    MissingAuthProvider,
    /// The auth provider failed.
    #[error("auth provider failed")]
    Provider(#[source] Box<dyn StdError + Send + Sync>),
}

/// External capability that turns service account key material into a [`TokenProvider`].
///
/// Implementations typically sign a JWT with the key and exchange it for access tokens,
/// refreshing them as they expire.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authorize(
        &self,
        key: &ServiceAccountKey,
        scopes: &[&str],
    ) -> Result<Arc<dyn TokenProvider>>;
}
