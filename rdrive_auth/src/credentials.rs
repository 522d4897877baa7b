use crate::{AccessToken, ServiceAccountKey};
use derive_setters::Setters;
use std::{fmt, path::PathBuf};

/// Credentials used to authenticate against the Drive API.
///
/// The variant is fixed at construction and decides how a session obtains its tokens:
/// token based variants are used directly, key based variants go through an
/// [`AuthProvider`](crate::AuthProvider).
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Path to a service account JSON key file.
    KeyFile(PathBuf),
    /// Inline service account key material.
    ServiceAccount(ServiceAccountKey),
    /// A pre-obtained access token. It is never refreshed.
    AccessToken(String),
    /// A pre-obtained refresh token together with the OAuth client it was issued to.
    Refresh(RefreshCredentials),
}

impl Credentials {
    /// Reads credentials from the environment.
    ///
    /// The variables are checked in this order, the first match wins:
    ///
    /// | Variable                                      | Variant                          |
    /// |-----------------------------------------------|----------------------------------|
    /// | `RDRIVE_ACCESS_TOKEN`                         | [`AccessToken`]                  |
    /// | `RDRIVE_KEY_FILE`                             | [`KeyFile`]                      |
    /// | `RDRIVE_CLIENT_EMAIL` + `RDRIVE_PRIVATE_KEY`  | [`ServiceAccount`]               |
    ///
    /// [`AccessToken`]: Self::AccessToken
    /// [`KeyFile`]: Self::KeyFile
    /// [`ServiceAccount`]: Self::ServiceAccount
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
    }

    fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("RDRIVE_ACCESS_TOKEN") {
            return Some(Self::AccessToken(token));
        }
        if let Some(path) = lookup("RDRIVE_KEY_FILE") {
            return Some(Self::KeyFile(path.into()));
        }
        match (lookup("RDRIVE_CLIENT_EMAIL"), lookup("RDRIVE_PRIVATE_KEY")) {
            (Some(email), Some(key)) => Some(Self::ServiceAccount(ServiceAccountKey::new(
                email,
                key.replace("\\n", "\n"),
            ))),
            _ => None,
        }
    }

    /// Returns whether the credentials need an [`AuthProvider`](crate::AuthProvider).
    pub fn is_key_based(&self) -> bool {
        matches!(self, Self::KeyFile(_) | Self::ServiceAccount(_))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyFile(path) => f.debug_tuple("KeyFile").field(path).finish(),
            Self::ServiceAccount(key) => f.debug_tuple("ServiceAccount").field(key).finish(),
            Self::AccessToken(_) => f.debug_tuple("AccessToken").field(&"<redacted>").finish(),
            Self::Refresh(v) => f.debug_tuple("Refresh").field(v).finish(),
        }
    }
}

/// A refresh token and the OAuth client it belongs to.
#[derive(Clone, PartialEq, Eq, Setters)]
#[setters(strip_option, prefix = "with_")]
pub struct RefreshCredentials {
    #[setters(skip)]
    pub client_id: String,
    #[setters(skip)]
    pub client_secret: String,
    #[setters(skip)]
    pub refresh_token: String,
    /// An access token obtained together with the refresh token. It is used until it expires.
    pub access_token: Option<AccessToken>,
}

impl RefreshCredentials {
    /// Creates new [`RefreshCredentials`].
    pub fn new<I, S, R>(client_id: I, client_secret: S, refresh_token: R) -> Self
    where
        I: Into<String>,
        S: Into<String>,
        R: Into<String>,
    {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            access_token: None,
        }
    }
}

impl fmt::Debug for RefreshCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("access_token", &self.access_token)
            .finish()
    }
}
