use crate::{Error, RefreshCredentials, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::{
    convert::TryInto,
    fmt,
    time::{Duration, SystemTime},
};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

/// An access token and the time it stops being valid.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AccessToken {
    pub access_token: String,
    /// `None` if the expiry time is unknown. Such a token is treated as valid.
    pub expiry_time: Option<SystemTime>,
}

impl AccessToken {
    /// Creates a new [`AccessToken`] without an expiry time.
    pub fn new<S: Into<String>>(access_token: S) -> Self {
        Self {
            access_token: access_token.into(),
            expiry_time: None,
        }
    }

    /// Creates a new [`AccessToken`] that expires at the given time.
    pub fn expiring_at<S: Into<String>>(access_token: S, expiry_time: SystemTime) -> Self {
        Self {
            access_token: access_token.into(),
            expiry_time: Some(expiry_time),
        }
    }

    /// Returns whether the token has expired.
    pub fn has_expired(&self) -> bool {
        match self.expiry_time {
            Some(v) => v <= SystemTime::now(),
            None => false,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("expiry_time", &self.expiry_time)
            .finish()
    }
}

/// Returns `None` for a missing `expires_in` and for one too large to represent, both treated as
/// never expiring.
fn get_token_expiry_time(expires_in: Option<i64>) -> Option<SystemTime> {
    let secs: u64 = expires_in?.try_into().unwrap_or_default();
    SystemTime::now().checked_add(Duration::from_secs(secs))
}

/// Source of bearer tokens for authenticated requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a currently valid access token, refreshing it first if needed.
    async fn access_token(&self) -> Result<String>;
}

/// A pre-obtained access token that is never refreshed.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new<S: Into<String>>(access_token: S) -> Self {
        Self(access_token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

struct RefreshState {
    refresh_token: String,
    access_token: Option<AccessToken>,
}

/// A token provider that exchanges a refresh token for access tokens on demand.
///
/// The current access token is cached until it expires. A new refresh token returned by the
/// token endpoint replaces the old one.
pub struct RefreshingToken {
    client: reqwest::Client,
    token_uri: Url,
    client_id: String,
    client_secret: String,
    state: Mutex<RefreshState>,
}

impl RefreshingToken {
    /// Creates a new [`RefreshingToken`] that refreshes against `token_uri`.
    pub fn new(credentials: RefreshCredentials, token_uri: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_uri,
            client_id: credentials.client_id,
            client_secret: credentials.client_secret,
            state: Mutex::new(RefreshState {
                refresh_token: credentials.refresh_token,
                access_token: credentials.access_token,
            }),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        debug!(token_uri = %self.token_uri, "refreshing access token");
        let response = self
            .client
            .post(self.token_uri.clone())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
            ])
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let (error, description) = match response.json::<TokenErrorResponse>().await {
            Ok(v) => (v.error, v.error_description),
            Err(_) => (status.to_string(), None),
        };
        Err(Error::TokenEndpoint {
            status: status.as_u16(),
            error,
            description,
        })
    }
}

impl fmt::Debug for RefreshingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshingToken")
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[async_trait]
impl TokenProvider for RefreshingToken {
    async fn access_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        if let Some(token) = state.access_token.as_ref().filter(|v| !v.has_expired()) {
            return Ok(token.access_token.clone());
        }
        let token = self.refresh(&state.refresh_token).await?;
        if let Some(v) = token.refresh_token {
            state.refresh_token = v;
        }
        let access_token = token.access_token.clone();
        state.access_token = Some(AccessToken {
            access_token: token.access_token,
            expiry_time: get_token_expiry_time(token.expires_in),
        });
        Ok(access_token)
    }
}
