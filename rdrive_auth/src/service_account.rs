use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path};
use tokio::fs;

/// Key material of a service account, as found in the JSON key file downloaded from the cloud
/// console.
///
/// Only `client_email` and `private_key` are required, which also allows building a key from
/// inline values.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    /// Creates a new [`ServiceAccountKey`] from inline values.
    pub fn new<E, K>(client_email: E, private_key: K) -> Self
    where
        E: Into<String>,
        K: Into<String>,
    {
        Self {
            client_email: client_email.into(),
            private_key: private_key.into(),
            private_key_id: None,
            project_id: None,
            token_uri: None,
        }
    }

    /// Parses a key from the contents of a JSON key file.
    pub fn from_json<S: AsRef<str>>(json: S) -> Result<Self> {
        Ok(serde_json::from_str(json.as_ref())?)
    }

    /// Reads and parses a JSON key file.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path).await.map_err(Error::ReadKeyFile)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("project_id", &self.project_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}
