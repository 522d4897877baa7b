//! Module for file and folder resources.

use crate::{util, Result, Session, FILE_FIELDS, FOLDER_MIME_TYPE};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use derive_setters::Setters;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::Arc,
};
use tracing::debug;

/// Metadata of a file or folder, as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub mime_type: String,
    /// RFC 3339 timestamp of the last modification.
    pub modified_time: String,
    /// RFC 3339 timestamp of the creation.
    pub created_time: String,
    /// Size of the content in bytes. Zero for folders.
    #[serde(deserialize_with = "util::deserialize_size")]
    pub size: u64,
    #[serde(deserialize_with = "util::deserialize_optional")]
    pub parents: Vec<String>,
}

impl FileMetadata {
    /// Returns whether this is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Parses [`modified_time`](Self::modified_time). Returns `None` if it is not a valid
    /// timestamp.
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.modified_time)
    }

    /// Parses [`created_time`](Self::created_time). Returns `None` if it is not a valid
    /// timestamp.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_time)
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|v| v.with_timezone(&Utc))
}

/// Metadata changes applied by [`File::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Setters)]
#[setters(strip_option, into, prefix = "with_")]
pub struct UpdateOptions {
    pub name: Option<String>,
    /// ID of a folder the file is added to.
    pub parent: Option<String>,
    pub description: Option<String>,
}

/// A file or folder, bound to the session that fetched it.
///
/// The metadata is reachable through `Deref`, so `file.name` or `file.is_folder()` work
/// directly. Operations on the file reuse the session it came from.
#[derive(Clone)]
pub struct File {
    metadata: FileMetadata,
    session: Arc<Session>,
}

impl File {
    pub(crate) fn new(metadata: FileMetadata, session: Arc<Session>) -> Self {
        Self { metadata, session }
    }

    /// Returns the metadata.
    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    /// Drops the session and returns the metadata.
    pub fn into_metadata(self) -> FileMetadata {
        self.metadata
    }

    /// Returns the session this file is bound to.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Downloads the whole content of the file.
    pub async fn download(&self) -> Result<Bytes> {
        self.session
            .request(Method::GET, |urls| &urls.base, &["files", self.metadata.id.as_str()])?
            .query("alt", "media")
            .send()
            .await?
            .into_bytes()
    }

    /// Updates name, parent or description and merges the server's answer into `self`.
    pub async fn update(&mut self, options: &UpdateOptions) -> Result<()> {
        #[derive(Serialize)]
        struct Request<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            name: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            description: Option<&'a str>,
        }

        let mut request = self
            .session
            .request(Method::PATCH, |urls| &urls.base, &["files", self.metadata.id.as_str()])?
            .query("fields", FILE_FIELDS);
        if let Some(parent) = &options.parent {
            request = request.query("addParents", parent);
        }
        let body = serde_json::to_value(Request {
            name: options.name.as_deref(),
            description: options.description.as_deref(),
        })?;
        let value: Value = request.json(body).send().await?.parse()?;
        util::merge(&mut self.metadata, value)?;
        debug!(id = %self.metadata.id, "updated file");
        Ok(())
    }

    /// Deletes the file permanently, skipping the trash.
    ///
    /// The file must not be used afterwards.
    pub async fn delete(&self) -> Result<()> {
        self.session
            .request(Method::DELETE, |urls| &urls.base, &["files", self.metadata.id.as_str()])?
            .send()
            .await?
            .parse_empty()
    }
}

impl Deref for File {
    type Target = FileMetadata;

    fn deref(&self) -> &Self::Target {
        &self.metadata
    }
}

impl DerefMut for File {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.metadata
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("id", &self.metadata.id)
            .field("name", &self.metadata.name)
            .field("mime_type", &self.metadata.mime_type)
            .field("modified_time", &self.metadata.modified_time)
            .field("created_time", &self.metadata.created_time)
            .field("size", &self.metadata.size)
            .field("parents", &self.metadata.parents)
            .finish()
    }
}
