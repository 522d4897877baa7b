//! Rust bindings to the Google Drive API.
//!
//! The entry point is [`Drive`], built from a [`Config`]. Searches go through the [`Query`]
//! builder, and every returned [`File`] keeps the authenticated [`Session`] that fetched it, so
//! it can be downloaded, updated or deleted later on.
//!
//! # Example
//!
//! ```no_run
//! use rdrive::{auth::Credentials, Config, Drive, OrderBy};
//!
//! # async fn run() -> rdrive::Result<()> {
//! let drive = Drive::new(
//!     Config::builder()
//!         .credentials(Credentials::AccessToken("ya29.token".to_owned()))
//!         .build(),
//! );
//!
//! let mut query = drive
//!     .query()
//!     .folder_only()
//!     .in_folder("parent-folder-id")
//!     .name_contains("New")
//!     .page_size(4)
//!     .order_by(OrderBy::Name);
//!
//! while query.has_next_page() {
//!     for folder in query.run().await? {
//!         folder.delete().await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

use displaydoc::Display;
use std::result::Result as StdResult;
use thiserror::Error as ThisError;
use url::Url;

pub use client::{AuthClient, Config, RequestBuilder, Session};
pub use drive::{CreateFolderOptions, Drive};
pub use file::{File, FileMetadata, UpdateOptions};
pub use query::{Comparison, Cursor, ListParams, OrderBy, OrderKeys, ParseOrderByError, Query};
pub use rdrive_auth as auth;
pub use transport::{Body, HttpRequest, HttpResponse, ReqwestTransport, Transport};

mod client;
mod drive;
mod file;
mod query;
mod transport;
mod util;

pub mod response;

/// MIME type the API uses to mark folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Projection requested for every file resource.
pub const FILE_FIELDS: &str = "id,kind,name,mimeType,parents,modifiedTime,createdTime,size";

/// Type alias for `Result<T, Error>`.
pub type Result<T> = StdResult<T, Error>;

/// Errors that can occur while interacting with the Drive API.
#[derive(Debug, Display, ThisError)]
pub enum Error {
    /// Failed to send request.
    Request(#[from] reqwest::Error),
    /// Failed to parse URL.
    ParseUrl(#[from] url::ParseError),
    /// Server returned an error.
    Response(#[from] response::Error),
    /// Failed to authenticate.
    Auth(#[from] auth::Error),
    /// Failed to parse response body.
    Json(#[from] serde_json::Error),
    /// Failed to read local file.
    Io(#[from] std::io::Error),
    /// The query has no more pages.
    ExhaustedPagination,
}

impl Error {
    /// Returns whether the server answered with `404 Not Found`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Response(e) if e.status == 404)
    }
}

/// Struct for specifying the URLs of API endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Urls {
    pub base: Url,
    pub upload: Url,
    pub token: Url,
}

impl Urls {
    /// Creates a new [`Urls`] type with the URLs of the official endpoints.
    ///
    /// | Field      | URL                                               |
    /// |------------|---------------------------------------------------|
    /// | [`base`]   | https://www.googleapis.com/drive/v3               |
    /// | [`upload`] | https://www.googleapis.com/upload/drive/v3/files  |
    /// | [`token`]  | https://oauth2.googleapis.com/token               |
    ///
    /// [`base`]: Self::base
    /// [`upload`]: Self::upload
    /// [`token`]: Self::token
    pub fn official() -> Self {
        Self {
            base: Url::parse("https://www.googleapis.com/drive/v3").unwrap(),
            upload: Url::parse("https://www.googleapis.com/upload/drive/v3/files").unwrap(),
            token: Url::parse("https://oauth2.googleapis.com/token").unwrap(),
        }
    }

    /// Creates a new [`Urls`] type for a server hosting the API under `url`, such as a local
    /// emulator.
    ///
    /// | Field      | URL                                 |
    /// |------------|-------------------------------------|
    /// | [`base`]   | *\<url\>*/drive/v3                  |
    /// | [`upload`] | *\<url\>*/upload/drive/v3/files     |
    /// | [`token`]  | *\<url\>*/token                     |
    ///
    /// [`base`]: Self::base
    /// [`upload`]: Self::upload
    /// [`token`]: Self::token
    pub fn unofficial(url: Url) -> StdResult<Self, url::ParseError> {
        Ok(Self {
            base: url.join("drive/v3")?,
            upload: url.join("upload/drive/v3/files")?,
            token: url.join("token")?,
        })
    }
}
