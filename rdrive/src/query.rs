//! Module for searching files.

use crate::util::ListResponse;
use crate::{AuthClient, Config, Error, File, FileMetadata, Result, FILE_FIELDS, FOLDER_MIME_TYPE};
use async_stream::try_stream;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream::{Stream, TryStreamExt};
use reqwest::Method;
use std::{fmt, str::FromStr, sync::Arc};
use thiserror::Error as ThisError;
use tracing::debug;

/// Default number of files requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Comparison operator for timestamp clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparison {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sort key recognized by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderBy {
    CreatedTime,
    Folder,
    ModifiedByMeTime,
    ModifiedTime,
    Name,
    NameNatural,
    QuotaBytesUsed,
    Recency,
    SharedWithMeTime,
    Starred,
    ViewedByMeTime,
}

impl OrderBy {
    const ALL: [Self; 11] = [
        Self::CreatedTime,
        Self::Folder,
        Self::ModifiedByMeTime,
        Self::ModifiedTime,
        Self::Name,
        Self::NameNatural,
        Self::QuotaBytesUsed,
        Self::Recency,
        Self::SharedWithMeTime,
        Self::Starred,
        Self::ViewedByMeTime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatedTime => "createdTime",
            Self::Folder => "folder",
            Self::ModifiedByMeTime => "modifiedByMeTime",
            Self::ModifiedTime => "modifiedTime",
            Self::Name => "name",
            Self::NameNatural => "name_natural",
            Self::QuotaBytesUsed => "quotaBytesUsed",
            Self::Recency => "recency",
            Self::SharedWithMeTime => "sharedWithMeTime",
            Self::Starred => "starred",
            Self::ViewedByMeTime => "viewedByMeTime",
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown sort key.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("unknown sort key `{0}`")]
pub struct ParseOrderByError(pub String);

impl FromStr for OrderBy {
    type Err = ParseOrderByError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ParseOrderByError(s.to_owned()))
    }
}

/// One or more sort keys, accepted by [`Query::order_by`].
pub trait OrderKeys {
    fn into_keys(self) -> Vec<OrderBy>;
}

impl OrderKeys for OrderBy {
    fn into_keys(self) -> Vec<OrderBy> {
        vec![self]
    }
}

impl OrderKeys for Vec<OrderBy> {
    fn into_keys(self) -> Vec<OrderBy> {
        self
    }
}

impl OrderKeys for &[OrderBy] {
    fn into_keys(self) -> Vec<OrderBy> {
        self.to_vec()
    }
}

impl<const N: usize> OrderKeys for [OrderBy; N] {
    fn into_keys(self) -> Vec<OrderBy> {
        self.to_vec()
    }
}

/// Pagination state of a [`Query`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cursor {
    /// No page has been fetched yet.
    NotStarted,
    /// The last page was followed by this continuation token.
    HasMore(String),
    /// The last page was the final one.
    Exhausted,
}

impl Cursor {
    fn from_next_page_token(token: Option<String>) -> Self {
        match token {
            Some(v) if !v.is_empty() => Self::HasMore(v),
            _ => Self::Exhausted,
        }
    }

    /// Returns the token to send with the next request.
    pub fn page_token(&self) -> Option<&str> {
        match self {
            Self::HasMore(v) => Some(v),
            Self::NotStarted | Self::Exhausted => None,
        }
    }
}

/// The list parameters a [`Query`] sends with its next request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListParams {
    /// All clauses joined with ` and `.
    pub q: String,
    pub page_size: u32,
    /// All sort keys joined with `,`.
    pub order_by: String,
    pub page_token: Option<String>,
}

/// A paginated search over files and folders.
///
/// Every clause method appends one clause; clauses are combined with `and` in the order they
/// were added. Values are put into the query between single quotes without escaping, so they
/// must not contain a `'`. Use [`Query::raw`] for anything the builder does not cover.
///
/// A query resolves its own session on the first [`run`](Self::run), independent of the
/// [`Drive`](crate::Drive) that created it.
#[derive(Debug)]
pub struct Query {
    client: AuthClient,
    clauses: Vec<String>,
    page_size: u32,
    order_by: Vec<OrderBy>,
    cursor: Cursor,
    incomplete_search: bool,
}

impl Query {
    pub fn new(config: Config) -> Self {
        Self {
            client: AuthClient::new(config),
            clauses: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            order_by: Vec::new(),
            cursor: Cursor::NotStarted,
            incomplete_search: false,
        }
    }

    fn clause(mut self, clause: String) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Only matches folders.
    pub fn folder_only(self) -> Self {
        self.clause(format!("mimeType='{}'", FOLDER_MIME_TYPE))
    }

    /// Only matches files. Combined with [`folder_only`](Self::folder_only) nothing matches.
    pub fn file_only(self) -> Self {
        self.clause(format!("mimeType!='{}'", FOLDER_MIME_TYPE))
    }

    /// Matches files whose name, description or indexed content contains `text`.
    pub fn full_text_contains<S: AsRef<str>>(self, text: S) -> Self {
        self.clause(format!("fullText contains '{}'", text.as_ref()))
    }

    pub fn name_contains<S: AsRef<str>>(self, text: S) -> Self {
        self.clause(format!("name contains '{}'", text.as_ref()))
    }

    pub fn name_eq<S: AsRef<str>>(self, name: S) -> Self {
        self.clause(format!("name = '{}'", name.as_ref()))
    }

    pub fn modified_time(self, comparison: Comparison, time: DateTime<Utc>) -> Self {
        self.clause(format!(
            "modifiedTime {} '{}'",
            comparison,
            format_timestamp(time)
        ))
    }

    pub fn created_time(self, comparison: Comparison, time: DateTime<Utc>) -> Self {
        self.clause(format!(
            "createdTime {} '{}'",
            comparison,
            format_timestamp(time)
        ))
    }

    /// Appends a clause as is.
    pub fn raw<S: Into<String>>(self, clause: S) -> Self {
        self.clause(clause.into())
    }

    /// Matches files directly inside the folder with the given ID.
    pub fn in_folder<S: AsRef<str>>(self, folder_id: S) -> Self {
        self.clause(format!("'{}' in parents", folder_id.as_ref()))
    }

    pub fn in_trash(self) -> Self {
        self.clause("trashed = true".to_owned())
    }

    /// Sets the number of files requested by the following runs.
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Appends one or more sort keys.
    pub fn order_by<K: OrderKeys>(mut self, keys: K) -> Self {
        self.order_by.extend(keys.into_keys());
        self
    }

    /// Returns the clauses in insertion order.
    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    /// Returns the combined filter expression.
    pub fn filter(&self) -> String {
        self.clauses.join(" and ")
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Returns whether the server reported the last page as incomplete.
    pub fn incomplete_search(&self) -> bool {
        self.incomplete_search
    }

    /// Returns the parameters the next run will send.
    pub fn params(&self) -> ListParams {
        ListParams {
            q: self.filter(),
            page_size: self.page_size,
            order_by: self
                .order_by
                .iter()
                .map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(","),
            page_token: self.cursor.page_token().map(ToOwned::to_owned),
        }
    }

    /// Returns `false` once the last page has been fetched.
    pub fn has_next_page(&self) -> bool {
        self.cursor != Cursor::Exhausted
    }

    /// Fetches the next page.
    ///
    /// Fails with [`Error::ExhaustedPagination`] if the previous run returned the last page. A
    /// failed run leaves the cursor untouched.
    pub async fn run(&mut self) -> Result<Vec<File>> {
        if self.cursor == Cursor::Exhausted {
            return Err(Error::ExhaustedPagination);
        }
        let session = self.client.session().await?;
        let params = self.params();
        let mut request = session
            .request(Method::GET, |urls| &urls.base, &["files"])?
            .query("spaces", "drive")
            .query("pageSize", params.page_size)
            .query(
                "fields",
                format!("kind,nextPageToken,incompleteSearch,files({})", FILE_FIELDS),
            );
        if !params.q.is_empty() {
            request = request.query("q", &params.q);
        }
        if let Some(token) = &params.page_token {
            request = request.query("pageToken", token);
        }
        if !params.order_by.is_empty() {
            request = request.query("orderBy", &params.order_by);
        }
        let response = request
            .send()
            .await?
            .parse::<ListResponse<FileMetadata>>()?;

        self.cursor = Cursor::from_next_page_token(response.next_page_token);
        self.incomplete_search = response.incomplete_search;
        debug!(
            filter = %params.q,
            page_size = params.page_size,
            count = response.files.len(),
            has_next_page = self.has_next_page(),
            "fetched page"
        );
        Ok(response
            .files
            .into_iter()
            .map(|metadata| File::new(metadata, Arc::clone(&session)))
            .collect())
    }

    /// Sets the page size to 1 and returns the first file of the next page.
    pub async fn run_once(&mut self) -> Result<Option<File>> {
        self.page_size = 1;
        Ok(self.run().await?.into_iter().next())
    }

    /// Turns the query into a stream of pages. The stream ends after the last page or the
    /// first error.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<Vec<File>>> {
        try_stream! {
            while self.has_next_page() {
                let page = self.run().await?;
                yield page;
            }
        }
    }

    /// Fetches all remaining pages.
    pub async fn run_all(self) -> Result<Vec<File>> {
        self.into_stream().try_concat().await
    }
}

fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
