use crate::{
    AuthClient, Config, File, FileMetadata, Query, Result, Session, UpdateOptions, FILE_FIELDS,
    FOLDER_MIME_TYPE,
};
use derive_setters::Setters;
use reqwest::Method;
use serde::Serialize;
use std::{path::Path, sync::Arc};
use tracing::{info, warn};

/// Options for [`Drive::create_folder`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Setters)]
#[setters(strip_option, into, prefix = "with_")]
pub struct CreateFolderOptions {
    pub name: Option<String>,
    pub description: Option<String>,
    /// ID of the folder to create the new folder in. The root folder is used if unset.
    pub parent: Option<String>,
}

/// Client for the Drive API.
///
/// # Example
///
/// ```no_run
/// use rdrive::{auth::Credentials, Config, CreateFolderOptions, Drive};
///
/// # async fn run() -> rdrive::Result<()> {
/// let drive = Drive::new(
///     Config::builder()
///         .credentials(Credentials::from_env().expect("no credentials in environment"))
///         .build(),
/// );
/// let folder = drive
///     .create_folder(&CreateFolderOptions::default().with_name("Reports"))
///     .await?;
/// println!("created {}", folder.id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Drive {
    client: AuthClient,
}

impl Drive {
    pub fn new(config: Config) -> Self {
        Self {
            client: AuthClient::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        self.client.config()
    }

    /// Returns the authenticated session, resolving it on first use.
    pub async fn session(&self) -> Result<Arc<Session>> {
        self.client.session().await
    }

    /// Starts a new search. The query resolves its own session.
    pub fn query(&self) -> Query {
        Query::new(self.client.config().clone())
    }

    /// Gets the file with the given ID. Returns `Ok(None)` if it does not exist.
    pub async fn get_file(&self, id: &str) -> Result<Option<File>> {
        let session = self.session().await?;
        let result = session
            .request(Method::GET, |urls| &urls.base, &["files", id])?
            .query("fields", FILE_FIELDS)
            .send()
            .await?
            .parse::<FileMetadata>();
        match result {
            Ok(metadata) => Ok(Some(File::new(metadata, Arc::clone(&session)))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Like [`get_file`](Self::get_file), but logs and swallows every error.
    pub async fn lookup_file(&self, id: &str) -> Option<File> {
        match self.get_file(id).await {
            Ok(file) => file,
            Err(e) => {
                warn!(id, error = %e, "file lookup failed");
                None
            }
        }
    }

    /// Creates a folder.
    pub async fn create_folder(&self, options: &CreateFolderOptions) -> Result<File> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Request<'a> {
            mime_type: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            name: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            description: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            parents: Option<[&'a str; 1]>,
        }

        let session = self.session().await?;
        let body = serde_json::to_value(Request {
            mime_type: FOLDER_MIME_TYPE,
            name: options.name.as_deref(),
            description: options.description.as_deref(),
            parents: options.parent.as_deref().map(|v| [v]),
        })?;
        let metadata: FileMetadata = session
            .request(Method::POST, |urls| &urls.base, &["files"])?
            .query("fields", FILE_FIELDS)
            .json(body)
            .send()
            .await?
            .parse()?;
        info!(id = %metadata.id, name = %metadata.name, "created folder");
        Ok(File::new(metadata, session))
    }

    /// Uploads a local file.
    ///
    /// The content is sent first, then `options` are applied with [`File::update`]. The name
    /// defaults to the last component of `path`, and the content type is guessed from its
    /// extension.
    pub async fn upload<P: AsRef<Path>>(&self, path: P, options: UpdateOptions) -> Result<File> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await?;
        let content_type = mime_guess::from_path(path).first_or_octet_stream();

        let session = self.session().await?;
        let metadata: FileMetadata = session
            .request(Method::POST, |urls| &urls.upload, std::iter::empty::<&str>())?
            .query("uploadType", "media")
            .query("fields", FILE_FIELDS)
            .body(content_type.essence_str(), content)
            .send()
            .await?
            .parse()?;
        let mut file = File::new(metadata, session);

        let mut options = options;
        if options.name.is_none() {
            options.name = path
                .file_name()
                .map(|v| v.to_string_lossy().into_owned());
        }
        file.update(&options).await?;
        info!(id = %file.id, name = %file.name, size = file.size, "uploaded file");
        Ok(file)
    }

    /// Permanently deletes every file in the trash.
    pub async fn empty_trash(&self) -> Result<()> {
        self.session()
            .await?
            .request(Method::DELETE, |urls| &urls.base, &["files", "trash"])?
            .send()
            .await?
            .parse_empty()?;
        info!("emptied trash");
        Ok(())
    }
}
