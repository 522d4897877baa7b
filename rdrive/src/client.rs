use crate::auth::{
    AuthProvider, Credentials, Error as AuthError, RefreshingToken, ServiceAccountKey, StaticToken,
    TokenProvider, DRIVE_SCOPE,
};
use crate::transport::{Body, HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::{Result, Urls};
use bytes::Bytes;
use reqwest::Method;
use std::{fmt, sync::Arc};
use tokio::sync::OnceCell;
use tracing::debug;
use typed_builder::TypedBuilder;
use url::Url;

/// Configuration shared by a [`Drive`](crate::Drive) and every [`Query`](crate::Query) it
/// creates.
///
/// # Example
///
/// ```
/// use rdrive::{auth::Credentials, Config, Urls};
///
/// let config = Config::builder()
///     .credentials(Credentials::KeyFile("service-account.json".into()))
///     .urls(Urls::official()) // optional
///     .build();
/// ```
#[derive(Clone, TypedBuilder)]
pub struct Config {
    pub(crate) credentials: Credentials,
    #[builder(default = Urls::official())]
    pub(crate) urls: Urls,
    #[builder(default = Arc::new(ReqwestTransport::new()))]
    pub(crate) transport: Arc<dyn Transport>,
    /// Needed for [`Credentials::KeyFile`] and [`Credentials::ServiceAccount`].
    #[builder(default, setter(strip_option))]
    pub(crate) auth_provider: Option<Arc<dyn AuthProvider>>,
}

impl Config {
    /// Returns the credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns the URLs of the API endpoints.
    pub fn urls(&self) -> &Urls {
        &self.urls
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("credentials", &self.credentials)
            .field("urls", &self.urls)
            .field("auth_provider", &self.auth_provider.is_some())
            .finish()
    }
}

/// Lazily resolves and caches one authenticated [`Session`] for a [`Config`].
///
/// The session is resolved on the first call to [`AuthClient::session`] and reused for the
/// lifetime of the client. Token refresh is handled by the session's token provider.
pub struct AuthClient {
    config: Config,
    session: OnceCell<Arc<Session>>,
}

impl AuthClient {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns whether the session has been resolved yet.
    pub fn is_resolved(&self) -> bool {
        self.session.initialized()
    }

    /// Returns the cached session, resolving it first if needed.
    pub async fn session(&self) -> Result<Arc<Session>> {
        let session = self.session.get_or_try_init(|| self.resolve()).await?;
        Ok(Arc::clone(session))
    }

    async fn resolve(&self) -> Result<Arc<Session>> {
        let tokens: Arc<dyn TokenProvider> = match &self.config.credentials {
            Credentials::AccessToken(token) => Arc::new(StaticToken::new(token.as_str())),
            Credentials::Refresh(credentials) => Arc::new(RefreshingToken::new(
                credentials.clone(),
                self.config.urls.token.clone(),
            )),
            Credentials::KeyFile(path) => {
                let key = ServiceAccountKey::from_file(path).await?;
                self.authorize(&key).await?
            }
            Credentials::ServiceAccount(key) => self.authorize(key).await?,
        };
        debug!(credentials = ?self.config.credentials, "resolved session");
        Ok(Arc::new(Session::new(
            self.config.urls.clone(),
            Arc::clone(&self.config.transport),
            tokens,
        )))
    }

    async fn authorize(&self, key: &ServiceAccountKey) -> Result<Arc<dyn TokenProvider>> {
        let provider = self
            .config
            .auth_provider
            .as_ref()
            .ok_or(AuthError::MissingAuthProvider)?;
        Ok(provider.authorize(key, &[DRIVE_SCOPE]).await?)
    }
}

impl fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthClient")
            .field("config", &self.config)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// An authenticated handle used for sending requests to the Drive API.
pub struct Session {
    urls: Urls,
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenProvider>,
}

impl Session {
    /// Creates a new [`Session`] from its parts.
    pub fn new(urls: Urls, transport: Arc<dyn Transport>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            urls,
            transport,
            tokens,
        }
    }

    /// Returns the URLs of the API endpoints.
    pub fn urls(&self) -> &Urls {
        &self.urls
    }

    /// Starts a request against one of the endpoints in [`Urls`], with `path_segments` appended
    /// to its path.
    pub fn request<F, I>(
        &self,
        method: Method,
        url: F,
        path_segments: I,
    ) -> Result<RequestBuilder<'_>>
    where
        F: Fn(&Urls) -> &Url,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = url(&self.urls).clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(path_segments);
        Ok(RequestBuilder {
            session: self,
            request: HttpRequest {
                method,
                url,
                query: Vec::new(),
                bearer: None,
                body: Body::Empty,
            },
        })
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("urls", &self.urls).finish()
    }
}

/// A request under construction, see [`Session::request`].
#[derive(Debug)]
pub struct RequestBuilder<'session> {
    session: &'session Session,
    request: HttpRequest,
}

impl<'session> RequestBuilder<'session> {
    /// Appends a query parameter.
    pub fn query<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        self.request.query.push((key.into(), value.to_string()));
        self
    }

    /// Sets a JSON body.
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.request.body = Body::Json(value);
        self
    }

    /// Sets a raw body with the given content type.
    pub fn body<C, B>(mut self, content_type: C, data: B) -> Self
    where
        C: Into<String>,
        B: Into<Bytes>,
    {
        self.request.body = Body::Bytes {
            content_type: content_type.into(),
            data: data.into(),
        };
        self
    }

    /// Attaches the access token and sends the request.
    pub async fn send(self) -> Result<HttpResponse> {
        let mut request = self.request;
        request.bearer = Some(self.session.tokens.access_token().await?);
        debug!(method = %request.method, url = %request.url, "sending request");
        self.session.transport.send(request).await
    }
}
