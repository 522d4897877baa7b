use crate::{response, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Method};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::warn;
use url::Url;

/// Body of an [`HttpRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    Bytes { content_type: String, data: Bytes },
}

/// A fully resolved request, ready to be put on the wire.
#[derive(Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub query: Vec<(String, String)>,
    /// The access token sent in the `Authorization` header.
    pub bearer: Option<String>,
    pub body: Body,
}

impl HttpRequest {
    /// Returns the value of the first query parameter named `name`.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("query", &self.query)
            .field("body", &self.body)
            .finish()
    }
}

/// A response with its body already read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new<B: Into<Bytes>>(status: u16, body: B) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let error = response::Error::from_body(self.status, &self.body);
        warn!(status = error.status, message = %error.message, "request failed");
        Err(error.into())
    }

    /// Deserializes the JSON body of a successful response.
    pub fn parse<T: DeserializeOwned>(self) -> Result<T> {
        let response = self.error_for_status()?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// Checks that the response is successful and discards the body.
    pub fn parse_empty(self) -> Result<()> {
        self.error_for_status()?;
        Ok(())
    }

    /// Returns the raw body of a successful response.
    pub fn into_bytes(self) -> Result<Bytes> {
        Ok(self.error_for_status()?.body)
    }
}

/// The HTTP layer used by a [`Session`](crate::Session).
///
/// A transport only moves bytes. Interpreting the status code is left to the caller, so an
/// implementation should return `Ok` for every response it received, successful or not.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// The default [`Transport`], backed by [`reqwest`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that reuses an existing client, e.g. one with custom timeouts.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .query(&request.query);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Bytes { content_type, data } => {
                builder.header(header::CONTENT_TYPE, content_type).body(data)
            }
        };
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mockall::mock! {
    pub Transport {}

    #[async_trait]
    impl Transport for Transport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
    }
}
