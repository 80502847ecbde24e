//! HTTP gateway used by entity managers
//!
//! [`HttpGateway`] is the seam between request construction and
//! transport. [`Connection`] implements it over a blocking `reqwest`
//! client; tests substitute scripted gateways.

use crate::config::ConnectionConfig;
use crate::error::ODataError;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use std::fmt;
use std::time::Instant;
use tracing::debug;

pub const STATUS_OK: u16 = 200;
pub const STATUS_CREATED: u16 = 201;
pub const STATUS_NO_CONTENT: u16 = 204;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Status line and raw body of a completed round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, reason: impl Into<String>, body: impl Into<String>) -> Self {
        HttpResponse {
            status,
            reason: reason.into(),
            body: body.into(),
        }
    }

    /// Fail with a response error unless the status matches
    pub fn expect_status(self, expected: u16) -> Result<Self, ODataError> {
        if self.status != expected {
            return Err(ODataError::Response {
                status: self.status,
                reason: self.reason,
                body: self.body,
            });
        }
        Ok(self)
    }

    pub fn json(&self) -> Result<Value, ODataError> {
        serde_json::from_str(&self.body)
            .map_err(|e| ODataError::Decoding(format!("{e}. Response: {}", self.body)))
    }
}

/// Executes one request relative to the service root. Never retries.
pub trait HttpGateway {
    fn request(
        &self,
        method: Method,
        relative_url: &str,
        body: Option<&Value>,
    ) -> Result<HttpResponse, ODataError>;
}

impl<G: HttpGateway + ?Sized> HttpGateway for &G {
    fn request(
        &self,
        method: Method,
        relative_url: &str,
        body: Option<&Value>,
    ) -> Result<HttpResponse, ODataError> {
        (**self).request(method, relative_url, body)
    }
}

/// An open session with an OData service.
///
/// The session is released by [`Connection::close`] or on drop; managers
/// borrow the connection, so it cannot be closed while one is alive.
pub struct Connection {
    client: reqwest::blocking::Client,
    service_root: String,
    username: Option<String>,
    password: Option<String>,
}

impl Connection {
    pub fn open(config: &ConnectionConfig) -> Result<Self, ODataError> {
        let service_root = config.service_root();
        let connect_timeout = config.connect_timeout()?;
        let read_timeout = config.read_timeout()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .build()
            .map_err(|e| ODataError::Connectivity {
                url: service_root.clone(),
                reason: e.to_string(),
            })?;

        debug!(service_root = %service_root, "opened connection");

        Ok(Connection {
            client,
            service_root,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// `<base>/<database>/odata/standard.odata/`
    pub fn service_root(&self) -> &str {
        &self.service_root
    }

    pub fn close(self) {
        debug!(service_root = %self.service_root, "closed connection");
    }
}

/// Open a connection for the duration of `f`, closing it on every path
pub fn with_connection<T, E, F>(config: &ConnectionConfig, f: F) -> Result<T, E>
where
    F: FnOnce(&Connection) -> Result<T, E>,
    E: From<ODataError>,
{
    let connection = Connection::open(config)?;
    let result = f(&connection);
    connection.close();
    result
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("service_root", &self.service_root)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl HttpGateway for Connection {
    fn request(
        &self,
        method: Method,
        relative_url: &str,
        body: Option<&Value>,
    ) -> Result<HttpResponse, ODataError> {
        let url = format!("{}{}", self.service_root, relative_url);
        let connectivity = |e: reqwest::Error| ODataError::Connectivity {
            url: url.clone(),
            reason: e.to_string(),
        };

        let mut builder = self.client.request(method.into(), &url);
        if let Some(username) = &self.username {
            builder = builder.basic_auth(username, self.password.as_ref());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let started = Instant::now();
        let response = builder.send().map_err(connectivity)?;
        let status = response.status();
        let body = response.text().map_err(connectivity)?;

        debug!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request finished"
        );

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}
