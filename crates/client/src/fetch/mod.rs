//! Network seam: request/response types and the reqwest-backed client.
//!
//! ### Failure model
//! - Only transport problems (connect, DNS, TLS, timeout, body read) are
//!   failures. A 4xx/5xx is a response and is returned as such.
//! - Max body bytes: 5MB (configurable)
//! - Max redirects: 5
//!
//! ### Request identity
//! - `method + canonical URL`, see [`url::canonicalize`].

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use std::time::{Duration, Instant};
use stowaway_core::cache::hash::compute_request_key;
use stowaway_core::{AppConfig, Error, StoredResponse};

pub use self::url::{UrlError, canonicalize};

/// What the page asked the request for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Load a full document for a browsing context.
    Navigate,
    #[default]
    Cors,
    NoCors,
    SameOrigin,
}

/// An intercepted outgoing request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub mode: RequestMode,
}

impl FetchRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: HeaderMap::new(), body: Bytes::new(), mode: RequestMode::default() }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// A top-level document load.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Build a request from loosely typed parts, as a host sends them.
    pub fn from_parts(method: &str, url: Url, headers: &[(String, String)], body: Option<String>) -> Result<Self, Error> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("method {method:?}: {e}")))?;

        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidInput(format!("header name {name:?}: {e}")))?;
            let value =
                HeaderValue::from_str(value).map_err(|e| Error::InvalidInput(format!("header value {value:?}: {e}")))?;
            map.append(name, value);
        }

        let request = Self::new(method, url).with_headers(map);
        Ok(match body {
            Some(body) => request.with_body(body),
            None => request,
        })
    }

    /// Request identity cache key.
    pub fn key(&self) -> String {
        compute_request_key(self.method.as_str(), self.url.as_str())
    }
}

/// A response, either live from the network or rebuilt from a store.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// URL the response was produced for
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Reason phrase
    pub status_text: String,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds (0 when served from a store)
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Whether the status is 2xx.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Capture a storable copy keyed by the request's identity.
    ///
    /// `Bytes` is reference counted, so the live body stays readable by the
    /// caller after the copy is taken.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a header value is not valid UTF-8. Stored
    /// headers are text, and such a value would not come back unchanged.
    pub fn to_stored(&self, request: &FetchRequest, stored_at: DateTime<Utc>) -> Result<StoredResponse, Error> {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| match std::str::from_utf8(value.as_bytes()) {
                Ok(text) => Ok((name.as_str().to_string(), text.to_string())),
                Err(_) => Err(Error::InvalidInput(format!("header {name} is not valid UTF-8"))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StoredResponse {
            method: request.method.as_str().to_string(),
            url: request.url.to_string(),
            status: self.status.as_u16(),
            status_text: self.status_text.clone(),
            headers,
            body: self.bytes.to_vec(),
            stored_at,
        })
    }

    /// Rebuild a response from a stored entry, preserving status, status
    /// text and headers.
    pub fn from_stored(stored: StoredResponse) -> Result<Self, Error> {
        let url = Url::parse(&stored.url).map_err(|e| Error::CorruptEntry(format!("url {}: {e}", stored.url)))?;
        let status = StatusCode::from_u16(stored.status)
            .map_err(|e| Error::CorruptEntry(format!("status {} for {url}: {e}", stored.status)))?;

        let mut headers = HeaderMap::with_capacity(stored.headers.len());
        for (name, value) in &stored.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::CorruptEntry(format!("header name {name:?}: {e}")))?;
            let value = HeaderValue::from_bytes(value.as_bytes())
                .map_err(|e| Error::CorruptEntry(format!("header value {value:?}: {e}")))?;
            headers.append(name, value);
        }

        Ok(Self { url, status, status_text: stored.status_text, headers, bytes: Bytes::from(stored.body), fetch_ms: 0 })
    }
}

/// Something that can replay a request to the real network.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform exactly one attempt. No retries.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "stowaway/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "stowaway/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// HTTP client that replays intercepted requests.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    fn too_large(&self, len: usize) -> Error {
        Error::FetchTooLarge(format!("{len} bytes exceeds {}", self.config.max_bytes))
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(transport_error)?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(transport_error)?;

        if bytes.len() > self.config.max_bytes {
            return Err(self.too_large(bytes.len()));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            fetch_ms,
            bytes = bytes.len(),
            content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            "network fetch"
        );

        Ok(FetchResponse {
            url: request.url.clone(),
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            bytes,
            fetch_ms,
        })
    }
}
