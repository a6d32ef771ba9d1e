//! intercept tool implementation.
//!
//! Routes one request from the host application through the worker and
//! returns the response it would see.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stowaway_client::{FetchRequest, OfflineWorker, RequestMode};

use crate::error::{ToolError, json_result};

/// Input parameters for the intercept tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InterceptParams {
    /// Request URL, absolute or relative to the application origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are cached.
    #[serde(default = "default_method")]
    pub method: String,

    /// Whether this is a top-level document load.
    #[serde(default)]
    pub navigate: bool,

    /// Request headers as name/value pairs.
    #[serde(default)]
    pub headers: Vec<(String, String)>,

    /// Request body.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// A response header.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

/// Output structure for the intercept tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InterceptOutput {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<HeaderEntry>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub body_bytes: usize,
    /// network, bypass, cache, stale_cache, offline_fallback or root_fallback.
    pub source: String,
    pub fetch_ms: u64,
}

/// Implementation of the intercept tool.
pub async fn intercept_impl(worker: &OfflineWorker, params: InterceptParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }

    let url = worker.resolve(&params.url)?;
    let mut request = FetchRequest::from_parts(&params.method, url, &params.headers, params.body)?;
    if params.navigate {
        request.mode = RequestMode::Navigate;
    }

    let served = worker.fetch(request).await?;
    let response = served.response;

    let output = InterceptOutput {
        url: response.url.to_string(),
        status: response.status.as_u16(),
        status_text: response.status_text,
        headers: response
            .headers
            .iter()
            .map(|(name, value)| HeaderEntry {
                name: name.as_str().to_string(),
                value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
            })
            .collect(),
        body: String::from_utf8_lossy(&response.bytes).into_owned(),
        body_bytes: response.bytes.len(),
        source: served.source.as_str().to_string(),
        fetch_ms: response.fetch_ms,
    };

    json_result(&output)
}
