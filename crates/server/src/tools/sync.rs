//! sync tool implementation.
//!
//! Fires the deferred-sync tag, as the platform does once connectivity
//! returns.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stowaway_client::OfflineWorker;

use crate::error::json_result;

/// Parameters for the sync tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SyncParams {
    /// Tag to fire (default: the configured sync tag).
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncOutput {
    pub tag: String,
    /// Whether the tag matched and the sync routine ran.
    pub matched: bool,
}

pub async fn sync_impl(worker: &OfflineWorker, params: SyncParams) -> Result<CallToolResult, McpError> {
    let tag = params.tag.unwrap_or_else(|| worker.sync_tag().to_string());
    let matched = worker.sync(&tag).await;
    json_result(&SyncOutput { tag, matched })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing;

    #[tokio::test]
    async fn test_sync_default_and_unknown_tag() {
        let worker = testing::worker().await;

        let result = sync_impl(&worker, SyncParams::default()).await.unwrap();
        let output: SyncOutput = serde_json::from_str(&testing::text(&result)).unwrap();
        assert!(output.matched);

        let result = sync_impl(&worker, SyncParams { tag: Some("other".into()) }).await.unwrap();
        let output: SyncOutput = serde_json::from_str(&testing::text(&result)).unwrap();
        assert!(!output.matched);
    }
}
