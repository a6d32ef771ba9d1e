//! cache_stores tool implementation.
//!
//! Reports the lifecycle state and every store with its size.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stowaway_client::OfflineWorker;
use stowaway_core::{LifecycleState, StoreSummary};

use crate::error::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoresOutput {
    pub state: LifecycleState,
    /// Whether requests are routed through the caching strategies.
    pub controlling: bool,
    /// The three current store names.
    pub current: Vec<String>,
    pub stores: Vec<StoreSummary>,
}

pub async fn stores_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let current = worker.engine().stores().current().map(str::to_string).to_vec();
    let output = StoresOutput {
        state: worker.state(),
        controlling: worker.is_controlling(),
        current,
        stores: worker.store_summaries().await?,
    };
    json_result(&output)
}
