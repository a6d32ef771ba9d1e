//! control tool implementation.
//!
//! Delivers a `{"type": ...}` control message to the worker.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stowaway_client::OfflineWorker;
use stowaway_core::LifecycleState;

use crate::error::json_result;

/// Parameters for the control tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ControlParams {
    /// The message, e.g. `{"type": "SKIP_WAITING"}` or `{"type": "CLEAR_CACHE"}`.
    pub message: serde_json::Value,
}

/// Output from the control tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ControlOutput {
    /// The command that was executed.
    pub command: String,
    /// Lifecycle state after the command.
    pub state: LifecycleState,
}

/// Implementation of the control tool.
pub async fn control_impl(worker: &OfflineWorker, params: ControlParams) -> Result<CallToolResult, McpError> {
    let command = worker.post_message(&params.message).await?;
    json_result(&ControlOutput { command: command.kind().to_string(), state: worker.state() })
}
