//! MCP tool implementations.
//!
//! This module contains all tools exposed by the stowaway server.

pub mod control;
pub mod intercept;
pub mod stores;
pub mod sync;

pub use control::{ControlParams, control_impl};
pub use intercept::{InterceptParams, intercept_impl};
pub use stores::stores_impl;
pub use sync::{SyncParams, sync_impl};
