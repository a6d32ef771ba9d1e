//! Core types and shared functionality for stowaway.
//!
//! This crate provides:
//! - Cache store manager with SQLite backend
//! - Unified error types
//! - Configuration structures
//! - The lifecycle state machine and control commands

pub mod cache;
pub mod command;
pub mod config;
pub mod error;
pub mod lifecycle;

pub use cache::{CacheDb, StoreNames, StoreRole, StoreSummary, StoredResponse};
pub use command::ControlCommand;
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use lifecycle::{LifecycleEffect, LifecycleEvent, LifecycleState, Transition};
