//! SQLite-backed cache store manager.
//!
//! This module provides named, versioned stores of captured responses using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Request identity keys using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Wholesale store deletion for version eviction and manual purges

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod roles;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::StoredResponse;
pub use roles::{StoreNames, StoreRole};
pub use stores::StoreSummary;
