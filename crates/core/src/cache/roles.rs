//! Store roles and their version-qualified names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical cache category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StoreRole {
    /// App shell: seeded resources, navigations and static assets.
    Static,
    /// Remote API responses.
    Runtime,
    /// Image assets.
    Image,
}

impl StoreRole {
    pub const ALL: [StoreRole; 3] = [StoreRole::Static, StoreRole::Runtime, StoreRole::Image];

    fn segment(self) -> &'static str {
        match self {
            StoreRole::Static => "static",
            StoreRole::Runtime => "runtime",
            StoreRole::Image => "images",
        }
    }
}

impl fmt::Display for StoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// The current store name for each role.
///
/// Names have the form `{prefix}-{role}-{version}`; bumping the version makes
/// every store of the previous deployment obsolete at the next activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNames {
    static_store: String,
    runtime_store: String,
    image_store: String,
}

impl StoreNames {
    pub fn new(prefix: &str, version: &str) -> Self {
        let name = |role: StoreRole| format!("{prefix}-{}-{version}", role.segment());
        Self {
            static_store: name(StoreRole::Static),
            runtime_store: name(StoreRole::Runtime),
            image_store: name(StoreRole::Image),
        }
    }

    pub fn get(&self, role: StoreRole) -> &str {
        match role {
            StoreRole::Static => &self.static_store,
            StoreRole::Runtime => &self.runtime_store,
            StoreRole::Image => &self.image_store,
        }
    }

    /// All three current names, in role order.
    pub fn current(&self) -> [&str; 3] {
        StoreRole::ALL.map(|role| self.get(role))
    }
}
