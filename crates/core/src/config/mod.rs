//! Worker configuration.
//!
//! Values come from `STOWAWAY_*` environment variables, then the TOML file
//! named by `STOWAWAY_CONFIG_FILE`, then the defaults below.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::StoreNames;

mod validation;

pub use validation::ConfigError;

/// Everything one deployed worker version needs: origin, store naming,
/// the shell to seed, classification markers and staleness windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite file holding every store.
    ///
    /// Set via STOWAWAY_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Version qualifier appended to every store name.
    ///
    /// Must change whenever the shell resource set or strategy logic changes,
    /// so the next activation drops the old stores.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Prefix shared by all store names.
    #[serde(default = "default_store_prefix")]
    pub store_prefix: String,

    /// Origin of the hosted application. Relative request paths and the
    /// shell resources resolve against it.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Paths seeded into the static store at install time.
    #[serde(default = "default_shell_resources")]
    pub shell_resources: Vec<String>,

    /// Document served when a navigation fails with no exact entry.
    #[serde(default = "default_root_document")]
    pub root_document: String,

    /// URL substrings that mark a remote-API request.
    #[serde(default = "default_api_path_markers")]
    pub api_path_markers: Vec<String>,

    /// Staleness window for API fallbacks, in seconds.
    #[serde(default = "default_api_max_age_secs")]
    pub api_max_age_secs: u64,

    /// Staleness window for image entries, in seconds.
    #[serde(default = "default_image_max_age_secs")]
    pub image_max_age_secs: u64,

    /// Deferred-sync tag that triggers the synchronization hook.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// User-Agent string for network requests.
    ///
    /// Set via STOWAWAY_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./stowaway-cache.sqlite")
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_store_prefix() -> String {
    "stowaway".into()
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_shell_resources() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/manifest.json".into()]
}

fn default_root_document() -> String {
    "/index.html".into()
}

fn default_api_path_markers() -> Vec<String> {
    vec!["/rest/v1/".into()]
}

fn default_api_max_age_secs() -> u64 {
    5 * 60
}

fn default_image_max_age_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_sync_tag() -> String {
    "sync-data".into()
}

fn default_user_agent() -> String {
    "stowaway/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_version: default_cache_version(),
            store_prefix: default_store_prefix(),
            origin: default_origin(),
            shell_resources: default_shell_resources(),
            root_document: default_root_document(),
            api_path_markers: default_api_path_markers(),
            api_max_age_secs: default_api_max_age_secs(),
            image_max_age_secs: default_image_max_age_secs(),
            sync_tag: default_sync_tag(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Current store names for the configured prefix and version.
    pub fn store_names(&self) -> StoreNames {
        StoreNames::new(&self.store_prefix, &self.cache_version)
    }

    /// The configured origin as a parsed URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `STOWAWAY_`
    /// 2. TOML file from `STOWAWAY_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed or
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("STOWAWAY_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("STOWAWAY_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
