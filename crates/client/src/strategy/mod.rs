//! Per-class caching strategies.
//!
//! | class        | store   | strategy                                   | window    |
//! |--------------|---------|--------------------------------------------|-----------|
//! | `image`      | image   | cache-first, any-age fallback              | 7 days    |
//! | `api`        | runtime | network-first, bounded fallback            | 5 minutes |
//! | `navigation` | static  | network-first, exact then root fallback    | none      |
//! | `static`     | static  | cache-first, populate on miss              | none      |
//!
//! Every strategy makes at most one network attempt. Storage is best-effort:
//! read failures count as misses and writes run in the background.

mod api;
mod image;
mod navigation;
mod static_assets;
mod writes;

pub use writes::BackgroundWrites;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use stowaway_core::{AppConfig, CacheDb, Error, StoreNames, StoreRole, StoredResponse};
use tokio::sync::RwLock;
use url::Url;

use crate::classify::RequestClass;
use crate::clock::Clock;
use crate::fetch::{FetchRequest, FetchResponse, Network};

/// Header injected into stored API entries: ISO-8601 capture time.
pub const CACHE_DATE_HEADER: &str = "sw-cache-date";

/// Header marking a cached API response served in place of a failed fetch.
pub const OFFLINE_HEADER: &str = "x-offline-response";

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Live network response.
    Network,
    /// Not handled by the caching layer at all.
    Bypass,
    /// Fresh (or never-expiring) store hit, no network call.
    Cache,
    /// Stored entry served after a network failure.
    StaleCache,
    /// API entry inside its window, served after a network failure.
    OfflineFallback,
    /// Root document served for a failed navigation.
    RootFallback,
}

impl ResponseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Bypass => "bypass",
            ResponseSource::Cache => "cache",
            ResponseSource::StaleCache => "stale_cache",
            ResponseSource::OfflineFallback => "offline_fallback",
            ResponseSource::RootFallback => "root_fallback",
        }
    }
}

/// A response handed back to the application.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: FetchResponse,
    pub source: ResponseSource,
}

impl Served {
    fn new(response: FetchResponse, source: ResponseSource) -> Self {
        Self { response, source }
    }
}

/// Staleness windows and fallback targets.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub api_max_age: Duration,
    pub image_max_age: Duration,
    /// Absolute URL of the document served for failed navigations.
    pub root_document: Url,
}

impl CachePolicy {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let root_document = origin
            .join(&config.root_document)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.root_document)))?;
        Ok(Self {
            api_max_age: window("api_max_age_secs", config.api_max_age_secs)?,
            image_max_age: window("image_max_age_secs", config.image_max_age_secs)?,
            root_document,
        })
    }
}

fn window(field: &str, secs: u64) -> Result<Duration, Error> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| Error::InvalidInput(format!("{field} out of range: {secs}")))
}

/// Whether something captured at `captured` is still inside `window`.
pub(crate) fn is_fresh(captured: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    now - captured < window
}

/// Executes the strategy for a classified request.
pub struct StrategyEngine {
    db: CacheDb,
    stores: StoreNames,
    policy: CachePolicy,
    network: Arc<dyn Network>,
    clock: Arc<dyn Clock>,
    writes: BackgroundWrites,
    /// Held shared by every background write and exclusively by a purge.
    purge_gate: Arc<RwLock<()>>,
}

impl StrategyEngine {
    pub fn new(
        db: CacheDb, stores: StoreNames, policy: CachePolicy, network: Arc<dyn Network>, clock: Arc<dyn Clock>,
    ) -> Self {
        Self { db, stores, policy, network, clock, writes: BackgroundWrites::new(), purge_gate: Arc::default() }
    }

    pub async fn execute(&self, class: RequestClass, request: &FetchRequest) -> Result<Served, Error> {
        let served = match class {
            RequestClass::Image => self.image(request).await,
            RequestClass::Api => self.api(request).await,
            RequestClass::Navigation => self.navigation(request).await,
            RequestClass::Static => self.static_asset(request).await,
        };

        match &served {
            Ok(s) => tracing::debug!(
                class = class.as_str(),
                url = %request.url,
                source = s.source.as_str(),
                status = s.response.status.as_u16(),
                "served"
            ),
            Err(e) => tracing::debug!(class = class.as_str(), url = %request.url, error = %e, "strategy failed"),
        }

        served
    }

    /// Send a request straight to the network, touching no store.
    pub async fn passthrough(&self, request: &FetchRequest) -> Result<Served, Error> {
        let response = self.network.fetch(request).await?;
        Ok(Served::new(response, ResponseSource::Bypass))
    }

    /// Wait for all pending background writes.
    pub async fn flush(&self) -> usize {
        self.writes.flush().await
    }

    /// Delete every store.
    ///
    /// Waits for writes already queued, and holds back new ones until the
    /// stores are gone. Purges never overlap.
    pub async fn purge_all(&self) -> Result<u64, Error> {
        let _exclusive = self.purge_gate.write().await;
        let flushed = self.writes.flush().await;
        let deleted = self.db.delete_all_stores().await?;
        tracing::info!(deleted, flushed, "cleared all stores");
        Ok(deleted)
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn stores(&self) -> &StoreNames {
        &self.stores
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Look up a request in a role's store. Storage failures count as a miss.
    pub(crate) async fn lookup(&self, role: StoreRole, request: &FetchRequest) -> Option<StoredResponse> {
        let store = self.stores.get(role);
        match self.db.match_entry(store, &request.key()).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(store, url = %request.url, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    /// Rebuild a stored entry as a response. Undecodable entries count as a miss.
    pub(crate) fn rebuild(&self, entry: StoredResponse) -> Option<FetchResponse> {
        let url = entry.url.clone();
        FetchResponse::from_stored(entry)
            .inspect_err(|e| tracing::warn!(%url, error = %e, "discarding undecodable cache entry"))
            .ok()
    }

    /// A storable copy of a live response, or `None` (logged) if it cannot be
    /// stored faithfully.
    pub(crate) fn storable(&self, request: &FetchRequest, response: &FetchResponse) -> Option<StoredResponse> {
        response
            .to_stored(request, self.now())
            .inspect_err(|e| tracing::debug!(url = %request.url, error = %e, "response not cached"))
            .ok()
    }

    /// Queue an overwrite of the role's entry for this request.
    ///
    /// Never fails the caller: write errors are logged.
    pub(crate) async fn store_in_background(&self, role: StoreRole, stored: StoredResponse) {
        let db = self.db.clone();
        let store = self.stores.get(role).to_string();
        let permit = Arc::clone(&self.purge_gate).read_owned().await;
        self.writes.spawn(async move {
            if let Err(e) = db.put_entry(&store, &stored).await {
                tracing::warn!(%store, url = %stored.url, error = %e, "cache write failed");
            }
            drop(permit);
        });
    }
}
