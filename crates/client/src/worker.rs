//! One deployed version of the interception layer, wired from configuration.

use std::sync::Arc;

use stowaway_core::{AppConfig, CacheDb, ControlCommand, Error, LifecycleState, StoreSummary};
use url::Url;

use crate::classify::Classifier;
use crate::clock::Clock;
use crate::control::{ControlChannel, SyncHook};
use crate::fetch::{FetchRequest, Network, canonicalize};
use crate::interceptor::Interceptor;
use crate::lifecycle::LifecycleController;
use crate::strategy::{CachePolicy, Served, StrategyEngine};

pub struct OfflineWorker {
    origin: Url,
    engine: Arc<StrategyEngine>,
    lifecycle: Arc<LifecycleController>,
    interceptor: Interceptor,
    control: ControlChannel,
}

impl OfflineWorker {
    pub fn new(config: &AppConfig, db: CacheDb, network: Arc<dyn Network>, clock: Arc<dyn Clock>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let shell = config
            .shell_resources
            .iter()
            .map(|path| canonicalize(path, &origin).map_err(|e| Error::InvalidUrl(format!("{path}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        let policy = CachePolicy::from_config(config)?;
        let engine = Arc::new(StrategyEngine::new(db, config.store_names(), policy, network, clock));
        let lifecycle = Arc::new(LifecycleController::new(engine.clone(), shell));
        let interceptor = Interceptor::new(Classifier::from_config(config), engine.clone(), lifecycle.clone());
        let control = ControlChannel::new(engine.clone(), lifecycle.clone(), config.sync_tag.clone());

        Ok(Self { origin, engine, lifecycle, interceptor, control })
    }

    pub fn with_sync_hook(mut self, hook: Arc<dyn SyncHook>) -> Self {
        self.control = self.control.with_sync_hook(hook);
        self
    }

    pub async fn install(&self) -> Result<LifecycleState, Error> {
        self.lifecycle.install().await
    }

    pub async fn activate(&self) -> Result<LifecycleState, Error> {
        self.lifecycle.activate().await
    }

    pub async fn supersede(&self) -> Result<LifecycleState, Error> {
        self.lifecycle.supersede().await
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn is_controlling(&self) -> bool {
        self.lifecycle.is_controlling()
    }

    /// Resolve a request URL against the application origin.
    pub fn resolve(&self, url: &str) -> Result<Url, Error> {
        canonicalize(url, &self.origin).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    pub async fn fetch(&self, request: FetchRequest) -> Result<Served, Error> {
        self.interceptor.handle(request).await
    }

    /// Convenience for a plain `GET` (or a navigation) by URL string.
    pub async fn get(&self, url: &str, navigate: bool) -> Result<Served, Error> {
        let url = self.resolve(url)?;
        let request = if navigate { FetchRequest::navigate(url) } else { FetchRequest::get(url) };
        self.fetch(request).await
    }

    pub async fn post_message(&self, message: &serde_json::Value) -> Result<ControlCommand, Error> {
        self.control.handle_message(message).await
    }

    pub fn sync_tag(&self) -> &str {
        self.control.sync_tag()
    }

    pub async fn sync(&self, tag: &str) -> bool {
        self.control.handle_sync(tag).await
    }

    pub async fn store_summaries(&self) -> Result<Vec<StoreSummary>, Error> {
        self.engine.db().list_store_summaries().await
    }

    pub fn engine(&self) -> &Arc<StrategyEngine> {
        &self.engine
    }

    /// Settle all pending background writes. Call before dropping the worker.
    pub async fn shutdown(&self) -> usize {
        let flushed = self.engine.flush().await;
        tracing::info!(flushed, "worker shut down");
        flushed
    }
}
