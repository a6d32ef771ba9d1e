//! Control messages from the hosting application and the deferred-sync hook.

use std::sync::Arc;

use async_trait::async_trait;
use stowaway_core::{ControlCommand, Error};

use crate::lifecycle::LifecycleController;
use crate::strategy::StrategyEngine;

/// Routine run when the deferred-sync tag fires after connectivity returns.
#[async_trait]
pub trait SyncHook: Send + Sync {
    async fn sync(&self, tag: &str) -> Result<(), Error>;
}

/// Sync hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSync;

#[async_trait]
impl SyncHook for NoopSync {
    async fn sync(&self, tag: &str) -> Result<(), Error> {
        tracing::debug!(tag, "sync hook fired; nothing to do");
        Ok(())
    }
}

pub struct ControlChannel {
    engine: Arc<StrategyEngine>,
    lifecycle: Arc<LifecycleController>,
    sync_tag: String,
    sync_hook: Arc<dyn SyncHook>,
}

impl ControlChannel {
    pub fn new(engine: Arc<StrategyEngine>, lifecycle: Arc<LifecycleController>, sync_tag: impl Into<String>) -> Self {
        Self { engine, lifecycle, sync_tag: sync_tag.into(), sync_hook: Arc::new(NoopSync) }
    }

    pub fn with_sync_hook(mut self, hook: Arc<dyn SyncHook>) -> Self {
        self.sync_hook = hook;
        self
    }

    pub fn sync_tag(&self) -> &str {
        &self.sync_tag
    }

    /// Validate and execute a raw control message.
    ///
    /// Unknown kinds are rejected without side effects.
    pub async fn handle_message(&self, message: &serde_json::Value) -> Result<ControlCommand, Error> {
        let command = ControlCommand::from_value(message)
            .inspect_err(|e| tracing::warn!(error = %e, "rejected control message"))?;
        self.execute(command).await?;
        Ok(command)
    }

    pub async fn execute(&self, command: ControlCommand) -> Result<(), Error> {
        tracing::info!(command = command.kind(), "control command");
        match command {
            ControlCommand::SkipWaiting => {
                self.lifecycle.skip_waiting().await?;
            }
            ControlCommand::ClearCache => {
                self.clear_all().await?;
            }
        }
        Ok(())
    }

    /// Delete every store. Pending writes settle first, and purges never overlap.
    pub async fn clear_all(&self) -> Result<u64, Error> {
        self.engine.purge_all().await
    }

    /// Fire the sync hook if `tag` is ours. Hook errors are logged, never returned.
    ///
    /// Returns whether the tag matched.
    pub async fn handle_sync(&self, tag: &str) -> bool {
        if tag != self.sync_tag {
            tracing::debug!(tag, "ignoring unknown sync tag");
            return false;
        }
        if let Err(e) = self.sync_hook.sync(tag).await {
            tracing::warn!(tag, error = %e, "sync hook failed");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::fetch::FetchRequest;
    use crate::test_support::{ScriptedNetwork, engine, url};
    use chrono::Utc;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stowaway_core::LifecycleState;

    struct FailingSync(AtomicUsize);

    #[async_trait]
    impl SyncHook for FailingSync {
        async fn sync(&self, _tag: &str) -> Result<(), Error> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(Error::Network("still offline".into()))
        }
    }

    async fn channel(network: Arc<ScriptedNetwork>) -> (ControlChannel, Arc<StrategyEngine>, Arc<LifecycleController>) {
        network.route(&url("/index.html"), 200, "<html></html>");
        let engine = Arc::new(engine(network, Arc::new(ManualClock::new(Utc::now()))).await);
        let lifecycle = Arc::new(LifecycleController::new(engine.clone(), vec![url("/index.html")]));
        (ControlChannel::new(engine.clone(), lifecycle.clone(), "sync-data"), engine, lifecycle)
    }

    #[tokio::test]
    async fn test_clear_cache_removes_every_store() {
        let network = ScriptedNetwork::new();
        network.route(&url("/app.js"), 200, "js");
        let (channel, engine, lifecycle) = channel(network).await;
        lifecycle.install().await.unwrap();
        engine.db().open_store("someone-else-v9").await.unwrap();

        // still pending when the purge starts
        engine.execute(crate::RequestClass::Static, &FetchRequest::get(url("/app.js"))).await.unwrap();

        let command = channel.handle_message(&json!({"type": "CLEAR_CACHE"})).await.unwrap();
        assert_eq!(command, ControlCommand::ClearCache);
        assert!(engine.db().list_store_names().await.unwrap().is_empty());
        assert_eq!(engine.flush().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_command_has_no_effect() {
        let (channel, engine, lifecycle) = channel(ScriptedNetwork::new()).await;
        lifecycle.install().await.unwrap();

        for message in [json!({"type": "clear_cache"}), json!({"type": "CLEAR_CACHE_NOW"}), json!({})] {
            let result = channel.handle_message(&message).await;
            assert!(matches!(result, Err(Error::UnknownCommand(_))), "{message}");
        }
        assert_eq!(engine.db().list_store_names().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_skip_waiting_while_active_is_accepted() {
        let (channel, _, lifecycle) = channel(ScriptedNetwork::new()).await;
        lifecycle.install().await.unwrap();

        channel.handle_message(&json!({"type": "SKIP_WAITING"})).await.unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Active);
    }

    #[tokio::test]
    async fn test_skip_waiting_before_install_is_rejected() {
        let (channel, _, _) = channel(ScriptedNetwork::new()).await;
        let result = channel.execute(ControlCommand::SkipWaiting).await;
        assert!(matches!(result, Err(Error::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_sync_hook_errors_are_swallowed() {
        let (channel, _, _) = channel(ScriptedNetwork::new()).await;
        let hook = Arc::new(FailingSync(AtomicUsize::new(0)));
        let channel = channel.with_sync_hook(hook.clone());

        assert!(channel.handle_sync("sync-data").await);
        assert!(!channel.handle_sync("other").await);
        assert_eq!(hook.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_noop_sync() {
        let (channel, _, _) = channel(ScriptedNetwork::new()).await;
        assert!(channel.handle_sync(channel.sync_tag()).await);
    }
}
