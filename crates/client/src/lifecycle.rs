//! Runs the lifecycle state machine and its side effects.
//!
//! Transitions are serialized: one event (and the follow-up events its
//! effects produce) is processed to completion before the next is accepted.
//! The current state is published on a watch channel so request handling
//! never waits behind an install.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use stowaway_core::{Error, LifecycleEffect, LifecycleEvent, LifecycleState, StoreRole};
use tokio::sync::{Mutex, watch};
use url::Url;

use crate::fetch::FetchRequest;
use crate::strategy::StrategyEngine;

pub struct LifecycleController {
    engine: Arc<StrategyEngine>,
    shell: Vec<Url>,
    state: watch::Sender<LifecycleState>,
    transitions: Mutex<()>,
    claimed: AtomicBool,
}

impl LifecycleController {
    /// `shell` lists the absolute URLs seeded into the static store on install.
    pub fn new(engine: Arc<StrategyEngine>, shell: Vec<Url>) -> Self {
        Self {
            engine,
            shell,
            state: watch::Sender::new(LifecycleState::default()),
            transitions: Mutex::new(()),
            claimed: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Whether requests are routed through the caching strategies.
    pub fn is_controlling(&self) -> bool {
        self.state().is_controlling() && self.claimed.load(Ordering::SeqCst)
    }

    pub async fn install(&self) -> Result<LifecycleState, Error> {
        self.dispatch(LifecycleEvent::Install).await
    }

    pub async fn activate(&self) -> Result<LifecycleState, Error> {
        self.dispatch(LifecycleEvent::Activate).await
    }

    pub async fn skip_waiting(&self) -> Result<LifecycleState, Error> {
        self.dispatch(LifecycleEvent::SkipWaiting).await
    }

    /// A newer version took over: stop controlling and become redundant.
    pub async fn supersede(&self) -> Result<LifecycleState, Error> {
        let state = self.dispatch(LifecycleEvent::Superseded).await?;
        self.claimed.store(false, Ordering::SeqCst);
        Ok(state)
    }

    /// Apply an event and run effects until the machine settles.
    ///
    /// A failing effect applies `Failed` (when the current state accepts it)
    /// and returns the effect's error.
    pub async fn dispatch(&self, event: LifecycleEvent) -> Result<LifecycleState, Error> {
        let _serialized = self.transitions.lock().await;
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let from = self.state();
            let transition = from.apply(event)?;
            self.state.send_replace(transition.next);
            tracing::info!(?event, ?from, to = ?transition.next, "lifecycle transition");

            for effect in transition.effects {
                match self.run_effect(effect).await {
                    Ok(Some(follow_up)) => queue.push_back(follow_up),
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(?effect, error = %err, "lifecycle effect failed");
                        if let Ok(failed) = self.state().apply(LifecycleEvent::Failed) {
                            self.state.send_replace(failed.next);
                            tracing::info!(to = ?failed.next, "lifecycle transition after failure");
                        }
                        return Err(err);
                    }
                }
            }
        }

        Ok(self.state())
    }

    async fn run_effect(&self, effect: LifecycleEffect) -> Result<Option<LifecycleEvent>, Error> {
        match effect {
            LifecycleEffect::SeedStaticStore => {
                self.seed_static_store().await?;
                Ok(Some(LifecycleEvent::Installed))
            }
            LifecycleEffect::SkipWaiting => Ok(Some(LifecycleEvent::SkipWaiting)),
            LifecycleEffect::PurgeObsoleteStores => {
                let keep = self.engine.stores().current();
                let deleted = self.engine.db().delete_stores_except(&keep).await?;
                if !deleted.is_empty() {
                    tracing::info!(?deleted, "deleted obsolete stores");
                }
                Ok(None)
            }
            LifecycleEffect::ClaimClients => {
                self.claimed.store(true, Ordering::SeqCst);
                Ok(Some(LifecycleEvent::Activated))
            }
        }
    }

    /// Fetch every shell resource, then write them all. Nothing is written
    /// unless every fetch succeeded with a 2xx.
    async fn seed_static_store(&self) -> Result<(), Error> {
        let network = self.engine.network();
        let mut seeded = Vec::with_capacity(self.shell.len());

        for url in &self.shell {
            let request = FetchRequest::get(url.clone());
            let response = network
                .fetch(&request)
                .await
                .map_err(|e| Error::SeedFailed(format!("{url}: {e}")))?;
            if !response.ok() {
                return Err(Error::SeedFailed(format!("{url}: status {}", response.status)));
            }
            let stored = response
                .to_stored(&request, self.engine.now())
                .map_err(|e| Error::SeedFailed(format!("{url}: {e}")))?;
            seeded.push(stored);
        }

        let store = self.engine.stores().get(StoreRole::Static);
        self.engine.db().open_store(store).await?;
        for entry in &seeded {
            self.engine
                .db()
                .put_entry(store, entry)
                .await
                .map_err(|e| Error::SeedFailed(format!("{}: {e}", entry.url)))?;
        }

        tracing::info!(store, resources = seeded.len(), "seeded static store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::test_support::{ScriptedNetwork, engine, url};
    use chrono::Utc;

    fn shell() -> Vec<Url> {
        ["/", "/index.html", "/manifest.json"].into_iter().map(url).collect()
    }

    async fn controller(network: Arc<ScriptedNetwork>) -> LifecycleController {
        for resource in shell() {
            network.route(&resource, 200, "shell");
        }
        let engine = engine(network, Arc::new(ManualClock::new(Utc::now()))).await;
        LifecycleController::new(Arc::new(engine), shell())
    }

    #[tokio::test]
    async fn test_install_seeds_and_activates() {
        let controller = controller(ScriptedNetwork::new()).await;
        assert!(!controller.is_controlling());

        let state = controller.install().await.unwrap();
        assert_eq!(state, LifecycleState::Active);
        assert!(controller.is_controlling());

        let store = controller.engine.stores().get(StoreRole::Static);
        assert_eq!(controller.engine.db().count_entries(store).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_install_and_activate_twice_is_idempotent() {
        let controller = controller(ScriptedNetwork::new()).await;
        for _ in 0..2 {
            controller.install().await.unwrap();
            controller.activate().await.unwrap();
        }

        let db = controller.engine.db();
        let expected: Vec<String> = controller.engine.stores().current().iter().map(|s| s.to_string()).collect();
        // runtime and image stores do not exist until something is written
        let names = db.list_store_names().await.unwrap();
        assert!(names.iter().all(|n| expected.contains(n)));
        assert_eq!(names.len(), names.iter().collect::<std::collections::HashSet<_>>().len());

        let store = controller.engine.stores().get(StoreRole::Static);
        assert_eq!(db.count_entries(store).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_activation_deletes_obsolete_stores() {
        let controller = controller(ScriptedNetwork::new()).await;
        let db = controller.engine.db();
        db.open_store("test-static-v0").await.unwrap();
        db.open_store("unrelated").await.unwrap();

        controller.install().await.unwrap();

        let names = db.list_store_names().await.unwrap();
        assert_eq!(names, vec!["test-static-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_seed_failure_is_all_or_nothing() {
        let network = ScriptedNetwork::new();
        let controller = controller(network.clone()).await;
        network.route(&url("/manifest.json"), 500, "");

        let result = controller.install().await;
        assert!(matches!(result, Err(Error::SeedFailed(_))));
        assert_eq!(controller.state(), LifecycleState::Redundant);
        assert!(!controller.is_controlling());

        let store = controller.engine.stores().get(StoreRole::Static);
        assert_eq!(controller.engine.db().count_entries(store).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_redundant_rejects_events() {
        let controller = controller(ScriptedNetwork::new()).await;
        controller.install().await.unwrap();
        controller.supersede().await.unwrap();

        assert!(!controller.is_controlling());
        assert!(matches!(controller.activate().await, Err(Error::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_skip_waiting_before_install_is_rejected() {
        let controller = controller(ScriptedNetwork::new()).await;
        assert!(matches!(controller.skip_waiting().await, Err(Error::InvalidTransition { .. })));
        assert_eq!(controller.state(), LifecycleState::Parsed);
    }

    #[tokio::test]
    async fn test_reinstall_failure_keeps_active() {
        let network = ScriptedNetwork::new();
        let controller = controller(network.clone()).await;
        controller.install().await.unwrap();

        network.set_online(false);
        assert!(controller.install().await.is_err());
        assert_eq!(controller.state(), LifecycleState::Active);
        assert!(controller.is_controlling());
    }
}
