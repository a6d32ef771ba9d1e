//! Lifecycle state machine of the interception layer.
//!
//! ```text
//! parsed -> installing -> waiting -> activating -> active
//!               \______________\__________\_________\____> redundant
//! ```
//!
//! [`LifecycleState::apply`] is pure: it maps (state, event) to the next state
//! and the effects the controller must run. Effects may in turn produce
//! follow-up events (seeding finishes with `Installed`, claiming clients
//! finishes with `Activated`).

use serde::{Deserialize, Serialize};

use crate::Error;

/// State of one deployed version of the interception layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Registered, install not started.
    #[default]
    Parsed,
    Installing,
    /// Installed and waiting for the previous version to release control.
    Waiting,
    Activating,
    /// Responsible for live traffic.
    Active,
    /// Failed or superseded. Terminal.
    Redundant,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    Install,
    /// Seeding finished.
    Installed,
    /// Leave `waiting` without waiting for open pages to close.
    SkipWaiting,
    Activate,
    /// Clients claimed.
    Activated,
    /// A step of install or activation failed.
    Failed,
    /// A newer version took over.
    Superseded,
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEffect {
    /// Open the static store and write the shell resources into it.
    SeedStaticStore,
    /// Request the forced skip out of `waiting`.
    SkipWaiting,
    /// Delete every store that is not one of the current names.
    PurgeObsoleteStores,
    /// Take control of every open browsing context.
    ClaimClients,
}

/// Result of applying an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: LifecycleState,
    pub effects: Vec<LifecycleEffect>,
}

impl Transition {
    fn to(next: LifecycleState, effects: &[LifecycleEffect]) -> Self {
        Self { next, effects: effects.to_vec() }
    }
}

impl LifecycleState {
    /// Apply an event, returning the next state and the effects to run.
    ///
    /// Install and activation re-enter cleanly: repeating them re-runs their
    /// effects, which are overwrite-only.
    pub fn apply(self, event: LifecycleEvent) -> Result<Transition, Error> {
        use LifecycleEffect as E;
        use LifecycleEvent as Ev;
        use LifecycleState as S;

        let transition = match (self, event) {
            (S::Redundant, _) => return Err(Error::InvalidTransition { state: self, event }),
            (_, Ev::Superseded) => Transition::to(S::Redundant, &[]),
            (S::Installing | S::Activating, Ev::Failed) => Transition::to(S::Redundant, &[]),

            (S::Parsed | S::Installing | S::Waiting, Ev::Install) => Transition::to(S::Installing, &[E::SeedStaticStore]),
            (S::Installing, Ev::Installed) => Transition::to(S::Waiting, &[E::SkipWaiting]),
            (S::Installing, Ev::SkipWaiting) => Transition::to(S::Installing, &[]),

            (S::Waiting, Ev::SkipWaiting | Ev::Activate) => {
                Transition::to(S::Activating, &[E::PurgeObsoleteStores, E::ClaimClients])
            }
            (S::Activating, Ev::SkipWaiting) => Transition::to(S::Activating, &[]),
            (S::Activating, Ev::Activated) => Transition::to(S::Active, &[]),

            (S::Active, Ev::Install) => Transition::to(S::Active, &[E::SeedStaticStore]),
            (S::Active, Ev::Activate) => Transition::to(S::Active, &[E::PurgeObsoleteStores, E::ClaimClients]),
            (S::Active, Ev::Installed | Ev::SkipWaiting | Ev::Activated) => Transition::to(S::Active, &[]),

            _ => return Err(Error::InvalidTransition { state: self, event }),
        };

        Ok(transition)
    }

    /// Whether requests should be routed through the caching strategies.
    pub fn is_controlling(self) -> bool {
        self == LifecycleState::Active
    }
}
