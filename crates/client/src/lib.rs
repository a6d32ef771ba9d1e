//! Interception and caching engine for stowaway.
//!
//! This crate provides the network seam and reqwest client, request
//! classification, the per-class caching strategies, the lifecycle controller
//! and the control channel, bundled together by [`OfflineWorker`].

pub mod classify;
pub mod clock;
pub mod control;
pub mod fetch;
pub mod interceptor;
pub mod lifecycle;
pub mod strategy;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;

pub use classify::{Classifier, RequestClass};
pub use clock::{Clock, ManualClock, SystemClock};
pub use control::{ControlChannel, NoopSync, SyncHook};
pub use fetch::{FetchClient, FetchConfig, FetchRequest, FetchResponse, Network, RequestMode};
pub use interceptor::Interceptor;
pub use lifecycle::LifecycleController;
pub use strategy::{BackgroundWrites, CachePolicy, ResponseSource, Served, StrategyEngine};
pub use worker::OfflineWorker;
