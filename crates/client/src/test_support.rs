//! Scripted network and engine builders shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use stowaway_core::{CacheDb, Error, StoreNames};

use crate::clock::ManualClock;
use crate::fetch::{FetchRequest, FetchResponse, Network};
use crate::strategy::{CachePolicy, StrategyEngine};

pub(crate) const ORIGIN: &str = "https://app.test";

pub(crate) fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

#[derive(Clone)]
struct Scripted {
    status: StatusCode,
    body: Bytes,
    headers: HeaderMap,
}

/// In-memory network: per-URL canned responses, an online switch and a
/// call counter. Unknown URLs answer 404.
#[derive(Default)]
pub(crate) struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Scripted>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn route(&self, url: &Url, status: u16, body: &'static str) {
        self.route_with_headers(url, status, body, HeaderMap::new());
    }

    /// Route whose response carries a `date` header.
    pub(crate) fn route_dated(&self, url: &Url, body: &'static str, date: DateTime<Utc>) {
        let mut headers = HeaderMap::new();
        let value = date.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        headers.insert("date", HeaderValue::from_str(&value).unwrap());
        self.route_with_headers(url, 200, body, headers);
    }

    pub(crate) fn route_with_headers(&self, url: &Url, status: u16, body: &'static str, headers: HeaderMap) {
        let scripted = Scripted { status: StatusCode::from_u16(status).unwrap(), body: Bytes::from_static(body.as_bytes()), headers };
        self.routes.lock().unwrap().insert(url.to_string(), scripted);
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }

        let scripted = self.routes.lock().unwrap().get(request.url.as_str()).cloned().unwrap_or(Scripted {
            status: StatusCode::NOT_FOUND,
            body: Bytes::new(),
            headers: HeaderMap::new(),
        });

        Ok(FetchResponse {
            url: request.url.clone(),
            status: scripted.status,
            status_text: scripted.status.canonical_reason().unwrap_or_default().to_string(),
            headers: scripted.headers,
            bytes: scripted.body,
            fetch_ms: 1,
        })
    }
}

pub(crate) fn policy() -> CachePolicy {
    CachePolicy {
        api_max_age: chrono::Duration::minutes(5),
        image_max_age: chrono::Duration::days(7),
        root_document: url("/index.html"),
    }
}

pub(crate) async fn engine(network: Arc<ScriptedNetwork>, clock: Arc<ManualClock>) -> StrategyEngine {
    let db = CacheDb::open_in_memory().await.unwrap();
    StrategyEngine::new(db, StoreNames::new("test", "v1"), policy(), network, clock)
}
