//! Network-first with a time-bounded fallback.
//!
//! Successful `GET` responses are stored with a `sw-cache-date` capture
//! timestamp. When the network fails, an entry younger than the window is
//! served with `x-offline-response: true`; anything older is not served and
//! the original failure propagates.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use reqwest::header::{HeaderName, HeaderValue};
use stowaway_core::{Error, StoreRole, StoredResponse};

use super::{CACHE_DATE_HEADER, OFFLINE_HEADER, ResponseSource, Served, StrategyEngine, is_fresh};
use crate::fetch::FetchRequest;

fn cache_date(entry: &StoredResponse) -> Option<DateTime<Utc>> {
    let raw = entry.header(CACHE_DATE_HEADER)?;
    DateTime::parse_from_rfc3339(raw).ok().map(|d| d.with_timezone(&Utc))
}

fn stamp(entry: &mut StoredResponse, at: DateTime<Utc>) {
    entry.headers.retain(|(name, _)| !name.eq_ignore_ascii_case(CACHE_DATE_HEADER));
    entry
        .headers
        .push((CACHE_DATE_HEADER.to_string(), at.to_rfc3339_opts(SecondsFormat::Millis, true)));
}

impl StrategyEngine {
    pub(crate) async fn api(&self, request: &FetchRequest) -> Result<Served, Error> {
        let err = match self.network.fetch(request).await {
            Ok(response) => {
                let storable = response.ok() && request.method == Method::GET;
                if let Some(mut stored) = storable.then(|| self.storable(request, &response)).flatten() {
                    let at = stored.stored_at;
                    stamp(&mut stored, at);
                    self.store_in_background(StoreRole::Runtime, stored).await;
                }
                return Ok(Served::new(response, ResponseSource::Network));
            }
            Err(err) => err,
        };

        let Some(entry) = self.lookup(StoreRole::Runtime, request).await else {
            return Err(err);
        };

        let Some(captured) = cache_date(&entry) else {
            tracing::debug!(url = %request.url, "api entry has no usable capture time");
            return Err(err);
        };

        if !is_fresh(captured, self.now(), self.policy.api_max_age) {
            tracing::debug!(url = %request.url, %captured, "api entry past its window");
            return Err(err);
        }

        let Some(mut response) = self.rebuild(entry) else {
            return Err(err);
        };
        response
            .headers
            .insert(HeaderName::from_static(OFFLINE_HEADER), HeaderValue::from_static("true"));

        tracing::debug!(url = %request.url, error = %err, "serving api fallback");
        Ok(Served::new(response, ResponseSource::OfflineFallback))
    }
}
