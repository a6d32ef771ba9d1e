//! Cache-first with expiry, any-age fallback when offline.

use chrono::{DateTime, Utc};
use stowaway_core::{Error, StoreRole, StoredResponse};

use super::{ResponseSource, Served, StrategyEngine, is_fresh};
use crate::fetch::FetchRequest;

/// Capture time of an image entry: its `date` header, else when it was stored.
fn captured_at(entry: &StoredResponse) -> DateTime<Utc> {
    entry
        .header("date")
        .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(entry.stored_at)
}

impl StrategyEngine {
    pub(crate) async fn image(&self, request: &FetchRequest) -> Result<Served, Error> {
        let cached = self.lookup(StoreRole::Image, request).await.and_then(|entry| {
            let captured = captured_at(&entry);
            self.rebuild(entry).map(|response| (response, captured))
        });

        let fallback = match cached {
            Some((response, captured)) if is_fresh(captured, self.now(), self.policy.image_max_age) => {
                return Ok(Served::new(response, ResponseSource::Cache));
            }
            other => other.map(|(response, _)| response),
        };

        match self.network.fetch(request).await {
            Ok(response) => {
                if let Some(stored) = response.ok().then(|| self.storable(request, &response)).flatten() {
                    self.store_in_background(StoreRole::Image, stored).await;
                }
                Ok(Served::new(response, ResponseSource::Network))
            }
            Err(err) => match fallback {
                Some(response) => {
                    tracing::debug!(url = %request.url, error = %err, "serving expired image");
                    Ok(Served::new(response, ResponseSource::StaleCache))
                }
                None => Err(err),
            },
        }
    }
}
