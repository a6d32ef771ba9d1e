//! Network-first; offline falls back to the exact entry, then the root document.

use stowaway_core::{Error, StoreRole};

use super::{ResponseSource, Served, StrategyEngine};
use crate::fetch::FetchRequest;

impl StrategyEngine {
    pub(crate) async fn navigation(&self, request: &FetchRequest) -> Result<Served, Error> {
        let err = match self.network.fetch(request).await {
            Ok(response) => {
                if let Some(stored) = response.ok().then(|| self.storable(request, &response)).flatten() {
                    self.store_in_background(StoreRole::Static, stored).await;
                }
                return Ok(Served::new(response, ResponseSource::Network));
            }
            Err(err) => err,
        };

        if let Some(response) = self.lookup(StoreRole::Static, request).await.and_then(|e| self.rebuild(e)) {
            return Ok(Served::new(response, ResponseSource::StaleCache));
        }

        let root = FetchRequest::get(self.policy.root_document.clone());
        match self.lookup(StoreRole::Static, &root).await.and_then(|e| self.rebuild(e)) {
            Some(response) => {
                tracing::debug!(url = %request.url, root = %root.url, error = %err, "serving root document");
                Ok(Served::new(response, ResponseSource::RootFallback))
            }
            None => Err(err),
        }
    }
}
