//! Cache-first, populate on miss. Static entries never expire.

use stowaway_core::{Error, StoreRole};

use super::{ResponseSource, Served, StrategyEngine};
use crate::fetch::FetchRequest;

impl StrategyEngine {
    pub(crate) async fn static_asset(&self, request: &FetchRequest) -> Result<Served, Error> {
        if let Some(response) = self.lookup(StoreRole::Static, request).await.and_then(|e| self.rebuild(e)) {
            return Ok(Served::new(response, ResponseSource::Cache));
        }

        let response = self.network.fetch(request).await?;
        if let Some(stored) = response.ok().then(|| self.storable(request, &response)).flatten() {
            self.store_in_background(StoreRole::Static, stored).await;
        }
        Ok(Served::new(response, ResponseSource::Network))
    }
}
