//! The interception point every outgoing request passes through.

use std::sync::Arc;

use stowaway_core::Error;

use crate::classify::Classifier;
use crate::fetch::FetchRequest;
use crate::lifecycle::LifecycleController;
use crate::strategy::{Served, StrategyEngine};

pub struct Interceptor {
    classifier: Classifier,
    engine: Arc<StrategyEngine>,
    lifecycle: Arc<LifecycleController>,
}

impl Interceptor {
    pub fn new(classifier: Classifier, engine: Arc<StrategyEngine>, lifecycle: Arc<LifecycleController>) -> Self {
        Self { classifier, engine, lifecycle }
    }

    /// Handle one request.
    ///
    /// Requests go straight to the network, with no store access, while the
    /// layer is not controlling or when the request is not a `GET`.
    pub async fn handle(&self, request: FetchRequest) -> Result<Served, Error> {
        if !self.lifecycle.is_controlling() {
            tracing::debug!(url = %request.url, state = ?self.lifecycle.state(), "not controlling; passthrough");
            return self.engine.passthrough(&request).await;
        }

        match self.classifier.classify(&request) {
            Some(class) => self.engine.execute(class, &request).await,
            None => {
                tracing::debug!(method = %request.method, url = %request.url, "non-GET bypass");
                self.engine.passthrough(&request).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::strategy::ResponseSource;
    use crate::test_support::{ScriptedNetwork, engine, url};
    use chrono::Utc;
    use reqwest::Method;
    use stowaway_core::StoreRole;

    async fn setup(network: Arc<ScriptedNetwork>) -> (Interceptor, Arc<StrategyEngine>, Arc<LifecycleController>) {
        network.route(&url("/index.html"), 200, "<html></html>");
        let engine = Arc::new(engine(network, Arc::new(ManualClock::new(Utc::now()))).await);
        let lifecycle = Arc::new(LifecycleController::new(engine.clone(), vec![url("/index.html")]));
        let interceptor = Interceptor::new(Classifier::new(vec!["/rest/v1/".into()]), engine.clone(), lifecycle.clone());
        (interceptor, engine, lifecycle)
    }

    #[tokio::test]
    async fn test_passthrough_before_activation() {
        let network = ScriptedNetwork::new();
        network.route(&url("/app.js"), 200, "js");
        let (interceptor, engine, _) = setup(network).await;

        let served = interceptor.handle(FetchRequest::get(url("/app.js"))).await.unwrap();
        assert_eq!(served.source, ResponseSource::Bypass);

        engine.flush().await;
        assert!(engine.db().list_store_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_routes_through_strategies_when_active() {
        let network = ScriptedNetwork::new();
        network.route(&url("/app.js"), 200, "js");
        let (interceptor, engine, lifecycle) = setup(network.clone()).await;
        lifecycle.install().await.unwrap();

        interceptor.handle(FetchRequest::get(url("/app.js"))).await.unwrap();
        engine.flush().await;
        let served = interceptor.handle(FetchRequest::get(url("/app.js"))).await.unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_non_get_bypasses_even_when_active() {
        let network = ScriptedNetwork::new();
        let items = url("/rest/v1/items");
        network.route(&items, 201, "{}");
        let (interceptor, engine, lifecycle) = setup(network).await;
        lifecycle.install().await.unwrap();

        let served = interceptor.handle(FetchRequest::new(Method::POST, items).with_body("{}")).await.unwrap();
        assert_eq!(served.source, ResponseSource::Bypass);
        assert_eq!(served.response.status.as_u16(), 201);

        engine.flush().await;
        let runtime = engine.stores().get(StoreRole::Runtime);
        assert_eq!(engine.db().count_entries(runtime).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_non_get_failure_has_no_fallback() {
        let network = ScriptedNetwork::new();
        let (interceptor, _, lifecycle) = setup(network.clone()).await;
        lifecycle.install().await.unwrap();

        network.set_online(false);
        let result = interceptor.handle(FetchRequest::new(Method::DELETE, url("/index.html"))).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}
