use std::sync::Arc;

use crate::cache::CacheGateway;
use crate::repository::StoreGateway;

/// Readiness probe (C8): ready iff both the store and cache gateways answer
/// a ping. Liveness is unconditional and lives at the HTTP layer.
pub struct ReadinessProbe {
    store: Arc<dyn StoreGateway>,
    cache: Arc<dyn CacheGateway>,
}

impl ReadinessProbe {
    pub fn new(store: Arc<dyn StoreGateway>, cache: Arc<dyn CacheGateway>) -> Self {
        Self { store, cache }
    }

    pub async fn is_ready(&self) -> bool {
        self.store.ping().await.is_ok() && self.cache.ping().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MockCacheGateway;
    use crate::repository::MockStoreGateway;

    #[tokio::test]
    async fn ready_when_both_gateways_answer() {
        let mut store = MockStoreGateway::new();
        store.expect_ping().returning(|| Ok(()));
        let mut cache = MockCacheGateway::new();
        cache.expect_ping().returning(|| Ok(()));

        let probe = ReadinessProbe::new(Arc::new(store), Arc::new(cache));
        assert!(probe.is_ready().await);
    }

    #[tokio::test]
    async fn not_ready_when_store_fails() {
        let mut store = MockStoreGateway::new();
        store
            .expect_ping()
            .returning(|| Err(crate::error::DispatchError::Config("down".into())));
        let mut cache = MockCacheGateway::new();
        cache.expect_ping().returning(|| Ok(()));

        let probe = ReadinessProbe::new(Arc::new(store), Arc::new(cache));
        assert!(!probe.is_ready().await);
    }

    #[tokio::test]
    async fn not_ready_when_cache_fails() {
        let mut store = MockStoreGateway::new();
        store.expect_ping().returning(|| Ok(()));
        let mut cache = MockCacheGateway::new();
        cache
            .expect_ping()
            .returning(|| Err(crate::error::DispatchError::Config("down".into())));

        let probe = ReadinessProbe::new(Arc::new(store), Arc::new(cache));
        assert!(!probe.is_ready().await);
    }
}
