use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use observability::DispatchMetrics;
use sea_orm::{DatabaseConnection, TransactionTrait};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::CacheGateway;
use crate::error::DispatchResult;
use crate::models::{Message, WebhookPayload};
use crate::repository::StoreGateway;
use crate::webhook::WebhookClient;

const PIPELINE: &str = "delivery";
const LOCK_TTL_SECS: u64 = 60;
const MARKER_TTL_SECS: u64 = 60 * 60;

/// Delivery worker pool (C3): one drain pass claims a batch of pending
/// messages under a single transaction and races them through the webhook
/// concurrently, bounded by `max_concurrent`.
pub struct DeliveryService {
    db: DatabaseConnection,
    store: Arc<dyn StoreGateway>,
    cache: Arc<dyn CacheGateway>,
    webhook: Arc<dyn WebhookClient>,
    batch_size: u64,
    max_concurrent: usize,
}

impl DeliveryService {
    pub fn new(
        db: DatabaseConnection,
        store: Arc<dyn StoreGateway>,
        cache: Arc<dyn CacheGateway>,
        webhook: Arc<dyn WebhookClient>,
        batch_size: u64,
        max_concurrent: usize,
    ) -> Self {
        Self {
            db,
            store,
            cache,
            webhook,
            batch_size,
            max_concurrent,
        }
    }

    /// Runs one drain pass. Invoked on every scheduler tick.
    pub async fn drain(&self) {
        let started = Instant::now();
        if let Err(e) = self.try_drain().await {
            warn!(error = %e, "delivery drain failed");
        }
        DispatchMetrics::record_drain_duration(PIPELINE, started.elapsed().as_secs_f64());
    }

    async fn try_drain(&self) -> DispatchResult<()> {
        let tx = self.db.begin().await?;
        let batch = self.store.claim_pending(&tx, self.batch_size).await?;
        if batch.is_empty() {
            tx.rollback().await?;
            return Ok(());
        }
        DispatchMetrics::record_claimed(PIPELINE, batch.len());

        let mutation_lock = Mutex::new(());
        let tx_ref = &tx;
        let lock_ref = &mutation_lock;

        stream::iter(batch)
            .for_each_concurrent(self.max_concurrent, |message| async move {
                if let Err(e) = self.process_message(tx_ref, lock_ref, message).await {
                    warn!(error = %e, "delivery pipeline step failed");
                }
            })
            .await;

        tx.commit().await?;
        Ok(())
    }

    async fn process_message(
        &self,
        tx: &sea_orm::DatabaseTransaction,
        mutation_lock: &Mutex<()>,
        message: Message,
    ) -> DispatchResult<()> {
        let lock_key = format!("message:{}:lock", message.id);
        let marker_key = format!("message:{}", message.id);

        let acquired = self
            .cache
            .set_if_absent(&lock_key, &Utc::now().to_rfc3339(), LOCK_TTL_SECS)
            .await?;
        if !acquired {
            debug!(message_id = message.id, "skipped, locked by a peer replica");
            return Ok(());
        }

        if self.cache.exists(&marker_key).await? {
            debug!(message_id = message.id, "skipped, already has a processed marker");
            return Ok(());
        }

        {
            let _guard = mutation_lock.lock().await;
            self.store.mark_processing(tx, message.id, Utc::now()).await?;
        }

        let payload = WebhookPayload {
            message: message.content.clone(),
            to: message.phone_number.clone(),
        };
        let body = match serde_json::to_string(&payload) {
            Ok(body) => body,
            Err(e) => {
                let _guard = mutation_lock.lock().await;
                self.store.mark_error(tx, message.id, &e.to_string()).await?;
                warn!(message_id = message.id, error = %e, "encoding failed, marked as error");
                return Ok(());
            }
        };

        let webhook_started = Instant::now();
        let outcome = self.webhook.send(&body).await;
        DispatchMetrics::record_webhook_duration(webhook_started.elapsed().as_secs_f64());

        match outcome {
            Ok(provider_message_id) => {
                {
                    let _guard = mutation_lock.lock().await;
                    self.store
                        .mark_sent(tx, message.id, &provider_message_id, Utc::now())
                        .await?;
                }
                DispatchMetrics::record_delivered(PIPELINE);
                if let Err(e) = self.cache.set(&marker_key, &Utc::now().to_rfc3339(), MARKER_TTL_SECS).await {
                    warn!(message_id = message.id, error = %e, "failed to write processed marker");
                }
            }
            Err(e) => {
                let _guard = mutation_lock.lock().await;
                self.store.insert_retry(tx, &message, &e.to_string()).await?;
                DispatchMetrics::record_retried(PIPELINE);
                info!(message_id = message.id, error = %e, "delivery failed, queued for retry");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MockCacheGateway;
    use crate::error::DispatchError;
    use crate::models::MessageStatus;
    use crate::repository::MockStoreGateway;
    use crate::webhook::MockWebhookClient;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_message() -> Message {
        Message {
            id: 1,
            phone_number: "+15551234567".to_string(),
            content: "hello".to_string(),
            status: MessageStatus::Pending,
            message_id: None,
            last_error: None,
            created_at: Utc::now(),
            processed_at: None,
            sent_at: None,
        }
    }

    async fn mock_tx() -> sea_orm::DatabaseTransaction {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        db.begin().await.unwrap()
    }

    #[tokio::test]
    async fn skips_message_when_cache_lock_is_held_by_a_peer() {
        let mut cache = MockCacheGateway::new();
        cache.expect_set_if_absent().returning(|_, _, _| Ok(false));
        let store = MockStoreGateway::new();
        let webhook = MockWebhookClient::new();

        let service = DeliveryService::new(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            Arc::new(store),
            Arc::new(cache),
            Arc::new(webhook),
            10,
            4,
        );

        let tx = mock_tx().await;
        let lock = Mutex::new(());
        service
            .process_message(&tx, &lock, test_message())
            .await
            .expect("peer-locked message is a no-op, not an error");
    }

    #[tokio::test]
    async fn skips_message_with_an_existing_processed_marker() {
        let mut cache = MockCacheGateway::new();
        cache.expect_set_if_absent().returning(|_, _, _| Ok(true));
        cache.expect_exists().returning(|_| Ok(true));
        let store = MockStoreGateway::new();
        let webhook = MockWebhookClient::new();

        let service = DeliveryService::new(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            Arc::new(store),
            Arc::new(cache),
            Arc::new(webhook),
            10,
            4,
        );

        let tx = mock_tx().await;
        let lock = Mutex::new(());
        service
            .process_message(&tx, &lock, test_message())
            .await
            .expect("duplicate marker is a no-op, not an error");
    }

    #[tokio::test]
    async fn successful_delivery_marks_sent_and_writes_marker() {
        let mut cache = MockCacheGateway::new();
        cache.expect_set_if_absent().returning(|_, _, _| Ok(true));
        cache.expect_exists().returning(|_| Ok(false));
        cache.expect_set().returning(|_, _, _| Ok(()));

        let mut store = MockStoreGateway::new();
        store.expect_mark_processing().returning(|_, _, _| Ok(()));
        store.expect_mark_sent().returning(|_, _, _, _| Ok(()));

        let mut webhook = MockWebhookClient::new();
        webhook.expect_send().returning(|_| Ok("provider-1".to_string()));

        let service = DeliveryService::new(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            Arc::new(store),
            Arc::new(cache),
            Arc::new(webhook),
            10,
            4,
        );

        let tx = mock_tx().await;
        let lock = Mutex::new(());
        service.process_message(&tx, &lock, test_message()).await.unwrap();
    }

    #[tokio::test]
    async fn failed_webhook_call_queues_a_retry() {
        let mut cache = MockCacheGateway::new();
        cache.expect_set_if_absent().returning(|_, _, _| Ok(true));
        cache.expect_exists().returning(|_| Ok(false));

        let mut store = MockStoreGateway::new();
        store.expect_mark_processing().returning(|_, _, _| Ok(()));
        store.expect_insert_retry().returning(|_, _, _| Ok(()));

        let mut webhook = MockWebhookClient::new();
        webhook
            .expect_send()
            .returning(|_| Err(DispatchError::Config("unreachable".into())));

        let service = DeliveryService::new(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            Arc::new(store),
            Arc::new(cache),
            Arc::new(webhook),
            10,
            4,
        );

        let tx = mock_tx().await;
        let lock = Mutex::new(());
        service.process_message(&tx, &lock, test_message()).await.unwrap();
    }
}
