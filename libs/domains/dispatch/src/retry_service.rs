use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use observability::DispatchMetrics;
use sea_orm::{DatabaseConnection, TransactionTrait};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::backoff::delay_for_attempt;
use crate::error::DispatchResult;
use crate::models::{MessageRetry, WebhookPayload, MAX_RETRIES};
use crate::repository::StoreGateway;
use crate::webhook::WebhookClient;

const PIPELINE: &str = "retry";

/// Retry engine (C4): re-drives messages that failed delivery, graduating
/// exhausted rows to the dead-letter table.
pub struct RetryService {
    db: DatabaseConnection,
    store: Arc<dyn StoreGateway>,
    webhook: Arc<dyn WebhookClient>,
    batch_size: u64,
    max_concurrent: usize,
}

impl RetryService {
    pub fn new(
        db: DatabaseConnection,
        store: Arc<dyn StoreGateway>,
        webhook: Arc<dyn WebhookClient>,
        batch_size: u64,
        max_concurrent: usize,
    ) -> Self {
        Self {
            db,
            store,
            webhook,
            batch_size,
            max_concurrent,
        }
    }

    pub async fn drain(&self) {
        let started = Instant::now();
        if let Err(e) = self.try_drain().await {
            warn!(error = %e, "retry drain failed");
        }
        DispatchMetrics::record_drain_duration(PIPELINE, started.elapsed().as_secs_f64());
    }

    async fn try_drain(&self) -> DispatchResult<()> {
        let tx = self.db.begin().await?;
        let batch = self.store.claim_retries(&tx, self.batch_size).await?;
        if batch.is_empty() {
            tx.rollback().await?;
            return Ok(());
        }
        DispatchMetrics::record_claimed(PIPELINE, batch.len());

        let mutation_lock = Mutex::new(());
        let tx_ref = &tx;
        let lock_ref = &mutation_lock;

        stream::iter(batch)
            .for_each_concurrent(self.max_concurrent, |retry| async move {
                if let Err(e) = self.process_retry(tx_ref, lock_ref, retry).await {
                    warn!(error = %e, "retry pipeline step failed");
                }
            })
            .await;

        tx.commit().await?;
        Ok(())
    }

    async fn process_retry(
        &self,
        tx: &sea_orm::DatabaseTransaction,
        mutation_lock: &Mutex<()>,
        retry: MessageRetry,
    ) -> DispatchResult<()> {
        let new_count = retry.retry_count + 1;
        if new_count > MAX_RETRIES {
            let _guard = mutation_lock.lock().await;
            self.store
                .move_to_dead_letter(tx, &retry, retry.last_error.as_deref().unwrap_or(""))
                .await?;
            DispatchMetrics::record_dead_lettered();
            info!(original_message_id = retry.original_message_id, "retries exhausted, dead-lettered");
            return Ok(());
        }

        let delay = delay_for_attempt(retry.retry_count as u32);
        tokio::time::sleep(delay).await;

        let payload = WebhookPayload {
            message: retry.content.clone(),
            to: retry.phone_number.clone(),
        };
        let body = serde_json::to_string(&payload)?;

        let webhook_started = Instant::now();
        let outcome = self.webhook.send(&body).await;
        DispatchMetrics::record_webhook_duration(webhook_started.elapsed().as_secs_f64());

        match outcome {
            Ok(provider_message_id) => {
                let _guard = mutation_lock.lock().await;
                self.store
                    .mark_sent(tx, retry.original_message_id, &provider_message_id, Utc::now())
                    .await?;
                DispatchMetrics::record_delivered(PIPELINE);
            }
            Err(e) => {
                let _guard = mutation_lock.lock().await;
                self.store.update_retry(tx, retry.id, new_count, &e.to_string()).await?;
                DispatchMetrics::record_retried(PIPELINE);
                info!(original_message_id = retry.original_message_id, error = %e, "retry attempt failed");
            }
        }

        Ok(())
    }
}
