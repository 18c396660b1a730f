use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseTransaction;

use crate::error::DispatchResult;
use crate::models::{Message, MessageRetry};

/// Store-side persistence operations. All mutating operations take an
/// ambient transaction handle so the caller controls commit/rollback
/// boundaries around a full claim-process-settle cycle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreGateway: Send + Sync {
    async fn claim_pending(&self, tx: &DatabaseTransaction, limit: u64) -> DispatchResult<Vec<Message>>;

    async fn mark_processing(
        &self,
        tx: &DatabaseTransaction,
        message_id: i32,
        at: DateTime<Utc>,
    ) -> DispatchResult<()>;

    async fn mark_sent(
        &self,
        tx: &DatabaseTransaction,
        message_id: i32,
        provider_message_id: &str,
        at: DateTime<Utc>,
    ) -> DispatchResult<()>;

    async fn mark_error(&self, tx: &DatabaseTransaction, message_id: i32, err: &str) -> DispatchResult<()>;

    async fn insert_retry(&self, tx: &DatabaseTransaction, message: &Message, err: &str) -> DispatchResult<()>;

    async fn claim_retries(&self, tx: &DatabaseTransaction, limit: u64) -> DispatchResult<Vec<MessageRetry>>;

    async fn update_retry(
        &self,
        tx: &DatabaseTransaction,
        retry_id: i32,
        retry_count: i32,
        err: &str,
    ) -> DispatchResult<()>;

    async fn move_to_dead_letter(
        &self,
        tx: &DatabaseTransaction,
        retry: &MessageRetry,
        err: &str,
    ) -> DispatchResult<()>;

    async fn list_sent(&self, after_id: i32, limit: u64) -> DispatchResult<Vec<Message>>;

    async fn ping(&self) -> DispatchResult<()>;
}
