use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, LockBehavior, LockType, QueryFilter, QueryOrder, QuerySelect,
    Statement,
};

use database::BaseRepository;

use crate::entity::{message, message_dead_letter, message_retry, MessageEntity, MessageRetryEntity};
use crate::error::{DispatchError, DispatchResult};
use crate::models::{Message, MessageRetry, MessageStatus, MAX_RETRIES};
use crate::repository::StoreGateway;

/// Postgres-backed implementation of [`StoreGateway`]. Claims use
/// `SELECT ... FOR UPDATE SKIP LOCKED` so concurrent replicas observe
/// disjoint rows; every mutation is driven through the caller's
/// transaction, never through `self.db` directly.
pub struct PgStoreGateway {
    db: DatabaseConnection,
    messages: BaseRepository<MessageEntity>,
}

impl PgStoreGateway {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            messages: BaseRepository::new(db.clone()),
            db,
        }
    }
}

#[async_trait]
impl StoreGateway for PgStoreGateway {
    async fn claim_pending(&self, tx: &DatabaseTransaction, limit: u64) -> DispatchResult<Vec<Message>> {
        let rows = MessageEntity::find()
            .filter(message::Column::Status.eq(MessageStatus::Pending))
            .limit(limit)
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .all(tx)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_processing(
        &self,
        tx: &DatabaseTransaction,
        message_id: i32,
        at: DateTime<Utc>,
    ) -> DispatchResult<()> {
        let mut model: message::ActiveModel = MessageEntity::find_by_id(message_id)
            .one(tx)
            .await?
            .ok_or(DispatchError::NotFound(message_id))?
            .into();
        model.status = Set(MessageStatus::Processing);
        model.processed_at = Set(Some(at.into()));
        model.update(tx).await?;
        Ok(())
    }

    async fn mark_sent(
        &self,
        tx: &DatabaseTransaction,
        message_id: i32,
        provider_message_id: &str,
        at: DateTime<Utc>,
    ) -> DispatchResult<()> {
        let mut model: message::ActiveModel = MessageEntity::find_by_id(message_id)
            .one(tx)
            .await?
            .ok_or(DispatchError::NotFound(message_id))?
            .into();
        model.status = Set(MessageStatus::Done);
        model.sent_at = Set(Some(at.into()));
        model.message_id = Set(Some(provider_message_id.to_string()));
        model.update(tx).await?;
        Ok(())
    }

    async fn mark_error(&self, tx: &DatabaseTransaction, message_id: i32, err: &str) -> DispatchResult<()> {
        let mut model: message::ActiveModel = MessageEntity::find_by_id(message_id)
            .one(tx)
            .await?
            .ok_or(DispatchError::NotFound(message_id))?
            .into();
        model.status = Set(MessageStatus::Error);
        model.last_error = Set(Some(err.to_string()));
        model.update(tx).await?;
        Ok(())
    }

    async fn insert_retry(&self, tx: &DatabaseTransaction, message: &Message, err: &str) -> DispatchResult<()> {
        let retry = message_retry::ActiveModel {
            id: Default::default(),
            original_message_id: Set(message.id),
            phone_number: Set(message.phone_number.clone()),
            content: Set(message.content.clone()),
            retry_count: Set(1),
            last_error: Set(Some(err.to_string())),
            created_at: Set(Utc::now().into()),
        };
        retry.insert(tx).await?;
        Ok(())
    }

    async fn claim_retries(&self, tx: &DatabaseTransaction, limit: u64) -> DispatchResult<Vec<MessageRetry>> {
        let rows = MessageRetryEntity::find()
            .filter(message_retry::Column::RetryCount.lt(MAX_RETRIES))
            .limit(limit)
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .all(tx)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_retry(
        &self,
        tx: &DatabaseTransaction,
        retry_id: i32,
        retry_count: i32,
        err: &str,
    ) -> DispatchResult<()> {
        let mut model: message_retry::ActiveModel = MessageRetryEntity::find_by_id(retry_id)
            .one(tx)
            .await?
            .ok_or(DispatchError::NotFound(retry_id))?
            .into();
        model.retry_count = Set(retry_count);
        model.last_error = Set(Some(err.to_string()));
        model.update(tx).await?;
        Ok(())
    }

    async fn move_to_dead_letter(
        &self,
        tx: &DatabaseTransaction,
        retry: &MessageRetry,
        err: &str,
    ) -> DispatchResult<()> {
        let dead_letter = message_dead_letter::ActiveModel {
            id: Default::default(),
            original_message_id: Set(retry.original_message_id),
            phone_number: Set(retry.phone_number.clone()),
            content: Set(retry.content.clone()),
            last_error: Set(Some(err.to_string())),
            failed_at: Set(Utc::now().into()),
        };
        dead_letter.insert(tx).await?;
        Ok(())
    }

    async fn list_sent(&self, after_id: i32, limit: u64) -> DispatchResult<Vec<Message>> {
        let rows = MessageEntity::find()
            .filter(message::Column::Status.eq(MessageStatus::Done))
            .filter(message::Column::Id.gt(after_id))
            .order_by_asc(message::Column::Id)
            .limit(limit)
            .all(self.messages.db())
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn ping(&self) -> DispatchResult<()> {
        self.db
            .execute(Statement::from_string(
                self.db.get_database_backend(),
                "SELECT 1",
            ))
            .await?;
        Ok(())
    }
}
