use chrono::Utc;
use domain_dispatch::{Message, MessageStatus, PgStoreGateway, StoreGateway};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, TransactionTrait};
use test_utils::TestDatabase;

use domain_dispatch::entity::message;

async fn insert_pending(db: &sea_orm::DatabaseConnection, phone: &str, content: &str) -> Message {
    let model = message::ActiveModel {
        id: Default::default(),
        phone_number: Set(phone.to_string()),
        content: Set(content.to_string()),
        status: Set(MessageStatus::Pending),
        message_id: Set(None),
        last_error: Set(None),
        created_at: Set(Utc::now().into()),
        processed_at: Set(None),
        sent_at: Set(None),
    };
    model.insert(db).await.unwrap().into()
}

#[tokio::test]
async fn claim_pending_returns_only_pending_rows() {
    let test_db = TestDatabase::new().await;
    let db = test_db.connection();
    let gateway = PgStoreGateway::new(db.clone());

    insert_pending(&db, "+15550000001", "hi").await;
    insert_pending(&db, "+15550000002", "there").await;

    let tx = db.begin().await.unwrap();
    let claimed = gateway.claim_pending(&tx, 10).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(claimed.len(), 2);
    assert!(claimed.iter().all(|m| m.status == MessageStatus::Pending));
}

#[tokio::test]
async fn claim_pending_respects_the_batch_limit() {
    let test_db = TestDatabase::new().await;
    let db = test_db.connection();
    let gateway = PgStoreGateway::new(db.clone());

    for i in 0..5 {
        insert_pending(&db, &format!("+1555000{:04}", i), "hi").await;
    }

    let tx = db.begin().await.unwrap();
    let claimed = gateway.claim_pending(&tx, 2).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(claimed.len(), 2);
}

#[tokio::test]
async fn mark_processing_then_mark_sent_transitions_status() {
    let test_db = TestDatabase::new().await;
    let db = test_db.connection();
    let gateway = PgStoreGateway::new(db.clone());

    let message = insert_pending(&db, "+15550000003", "hi").await;

    let tx = db.begin().await.unwrap();
    gateway.mark_processing(&tx, message.id, Utc::now()).await.unwrap();
    gateway
        .mark_sent(&tx, message.id, "provider-123", Utc::now())
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let updated = domain_dispatch::entity::MessageEntity::find_by_id(message.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, MessageStatus::Done);
    assert_eq!(updated.message_id.as_deref(), Some("provider-123"));
}

#[tokio::test]
async fn insert_retry_creates_a_retry_row_with_count_one() {
    let test_db = TestDatabase::new().await;
    let db = test_db.connection();
    let gateway = PgStoreGateway::new(db.clone());

    let message = insert_pending(&db, "+15550000004", "hi").await;

    let tx = db.begin().await.unwrap();
    gateway.insert_retry(&tx, &message, "timeout").await.unwrap();
    let retries = gateway.claim_retries(&tx, 10).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(retries.len(), 1);
    assert_eq!(retries[0].retry_count, 1);
    assert_eq!(retries[0].original_message_id, message.id);
}

#[tokio::test]
async fn claim_retries_excludes_rows_at_or_past_the_retry_ceiling() {
    let test_db = TestDatabase::new().await;
    let db = test_db.connection();
    let gateway = PgStoreGateway::new(db.clone());

    let message = insert_pending(&db, "+15550000005", "hi").await;

    let tx = db.begin().await.unwrap();
    gateway.insert_retry(&tx, &message, "timeout").await.unwrap();
    let retries = gateway.claim_retries(&tx, 10).await.unwrap();
    gateway
        .update_retry(&tx, retries[0].id, domain_dispatch::models::MAX_RETRIES, "still failing")
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let tx = db.begin().await.unwrap();
    let remaining = gateway.claim_retries(&tx, 10).await.unwrap();
    tx.commit().await.unwrap();

    assert!(remaining.is_empty());
}

#[tokio::test]
async fn move_to_dead_letter_inserts_a_terminal_row() {
    let test_db = TestDatabase::new().await;
    let db = test_db.connection();
    let gateway = PgStoreGateway::new(db.clone());

    let message = insert_pending(&db, "+15550000006", "hi").await;

    let tx = db.begin().await.unwrap();
    gateway.insert_retry(&tx, &message, "timeout").await.unwrap();
    let retries = gateway.claim_retries(&tx, 10).await.unwrap();
    gateway
        .move_to_dead_letter(&tx, &retries[0], "exhausted")
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let dead_letters = domain_dispatch::entity::MessageDeadLetterEntity::find()
        .all(&db)
        .await
        .unwrap();
    assert_eq!(dead_letters.len(), 1);
    assert_eq!(dead_letters[0].original_message_id, message.id);
}

#[tokio::test]
async fn list_sent_paginates_by_id_after_the_given_cursor() {
    let test_db = TestDatabase::new().await;
    let db = test_db.connection();
    let gateway = PgStoreGateway::new(db.clone());

    let first = insert_pending(&db, "+15550000007", "hi").await;
    let second = insert_pending(&db, "+15550000008", "hi").await;

    let tx = db.begin().await.unwrap();
    gateway.mark_processing(&tx, first.id, Utc::now()).await.unwrap();
    gateway.mark_sent(&tx, first.id, "p1", Utc::now()).await.unwrap();
    gateway.mark_processing(&tx, second.id, Utc::now()).await.unwrap();
    gateway.mark_sent(&tx, second.id, "p2", Utc::now()).await.unwrap();
    tx.commit().await.unwrap();

    let sent = gateway.list_sent(first.id, 10).await.unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, second.id);
}

#[tokio::test]
async fn ping_succeeds_against_a_live_connection() {
    let test_db = TestDatabase::new().await;
    let gateway = PgStoreGateway::new(test_db.connection());
    gateway.ping().await.unwrap();
}
