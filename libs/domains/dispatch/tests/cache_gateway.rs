use database::redis::connect;
use domain_dispatch::{CacheGateway, RedisCacheGateway};
use redis::Client;
use test_utils::TestRedis;

async fn gateway(redis: &TestRedis) -> RedisCacheGateway {
    let manager = connect(redis.connection_string()).await.unwrap();
    let client = Client::open(redis.connection_string()).unwrap();
    RedisCacheGateway::new(manager, client)
}

#[tokio::test]
async fn set_if_absent_is_atomic_test_and_set() {
    let redis = TestRedis::new().await;
    let cache = gateway(&redis).await;

    let first = cache.set_if_absent("message:1:lock", "t0", 60).await.unwrap();
    let second = cache.set_if_absent("message:1:lock", "t1", 60).await.unwrap();

    assert!(first);
    assert!(!second);
}

#[tokio::test]
async fn exists_reflects_a_previously_set_key() {
    let redis = TestRedis::new().await;
    let cache = gateway(&redis).await;

    assert!(!cache.exists("message:2").await.unwrap());
    cache.set("message:2", "now", 60).await.unwrap();
    assert!(cache.exists("message:2").await.unwrap());
}

#[tokio::test]
async fn publish_does_not_error_without_subscribers() {
    let redis = TestRedis::new().await;
    let cache = gateway(&redis).await;

    cache.publish("scheduler:commands", "start").await.unwrap();
}

#[tokio::test]
async fn ping_succeeds_against_a_live_connection() {
    let redis = TestRedis::new().await;
    let cache = gateway(&redis).await;

    cache.ping().await.unwrap();
}

#[tokio::test]
async fn command_bus_roundtrips_a_published_payload() {
    use futures::StreamExt;

    let redis = TestRedis::new().await;
    let cache = gateway(&redis).await;

    let mut stream = cache.subscribe("scheduler:commands").await.unwrap();
    // Give the subscription a moment to register before publishing.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    cache.publish("scheduler:commands", "stop").await.unwrap();

    let payload = tokio::time::timeout(std::time::Duration::from_secs(5), stream.next())
        .await
        .expect("timed out waiting for the published command")
        .expect("stream ended unexpectedly")
        .expect("payload should decode");

    assert_eq!(payload, "stop");
}
