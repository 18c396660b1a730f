use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tokio_stream::{Stream, StreamExt};

use scheduler::CommandSource;

use crate::error::{DispatchError, DispatchResult};

pub type MessageStream = Pin<Box<dyn Stream<Item = DispatchResult<String>> + Send>>;

/// Cache/pub-sub capability set. Payloads are opaque; this gateway never
/// interprets them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheGateway: Send + Sync {
    async fn exists(&self, key: &str) -> DispatchResult<bool>;
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> DispatchResult<()>;
    async fn set_if_absent(&self, key: &str, value: &str, ttl_seconds: u64) -> DispatchResult<bool>;
    async fn publish(&self, channel: &str, payload: &str) -> DispatchResult<()>;
    async fn ping(&self) -> DispatchResult<()>;
}

#[derive(Clone)]
pub struct RedisCacheGateway {
    manager: ConnectionManager,
    client: Client,
}

impl RedisCacheGateway {
    pub fn new(manager: ConnectionManager, client: Client) -> Self {
        Self { manager, client }
    }

    /// A fresh pub/sub subscription to `channel`. Kept separate from
    /// [`CacheGateway`] because `async_trait` objects cannot return a
    /// borrowed stream; callers that need the command bus use this directly.
    pub async fn subscribe(&self, channel: &str) -> DispatchResult<MessageStream> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;
        let channel = channel.to_string();
        let stream = pubsub.into_on_message().map(move |msg| {
            msg.get_payload::<String>().map_err(|e| {
                tracing::warn!(channel = %channel, error = %e, "malformed pubsub payload");
                DispatchError::Cache(e)
            })
        });
        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl CacheGateway for RedisCacheGateway {
    async fn exists(&self, key: &str) -> DispatchResult<bool> {
        let mut conn = self.manager.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> DispatchResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl_seconds: u64) -> DispatchResult<bool> {
        let mut conn = self.manager.clone();
        let created: bool = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async::<Option<String>>(&mut conn)
            .await?
            .is_some();
        Ok(created)
    }

    async fn publish(&self, channel: &str, payload: &str) -> DispatchResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.publish(channel, payload).await?;
        Ok(())
    }

    async fn ping(&self) -> DispatchResult<()> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Timestamp helper for the `message:<id>:lock` value; the value itself is
/// never read back, only its presence matters.
pub fn lock_marker(now: DateTime<Utc>) -> String {
    now.to_rfc3339()
}

/// Adapts the command-bus subscription to the scheduler's [`CommandSource`].
pub struct RedisCommandSource {
    stream: MessageStream,
}

impl RedisCommandSource {
    pub fn new(stream: MessageStream) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl CommandSource for RedisCommandSource {
    async fn recv(&mut self) -> Result<String, String> {
        match self.stream.next().await {
            Some(Ok(payload)) => Ok(payload),
            Some(Err(e)) => Err(e.to_string()),
            None => Err("command channel closed".to_string()),
        }
    }
}
