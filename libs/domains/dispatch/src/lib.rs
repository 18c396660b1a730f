//! Domain logic for the outbound message dispatcher: the store and cache
//! gateway contracts, their Postgres/Redis implementations, the delivery
//! and retry worker pools, and the readiness probe.

pub mod backoff;
pub mod cache;
pub mod entity;
pub mod error;
pub mod models;
pub mod postgres;
pub mod readiness;
pub mod repository;
pub mod retry_service;
pub mod service;
pub mod webhook;

pub use cache::{CacheGateway, RedisCacheGateway, RedisCommandSource};
pub use error::{DispatchError, DispatchResult};
pub use models::{Message, MessageDeadLetter, MessageRetry, MessageStatus};
pub use postgres::PgStoreGateway;
pub use readiness::ReadinessProbe;
pub use repository::StoreGateway;
pub use retry_service::RetryService;
pub use service::DeliveryService;
pub use webhook::{ReqwestWebhookClient, WebhookClient};
