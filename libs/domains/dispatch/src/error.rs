use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("webhook transport error: {0}")]
    Webhook(#[from] reqwest::Error),

    #[error("payload encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("message {0} not found")]
    NotFound(i32),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
