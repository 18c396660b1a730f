pub mod message;
pub mod message_dead_letter;
pub mod message_retry;

pub use message::Entity as MessageEntity;
pub use message_dead_letter::Entity as MessageDeadLetterEntity;
pub use message_retry::Entity as MessageRetryEntity;
