use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};

pub const MAX_RETRIES: i32 = 5;

/// Lifecycle state of a [`Message`]. No transition leads back out of `Done`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "done")]
    Done,
    #[sea_orm(string_value = "error")]
    Error,
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Processing => "processing",
            MessageStatus::Done => "done",
            MessageStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// The primary outbound-message record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i32,
    pub phone_number: String,
    pub content: String,
    pub status: MessageStatus,
    pub message_id: Option<String>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// A message that failed delivery on the hot path and is awaiting re-drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRetry {
    pub id: i32,
    pub original_message_id: i32,
    pub phone_number: String,
    pub content: String,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A message that exhausted its retry budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDeadLetter {
    pub id: i32,
    pub original_message_id: i32,
    pub phone_number: String,
    pub content: String,
    pub last_error: Option<String>,
    pub failed_at: DateTime<Utc>,
}

/// Outbound webhook request body: `{"message": "...", "to": "..."}`.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub message: String,
    pub to: String,
}

/// Expected webhook response body: `{"message": "...", "messageId": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookResponse {
    #[allow(dead_code)]
    pub message: String,
    #[serde(rename = "messageId")]
    pub message_id: String,
}

pub const DEFAULT_LIST_LIMIT: u64 = 10;
pub const MAX_LIST_LIMIT: u64 = 100;

/// Clamp a caller-supplied `list_sent` limit per the boundary contract:
/// non-positive falls back to the default, anything above the cap is
/// clamped to it.
pub fn clamp_list_limit(limit: i64) -> u64 {
    if limit <= 0 {
        DEFAULT_LIST_LIMIT
    } else {
        (limit as u64).min(MAX_LIST_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_non_positive_uses_default() {
        assert_eq!(clamp_list_limit(0), DEFAULT_LIST_LIMIT);
        assert_eq!(clamp_list_limit(-5), DEFAULT_LIST_LIMIT);
    }

    #[test]
    fn clamp_over_cap_is_clamped() {
        assert_eq!(clamp_list_limit(101), MAX_LIST_LIMIT);
        assert_eq!(clamp_list_limit(1000), MAX_LIST_LIMIT);
    }

    #[test]
    fn clamp_within_range_passes_through() {
        assert_eq!(clamp_list_limit(42), 42);
    }

    #[test]
    fn status_display_matches_wire_value() {
        assert_eq!(MessageStatus::Pending.to_string(), "pending");
        assert_eq!(MessageStatus::Done.to_string(), "done");
    }
}
