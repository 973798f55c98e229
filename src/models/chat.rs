use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AccountBrief;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub message: String,
    pub image: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessageDetails {
    #[serde(flatten)]
    pub message: ChatMessage,
    pub sender: Option<AccountBrief>,
    pub receiver: Option<AccountBrief>,
}

/// Either `message` or `image` must be present.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: i64,
    pub message: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread_count: i64,
}
