//! Notifications pushed by the widget page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat notification delivered through `ASSEMBLED_NOTIFICATIONS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatNotification {
    /// Unique identifier for the notification.
    #[serde(rename = "external_id")]
    pub id: String,

    /// Current state of the notification (e.g. "unread").
    pub state: String,

    /// The conversation message this notification refers to, if any.
    #[serde(
        rename = "conversation_message",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub conversation_message: Option<ConversationMessage>,
}

/// A single message inside a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Unique identifier for the message.
    #[serde(rename = "external_id")]
    pub id: String,

    /// Text content of the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// When the message was created (RFC 3339 on the wire).
    #[serde(rename = "created_at", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
