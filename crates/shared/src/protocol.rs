use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ConversationId, DeliveryStatus, Direction, MessageId, Platform, ThreadStatus,
};

/// One item of `GET /threads`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: ConversationId,
    pub customer: CustomerInfo,
    pub preview: PreviewInfo,
    pub last_message_at: DateTime<Utc>,
    #[serde(default)]
    pub unread_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub platform: Platform,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewInfo {
    #[serde(default)]
    pub text: Option<String>,
    pub direction: Direction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadListResponse {
    pub items: Vec<ThreadSummary>,
}

/// One timeline item, as returned by `GET /threads/{id}/messages` and as
/// carried inside push events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub direction: Direction,
    pub sent_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_status: Option<DeliveryStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentPayload {
    pub storage_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Page of timeline items in chronological order. `next_before_id` is the
/// cursor for the next backward page; `null` means the history is exhausted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePage {
    pub items: Vec<MessagePayload>,
    #[serde(default)]
    pub next_before_id: Option<MessageId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub id: MessageId,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadRequest {
    pub send_mark_seen: bool,
}

/// Server-initiated frames on the push channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PushEvent {
    /// First message of a brand-new inbound thread.
    #[serde(rename = "thread:new")]
    ThreadNew { message: MessagePayload },
    #[serde(rename = "message:new")]
    MessageNew {
        conversation_id: ConversationId,
        message: MessagePayload,
    },
    #[serde(rename = "thread:update")]
    ThreadUpdate(ThreadPatch),
    #[serde(rename = "thread:read")]
    ThreadRead {
        conversation_id: ConversationId,
        #[serde(default)]
        up_to: Option<MessageId>,
    },
}

/// Sparse patch carried by `thread:update`; absent fields leave the
/// conversation row untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadPatch {
    pub id: ConversationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unread: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ThreadStatus>,
}

/// Client-initiated frames on the push channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RoomCommand {
    #[serde(rename = "thread:join")]
    ThreadJoin { conversation_id: ConversationId },
    #[serde(rename = "thread:leave")]
    ThreadLeave { conversation_id: ConversationId },
}
