//! Per-conversation message timelines with cursor-based backward pagination.
//!
//! A timeline is always ordered oldest-first. History is loaded backwards in
//! pages: the initial fetch fills the tail, `load_older` prepends earlier
//! pages anchored on the server-issued cursor. Live and optimistic messages
//! append at the tail only.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use shared::{
    domain::{ConversationId, DeliveryStatus, Direction, MessageId},
    protocol::{MessagePage, MessagePayload},
};
use tracing::warn;
use uuid::Uuid;

use crate::error::InvalidCursorError;

/// One rendered timeline entry. Unlike the wire payload every field is
/// resolved: a missing id gets a synthetic one, a missing body falls back to
/// the first attachment key.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub body: String,
    pub content_type: Option<String>,
    pub direction: Direction,
    pub sent_at: DateTime<Utc>,
    pub status: DeliveryStatus,
}

impl Message {
    pub fn from_payload(payload: MessagePayload) -> Self {
        let id = payload
            .id
            .clone()
            .unwrap_or_else(|| MessageId::new(Uuid::new_v4().to_string()));
        let body = crate::conversations::preview_text(&payload);
        Self {
            id,
            conversation_id: payload.conversation_id,
            body,
            content_type: payload.content_type,
            direction: payload.direction,
            sent_at: payload.sent_at,
            status: payload.delivery_status.unwrap_or(DeliveryStatus::Sent),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Nothing fetched yet.
    Empty,
    /// Initial page in flight.
    Loading,
    Loaded,
    /// Backward page in flight; the loaded tail stays visible.
    LoadingOlder,
}

pub struct Timeline {
    conversation_id: ConversationId,
    phase: LoadPhase,
    messages: Vec<Message>,
    /// Id of the oldest fetched message, used as the `before_id` query
    /// parameter of the next backward fetch. After the first backward page
    /// the server's `next_before_id` is authoritative.
    cursor: Option<MessageId>,
    has_more: bool,
}

impl Timeline {
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            phase: LoadPhase::Empty,
            messages: Vec::new(),
            cursor: None,
            has_more: false,
        }
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading_older(&self) -> bool {
        self.phase == LoadPhase::LoadingOlder
    }

    pub fn begin_initial_load(&mut self) {
        self.phase = LoadPhase::Loading;
    }

    /// Installs the newest page. A full page implies more history may exist;
    /// a short page means the whole thread fit in one fetch.
    pub fn apply_initial_page(&mut self, page: MessagePage, page_size: u32) {
        let full_page = page.items.len() as u32 >= page_size;
        self.messages = page
            .items
            .into_iter()
            .map(Message::from_payload)
            .collect();
        self.cursor = if full_page {
            self.messages.first().map(|m| m.id.clone())
        } else {
            None
        };
        self.has_more = full_page && self.cursor.is_some();
        self.phase = LoadPhase::Loaded;
    }

    /// Starts a backward fetch, returning the cursor to query with. The
    /// guards here are contract checks; callers log and drop the error
    /// instead of surfacing it.
    pub fn begin_older_load(&mut self) -> Result<MessageId, InvalidCursorError> {
        if self.phase == LoadPhase::LoadingOlder {
            return Err(InvalidCursorError::LoadInFlight(
                self.conversation_id.clone(),
            ));
        }
        if !self.has_more {
            return Err(InvalidCursorError::Exhausted(self.conversation_id.clone()));
        }
        let Some(cursor) = self.cursor.clone() else {
            return Err(InvalidCursorError::MissingCursor(
                self.conversation_id.clone(),
            ));
        };
        self.phase = LoadPhase::LoadingOlder;
        Ok(cursor)
    }

    /// Prepends an older page. The server's `next_before_id` becomes the new
    /// cursor; a null cursor or an empty page permanently exhausts history.
    pub fn apply_older_page(&mut self, page: MessagePage) {
        let empty = page.items.is_empty();
        let mut older: Vec<Message> = page
            .items
            .into_iter()
            .map(Message::from_payload)
            .filter(|m| !self.contains(&m.id))
            .collect();
        older.append(&mut self.messages);
        self.messages = older;
        self.cursor = page.next_before_id.clone();
        self.has_more = !empty && self.cursor.is_some();
        self.phase = LoadPhase::Loaded;
    }

    /// Unwinds a failed backward fetch; cursor and history stay intact so
    /// the user can retry by scrolling again.
    pub fn abort_older_load(&mut self) {
        if self.phase == LoadPhase::LoadingOlder {
            self.phase = LoadPhase::Loaded;
        }
    }

    /// Unwinds a failed initial fetch so the next activation retries it.
    pub fn reset_to_empty(&mut self) {
        self.phase = LoadPhase::Empty;
        self.messages.clear();
        self.cursor = None;
        self.has_more = false;
    }

    /// Appends a live incoming message. Duplicate ids are dropped, so
    /// redelivery on the push channel is harmless here.
    pub fn append_live(&mut self, payload: MessagePayload) -> bool {
        if payload.direction != Direction::Incoming {
            return false;
        }
        let message = Message::from_payload(payload);
        if self.contains(&message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Appends an optimistic outgoing message with a temporary id.
    pub fn push_outgoing(&mut self, id: MessageId, body: String, sent_at: DateTime<Utc>) {
        self.messages.push(Message {
            id,
            conversation_id: self.conversation_id.clone(),
            body,
            content_type: Some("text".to_string()),
            direction: Direction::Outgoing,
            sent_at,
            status: DeliveryStatus::Queued,
        });
    }

    /// Swaps a temporary id for the server-assigned one and promotes the
    /// message to `sent`. Happens at most once per message.
    pub fn reconcile_sent(
        &mut self,
        temp_id: &MessageId,
        server_id: MessageId,
        sent_at: DateTime<Utc>,
    ) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| &m.id == temp_id) else {
            warn!(message_id = %temp_id, "reconcile target not found in timeline");
            return false;
        };
        message.id = server_id;
        message.sent_at = sent_at;
        message.status = DeliveryStatus::Sent;
        true
    }

    pub fn mark_failed(&mut self, id: &MessageId) -> bool {
        self.set_status(id, DeliveryStatus::Failed)
    }

    /// Failed-to-queued is the retry edge; any other starting status is
    /// left alone.
    pub fn mark_queued(&mut self, id: &MessageId) -> bool {
        self.set_status(id, DeliveryStatus::Queued)
    }

    fn set_status(&mut self, id: &MessageId, next: DeliveryStatus) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| &m.id == id) else {
            return false;
        };
        if !message.status.can_transition_to(next) {
            return false;
        }
        message.status = next;
        true
    }

    /// Counterparty read receipt: advances outgoing messages to `read`, up
    /// to and including `up_to` when given, otherwise the whole timeline.
    pub fn apply_read_receipt(&mut self, up_to: Option<&MessageId>) -> bool {
        let mut changed = false;
        for message in &mut self.messages {
            if message.direction == Direction::Outgoing
                && message.status.can_transition_to(DeliveryStatus::Read)
            {
                message.status = DeliveryStatus::Read;
                changed = true;
            }
            if up_to == Some(&message.id) {
                break;
            }
        }
        changed
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    fn contains(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|m| &m.id == id)
    }
}

/// All timelines the engine has touched this session. Rows are kept when a
/// conversation is deactivated so switching back is instant.
#[derive(Default)]
pub struct TimelineStore {
    timelines: HashMap<ConversationId, Timeline>,
}

impl TimelineStore {
    pub fn entry(&mut self, conversation_id: &ConversationId) -> &mut Timeline {
        self.timelines
            .entry(conversation_id.clone())
            .or_insert_with(|| Timeline::new(conversation_id.clone()))
    }

    pub fn get(&self, conversation_id: &ConversationId) -> Option<&Timeline> {
        self.timelines.get(conversation_id)
    }

    pub fn get_mut(&mut self, conversation_id: &ConversationId) -> Option<&mut Timeline> {
        self.timelines.get_mut(conversation_id)
    }

    /// Which thread holds the given message, if any. Used to route retries
    /// for messages that only exist under a temporary id.
    pub fn find_conversation(&self, id: &MessageId) -> Option<&ConversationId> {
        self.timelines
            .iter()
            .find(|(_, timeline)| timeline.contains(id))
            .map(|(conversation_id, _)| conversation_id)
    }
}

#[cfg(test)]
#[path = "tests/timeline_tests.rs"]
mod tests;
