//! In-memory table of conversation summaries, one row per thread.
//!
//! Mutated from two directions: periodic REST snapshot merges and live push
//! patches. The merge is asymmetric on purpose: a snapshot may be stale
//! relative to push-driven state, so volatile fields of an existing row
//! (preview, unread counter) always survive a refresh.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use shared::{
    domain::{ConversationId, DeliveryStatus, Direction, Platform, ThreadStatus},
    protocol::{MessagePayload, ThreadPatch, ThreadSummary},
};
use tracing::debug;

pub const PLACEHOLDER_NAME: &str = "unknown contact";

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: ConversationId,
    pub name: String,
    pub avatar: Option<String>,
    pub platform: Platform,
    pub preview_text: String,
    pub preview_sender: Direction,
    pub preview_status: Option<DeliveryStatus>,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: u32,
    pub status: ThreadStatus,
}

impl From<ThreadSummary> for Conversation {
    fn from(summary: ThreadSummary) -> Self {
        let preview_status = match summary.preview.direction {
            Direction::Outgoing => Some(DeliveryStatus::Sent),
            Direction::Incoming => None,
        };
        Self {
            id: summary.id,
            name: summary.customer.name,
            avatar: summary.customer.avatar,
            platform: summary.customer.platform,
            preview_text: summary.preview.text.unwrap_or_default(),
            preview_sender: summary.preview.direction,
            preview_status,
            last_message_at: summary.last_message_at,
            unread_count: summary.unread_count,
            status: ThreadStatus::Open,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    NewestFirst,
    OldestFirst,
}

/// Pure projection parameters; filtering never mutates the store.
#[derive(Debug, Clone, Default)]
pub struct ConversationFilter {
    pub platforms: Vec<Platform>,
    pub unread_only: bool,
    pub search: Option<String>,
}

#[derive(Default)]
pub struct ConversationStore {
    rows: HashMap<ConversationId, Conversation>,
    /// Fingerprints of incoming push messages already applied, per thread.
    /// Guards the unread counter against channel redelivery; only the active
    /// thread's set survives an activation switch so memory stays bounded.
    seen_inbound: HashMap<ConversationId, HashSet<String>>,
}

impl ConversationStore {
    /// Union by thread id. For rows present on both sides the existing
    /// row's volatile fields (preview text/sender/status, unread counter)
    /// win; identity fields (name, avatar, platform) and the activity
    /// timestamp take the snapshot's value.
    pub fn merge_snapshot(&mut self, incoming: Vec<ThreadSummary>) {
        for summary in incoming {
            match self.rows.get_mut(&summary.id) {
                Some(existing) => {
                    existing.name = summary.customer.name;
                    existing.avatar = summary.customer.avatar;
                    existing.platform = summary.customer.platform;
                    existing.last_message_at = summary.last_message_at;
                }
                None => {
                    self.rows
                        .insert(summary.id.clone(), Conversation::from(summary));
                }
            }
        }
    }

    /// Applies a live message to the summary row. Returns false when the
    /// event is an exact redelivery already covered by the fingerprint set,
    /// in which case nothing is mutated.
    ///
    /// The unread counter increments iff the message is incoming and the
    /// thread is not the active one.
    pub fn apply_message_patch(
        &mut self,
        conversation_id: &ConversationId,
        message: &MessagePayload,
        active: Option<&ConversationId>,
    ) -> bool {
        let incoming = message.direction == Direction::Incoming;
        if incoming {
            let fingerprint = message_fingerprint(conversation_id, message);
            let seen = self.seen_inbound.entry(conversation_id.clone()).or_default();
            if !seen.insert(fingerprint) {
                debug!(conversation_id = %conversation_id, "dropping redelivered push message");
                return false;
            }
        }

        let row = self
            .rows
            .entry(conversation_id.clone())
            .or_insert_with(|| Conversation {
                id: conversation_id.clone(),
                name: PLACEHOLDER_NAME.to_string(),
                avatar: None,
                platform: Platform::Messenger,
                preview_text: String::new(),
                preview_sender: message.direction,
                preview_status: None,
                last_message_at: message.sent_at,
                unread_count: 0,
                status: ThreadStatus::Open,
            });

        row.preview_text = preview_text(message);
        row.preview_sender = message.direction;
        if let Some(status) = message.delivery_status {
            row.preview_status = Some(status);
        } else if message.direction == Direction::Incoming {
            row.preview_status = None;
        }
        row.last_message_at = message.sent_at;
        if incoming && active != Some(conversation_id) {
            row.unread_count += 1;
        }

        true
    }

    /// Shallow-merges whatever subset of fields the patch carries. Patches
    /// never create rows; an unknown thread id is a no-op.
    pub fn apply_thread_patch(&mut self, patch: &ThreadPatch) -> bool {
        let Some(row) = self.rows.get_mut(&patch.id) else {
            return false;
        };
        if let Some(last_message_at) = patch.last_message_at {
            row.last_message_at = last_message_at;
        }
        if let Some(unread) = patch.unread {
            row.unread_count = unread;
        }
        if let Some(status) = patch.status {
            row.status = status;
        }
        true
    }

    /// Counterparty read receipt: an outgoing preview advances to `read`.
    pub fn apply_read_receipt(&mut self, conversation_id: &ConversationId) {
        if let Some(row) = self.rows.get_mut(conversation_id) {
            if row.preview_sender == Direction::Outgoing {
                let current = row.preview_status.unwrap_or(DeliveryStatus::Sent);
                if current.can_transition_to(DeliveryStatus::Read) {
                    row.preview_status = Some(DeliveryStatus::Read);
                }
            }
        }
    }

    pub fn reset_unread(&mut self, conversation_id: &ConversationId) -> bool {
        match self.rows.get_mut(conversation_id) {
            Some(row) if row.unread_count > 0 => {
                row.unread_count = 0;
                true
            }
            _ => false,
        }
    }

    /// Drops every fingerprint set except the active thread's. Threads that
    /// only ever receive pushes would otherwise accumulate dedup state for
    /// the whole session.
    pub fn retain_fingerprints(&mut self, active: Option<&ConversationId>) {
        self.seen_inbound.retain(|id, _| Some(id) == active);
    }

    pub fn get(&self, conversation_id: &ConversationId) -> Option<&Conversation> {
        self.rows.get(conversation_id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sorted, filtered view for display. Non-stateful: the store is not
    /// touched, rows are cloned out.
    pub fn project(&self, filter: &ConversationFilter, order: SortOrder) -> Vec<Conversation> {
        let query = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        let mut list: Vec<Conversation> = self
            .rows
            .values()
            .filter(|c| filter.platforms.is_empty() || filter.platforms.contains(&c.platform))
            .filter(|c| !filter.unread_only || c.unread_count > 0)
            .filter(|c| match &query {
                Some(q) => {
                    c.name.to_lowercase().contains(q) || c.preview_text.to_lowercase().contains(q)
                }
                None => true,
            })
            .cloned()
            .collect();

        list.sort_by(|a, b| match order {
            SortOrder::NewestFirst => b
                .last_message_at
                .cmp(&a.last_message_at)
                .then_with(|| a.id.0.cmp(&b.id.0)),
            SortOrder::OldestFirst => a
                .last_message_at
                .cmp(&b.last_message_at)
                .then_with(|| a.id.0.cmp(&b.id.0)),
        });
        list
    }
}

/// Dedup key for a push-delivered message: the server id when present,
/// otherwise conversation id + body + timestamp.
fn message_fingerprint(conversation_id: &ConversationId, message: &MessagePayload) -> String {
    match &message.id {
        Some(id) => id.0.clone(),
        None => format!(
            "{}::{}::{}",
            conversation_id,
            message.text.as_deref().unwrap_or_default(),
            message.sent_at.to_rfc3339()
        ),
    }
}

pub(crate) fn preview_text(message: &MessagePayload) -> String {
    if let Some(text) = message.text.as_deref() {
        if !text.is_empty() {
            return text.to_string();
        }
    }
    message
        .attachments
        .first()
        .map(|a| a.storage_key.clone())
        .unwrap_or_else(|| "attachment".to_string())
}

#[cfg(test)]
#[path = "tests/conversations_tests.rs"]
mod tests;
