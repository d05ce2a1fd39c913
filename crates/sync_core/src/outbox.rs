//! Bookkeeping for optimistic sends awaiting server acknowledgement.
//!
//! Each pending message keeps its original text so a retry can resubmit the
//! exact payload. The in-flight flag enforces one submission attempt per
//! message at a time.

use std::collections::HashMap;

use shared::domain::{ConversationId, MessageId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutboxError {
    #[error("message {0} is not pending")]
    Unknown(MessageId),
    #[error("message {0} already has an attempt in flight")]
    AlreadyInFlight(MessageId),
}

#[derive(Debug, Clone)]
struct PendingSend {
    conversation_id: ConversationId,
    body: String,
    in_flight: bool,
}

#[derive(Default)]
pub struct Outbox {
    pending: HashMap<MessageId, PendingSend>,
}

impl Outbox {
    pub fn register(&mut self, id: MessageId, conversation_id: ConversationId, body: String) {
        self.pending.insert(
            id,
            PendingSend {
                conversation_id,
                body,
                in_flight: false,
            },
        );
    }

    /// Claims the message for a submission attempt and hands back what to
    /// send. Fails if an attempt is already running.
    pub fn begin_attempt(
        &mut self,
        id: &MessageId,
    ) -> Result<(ConversationId, String), OutboxError> {
        let entry = self
            .pending
            .get_mut(id)
            .ok_or_else(|| OutboxError::Unknown(id.clone()))?;
        if entry.in_flight {
            return Err(OutboxError::AlreadyInFlight(id.clone()));
        }
        entry.in_flight = true;
        Ok((entry.conversation_id.clone(), entry.body.clone()))
    }

    /// The server acknowledged the message; it leaves the outbox for good.
    pub fn complete(&mut self, id: &MessageId) {
        self.pending.remove(id);
    }

    /// The attempt failed; the entry stays pending and eligible for retry.
    pub fn fail(&mut self, id: &MessageId) {
        if let Some(entry) = self.pending.get_mut(id) {
            entry.in_flight = false;
        }
    }

    pub fn is_pending(&self, id: &MessageId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
