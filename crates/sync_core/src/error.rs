use shared::domain::ConversationId;
use thiserror::Error;

/// Failure classes of the synchronization engine. Nothing here is fatal to
/// the process; the worst case is a stale view, recoverable by the next
/// snapshot fetch.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The push channel is unreachable or has dropped. REST remains the
    /// source of truth, so this is a connectivity indicator, not data loss.
    #[error("push transport unavailable: {0}")]
    Transport(String),
    /// A REST read failed; the operation was abandoned without partial
    /// store mutation.
    #[error("fetch failed ({context}): {source}")]
    Fetch {
        context: String,
        #[source]
        source: anyhow::Error,
    },
    /// A message submission failed; the message is marked `failed` in place
    /// and may be retried.
    #[error("send failed for conversation {conversation_id}: {source}")]
    Send {
        conversation_id: ConversationId,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    InvalidCursor(#[from] InvalidCursorError),
}

/// Contract violation on backward pagination. Logged and swallowed at the
/// operation boundary, never shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCursorError {
    #[error("no older history for conversation {0}")]
    Exhausted(ConversationId),
    #[error("a load is already in flight for conversation {0}")]
    LoadInFlight(ConversationId),
    #[error("timeline for conversation {0} has no pagination cursor")]
    MissingCursor(ConversationId),
}
