use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(ConversationId);
id_newtype!(MessageId);

const TEMP_ID_PREFIX: &str = "temp:";

impl MessageId {
    /// Client-generated id for an optimistic message. Replaced exactly once,
    /// at reconciliation, with the server-assigned id.
    pub fn temporary() -> Self {
        Self(format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }
}

/// The closed set of external messaging surfaces a thread can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Messenger,
    Instagram,
    Whatsapp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "in")]
    Incoming,
    #[serde(rename = "out")]
    Outgoing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Queued,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl DeliveryStatus {
    /// Statuses only move forward, with the queued/failed retry loop as the
    /// single exception.
    pub fn can_transition_to(self, next: DeliveryStatus) -> bool {
        use DeliveryStatus::{Failed, Queued};
        match (self, next) {
            (Queued, Failed) | (Failed, Queued) => true,
            (Failed, _) | (_, Failed) => false,
            (current, next) => next > current,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    Open,
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_ids_are_unique_and_recognizable() {
        let a = MessageId::temporary();
        let b = MessageId::temporary();
        assert!(a.is_temporary());
        assert_ne!(a, b);
        assert!(!MessageId::from("m1").is_temporary());
    }

    #[test]
    fn delivery_status_only_moves_forward() {
        use DeliveryStatus::*;
        assert!(Queued.can_transition_to(Sent));
        assert!(Sent.can_transition_to(Delivered));
        assert!(Delivered.can_transition_to(Read));
        assert!(!Read.can_transition_to(Delivered));
        assert!(!Sent.can_transition_to(Queued));
    }

    #[test]
    fn failed_participates_only_in_the_retry_loop() {
        use DeliveryStatus::*;
        assert!(Queued.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Queued));
        assert!(!Failed.can_transition_to(Sent));
        assert!(!Sent.can_transition_to(Failed));
    }

    #[test]
    fn direction_uses_short_wire_names() {
        assert_eq!(serde_json::to_string(&Direction::Incoming).unwrap(), "\"in\"");
        assert_eq!(serde_json::to_string(&Direction::Outgoing).unwrap(), "\"out\"");
    }
}
