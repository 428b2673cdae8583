//! Chat message model and its optimistic wrapper.

use serde::{Deserialize, Serialize};

/// Author of a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single message in a chat room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub chat_room_id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Message {
    /// Build a client-side message stamped with `timestamp` for both times.
    pub fn local(id: String, chat_room_id: &str, role: Role, content: &str, timestamp: &str) -> Self {
        Self {
            id,
            chat_room_id: chat_room_id.to_string(),
            role,
            content: content.to_string(),
            created_at: timestamp.to_string(),
            updated_at: timestamp.to_string(),
        }
    }
}

/// Request body for posting a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMessageRequest {
    pub message: String,
}

/// One row of the message history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageEntry {
    /// Optimistic user message awaiting the server
    Pending { temp_id: String, message: Message },
    /// Message reconciled with a server response
    Confirmed(Message),
    /// Assistant reply produced on the client after a failed send
    Synthetic(Message),
}

impl MessageEntry {
    pub fn message(&self) -> &Message {
        match self {
            MessageEntry::Pending { message, .. } => message,
            MessageEntry::Confirmed(message) => message,
            MessageEntry::Synthetic(message) => message,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            MessageEntry::Pending { temp_id, .. } => temp_id,
            other => &other.message().id,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, MessageEntry::Pending { .. })
    }
}
