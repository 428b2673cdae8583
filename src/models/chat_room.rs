//! Chat room model and the client-side placeholder shown during ingestion.

use serde::{Deserialize, Serialize};

/// Status string carried by placeholders while the backend ingests the PDF.
pub const PLACEHOLDER_STATUS: &str = "PROCESSING";

/// A conversation scoped to one uploaded document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub user_id: String,
    pub document_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Temporary stand-in for a room whose document is still being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderRoom {
    pub temp_id: String,
    pub title: String,
    pub status: &'static str,
}

impl PlaceholderRoom {
    pub fn processing(temp_id: String, title: String) -> Self {
        Self {
            temp_id,
            title,
            status: PLACEHOLDER_STATUS,
        }
    }
}

/// One row of the room list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEntry {
    Placeholder(PlaceholderRoom),
    Room(ChatRoom),
}

impl RoomEntry {
    /// Identifier of the entry, temporary for placeholders.
    pub fn id(&self) -> &str {
        match self {
            RoomEntry::Placeholder(p) => &p.temp_id,
            RoomEntry::Room(r) => &r.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            RoomEntry::Placeholder(p) => &p.title,
            RoomEntry::Room(r) => &r.title,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, RoomEntry::Placeholder(_))
    }

    pub fn as_room(&self) -> Option<&ChatRoom> {
        match self {
            RoomEntry::Room(r) => Some(r),
            RoomEntry::Placeholder(_) => None,
        }
    }
}
