//! Data models for the PDF chat client.
//!
//! Wire types match the backend JSON exactly; the `*Entry` unions add the
//! client-only optimistic states on top.

mod chat_room;
mod message;
mod status;

pub use chat_room::*;
pub use message::*;
pub use status::*;

/// Prefix for client-generated temporary identifiers.
pub const TEMP_ID_PREFIX: &str = "temp_";

/// Generate a fresh temporary identifier for an optimistic entry.
pub fn temp_id() -> String {
    format!("{}{}", TEMP_ID_PREFIX, uuid::Uuid::new_v4())
}

/// Whether an identifier was generated on the client.
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}
