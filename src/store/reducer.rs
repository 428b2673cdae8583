//! State transitions.
//!
//! `reduce` is the only code that changes [`AppState`]. It performs no I/O,
//! so every transition can be tested without a runtime.

use crate::models::{
    ChatRoom, Message, MessageEntry, PlaceholderRoom, PodcastState, PodcastStatus, RoomEntry,
    UploadStatus,
};

use super::AppState;

/// Something that happened, as seen by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ChatRoomsRequested,
    ChatRoomsLoaded(Vec<ChatRoom>),
    ChatRoomsFailed,

    ActiveChatRoomChanged(Option<String>),
    MessagesLoaded(Vec<Message>),
    MessagesSettled,
    PodcastStatusLoaded {
        document_id: String,
        status: PodcastStatus,
        url: Option<String>,
    },

    /// Optimistic user message; its id is the temporary id.
    MessageQueued(Message),
    MessageConfirmed {
        temp_id: String,
        user: Message,
        reply: Message,
    },
    MessageFailed {
        reply: Message,
    },
    MessageSendSettled,

    UploadStarted(PlaceholderRoom),
    UploadAccepted,
    PlaceholderRemoved(String),
    UploadSucceeded,
    UploadFailed {
        temp_id: String,
    },
    UploadReset,

    PodcastRequested,
    PodcastCompleted {
        url: Option<String>,
    },
    PodcastFailed,
    PodcastReset,
}

/// Apply one event to the state.
pub fn reduce(mut state: AppState, event: Event) -> AppState {
    match event {
        Event::ChatRoomsRequested => {
            state.is_loading_chat_rooms = true;
        }
        Event::ChatRoomsLoaded(rooms) => {
            state.chat_rooms = rooms.into_iter().map(RoomEntry::Room).collect();
            state.is_loading_chat_rooms = false;
        }
        Event::ChatRoomsFailed => {
            state.is_loading_chat_rooms = false;
        }

        Event::ActiveChatRoomChanged(id) => {
            state.active_chat_room_id = id;
            state.messages.clear();
            state.is_loading_messages = true;
            state.podcast = PodcastState::default();
            state.active_document_id = None;
        }
        Event::MessagesLoaded(messages) => {
            state.messages = messages.into_iter().map(MessageEntry::Confirmed).collect();
        }
        Event::MessagesSettled => {
            state.is_loading_messages = false;
        }
        Event::PodcastStatusLoaded {
            document_id,
            status,
            url,
        } => {
            state.active_document_id = Some(document_id);
            state.podcast = PodcastState { status, url };
        }

        Event::MessageQueued(message) => {
            state.messages.push(MessageEntry::Pending {
                temp_id: message.id.clone(),
                message,
            });
            state.is_sending_message = true;
        }
        Event::MessageConfirmed {
            temp_id,
            user,
            reply,
        } => {
            state
                .messages
                .retain(|m| !matches!(m, MessageEntry::Pending { temp_id: t, .. } if *t == temp_id));
            state.messages.push(MessageEntry::Confirmed(user));
            state.messages.push(MessageEntry::Confirmed(reply));
        }
        Event::MessageFailed { reply } => {
            state.messages.push(MessageEntry::Synthetic(reply));
        }
        Event::MessageSendSettled => {
            state.is_sending_message = false;
        }

        Event::UploadStarted(placeholder) => {
            state.upload_status = UploadStatus::Uploading;
            state
                .chat_rooms
                .insert(0, RoomEntry::Placeholder(placeholder));
        }
        Event::UploadAccepted => {
            state.upload_status = UploadStatus::Processing;
        }
        Event::PlaceholderRemoved(temp_id) => {
            remove_placeholder(&mut state, &temp_id);
        }
        Event::UploadSucceeded => {
            state.upload_status = UploadStatus::Success;
        }
        Event::UploadFailed { temp_id } => {
            remove_placeholder(&mut state, &temp_id);
            state.upload_status = UploadStatus::Failed;
        }
        Event::UploadReset => {
            state.upload_status = UploadStatus::Idle;
        }

        Event::PodcastRequested => {
            state.podcast.status = PodcastStatus::Generating;
        }
        Event::PodcastCompleted { url } => {
            state.podcast = PodcastState {
                status: PodcastStatus::Completed,
                url,
            };
        }
        Event::PodcastFailed => {
            state.podcast.status = PodcastStatus::Failed;
        }
        Event::PodcastReset => {
            state.podcast = PodcastState::default();
        }
    }

    state
}

// Only placeholders carry temporary ids, so a server room is never matched.
fn remove_placeholder(state: &mut AppState, temp_id: &str) {
    state
        .chat_rooms
        .retain(|r| !matches!(r, RoomEntry::Placeholder(p) if p.temp_id == temp_id));
}
