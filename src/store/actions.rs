//! Action handlers.
//!
//! Each action calls the API and records the outcome as events. Failures
//! are logged and turned into a status; no action returns an error.

use std::sync::Arc;

use chrono::Utc;

use super::polling::{poll_until, PollStep};
use super::{Event, JobHandle, Scope, SendFailurePolicy, StaleUpdatePolicy, Store};
use crate::api::UploadFile;
use crate::errors::ApiError;
use crate::models::{temp_id, DocumentPhase, Message, PlaceholderRoom, PodcastStatus, Role};

/// Reply shown under `SendFailurePolicy::ErrorReply`.
pub const SEND_FAILURE_REPLY: &str =
    "Sorry, your message could not be delivered. Please try again.";

impl Store {
    /// Reload the room list from the backend.
    pub async fn fetch_chat_rooms(&self) {
        self.dispatch(Event::ChatRoomsRequested);

        match self.inner.api.get_chat_rooms().await {
            Ok(rooms) => {
                tracing::debug!("Fetched {} chat rooms", rooms.len());
                self.dispatch(Event::ChatRoomsLoaded(rooms));
            }
            Err(e) => {
                tracing::error!("Failed to fetch chat rooms: {}", e);
                self.dispatch(Event::ChatRoomsFailed);
            }
        }
    }

    /// Switch the active room and load its messages and podcast status.
    pub async fn set_active_chat_room_id(&self, id: Option<&str>) {
        if self.inner.state.borrow().active_chat_room_id.as_deref() == id {
            return;
        }

        self.dispatch(Event::ActiveChatRoomChanged(id.map(str::to_string)));

        let Some(id) = id else {
            self.dispatch(Event::MessagesSettled);
            return;
        };

        let document_id = self
            .inner
            .state
            .borrow()
            .chat_rooms
            .iter()
            .filter_map(|entry| entry.as_room())
            .find(|room| room.id == id)
            .map(|room| room.document_id.clone());

        let messages = async {
            match self.inner.api.get_messages(id).await {
                Ok(messages) => self.dispatch_scoped(
                    Scope::ChatRoom(id.to_string()),
                    Event::MessagesLoaded(messages),
                ),
                Err(e) => tracing::error!("Failed to fetch messages for {}: {}", id, e),
            }
        };

        let podcast = async {
            let Some(document_id) = document_id else {
                tracing::warn!("Chat room {} is not in the room list", id);
                return;
            };

            match self.inner.api.get_podcast_status(&document_id).await {
                Ok(resp) => self.dispatch_scoped(
                    Scope::ChatRoom(id.to_string()),
                    Event::PodcastStatusLoaded {
                        status: resp.podcast_status(),
                        url: resp.url,
                        document_id,
                    },
                ),
                Err(e) => tracing::error!(
                    "Failed to fetch podcast status for {}: {}",
                    document_id,
                    e
                ),
            }
        };

        tokio::join!(messages, podcast);

        self.dispatch_scoped(Scope::ChatRoom(id.to_string()), Event::MessagesSettled);
    }

    /// Send a message, showing it immediately and reconciling on reply.
    pub async fn post_message(&self, chat_room_id: &str, text: &str) {
        let now = Utc::now().to_rfc3339();
        let pending = Message::local(temp_id(), chat_room_id, Role::User, text, &now);
        let temp = pending.id.clone();
        self.dispatch(Event::MessageQueued(pending.clone()));

        let scope = Scope::ChatRoom(chat_room_id.to_string());
        match self.inner.api.post_message(chat_room_id, text).await {
            Ok(reply) => {
                let user = Message {
                    id: uuid::Uuid::new_v4().to_string(),
                    ..pending
                };
                self.dispatch_scoped(
                    scope,
                    Event::MessageConfirmed {
                        temp_id: temp,
                        user,
                        reply,
                    },
                );
            }
            Err(e) => {
                tracing::error!("Failed to post message to {}: {}", chat_room_id, e);
                if self.inner.settings.send_failure == SendFailurePolicy::ErrorReply {
                    let reply = Message::local(
                        temp_id(),
                        chat_room_id,
                        Role::Assistant,
                        SEND_FAILURE_REPLY,
                        &Utc::now().to_rfc3339(),
                    );
                    self.dispatch_scoped(scope, Event::MessageFailed { reply });
                }
            }
        }

        self.dispatch(Event::MessageSendSettled);
    }

    /// Upload a PDF and track its ingestion in the background.
    ///
    /// A placeholder room is shown until ingestion reaches a terminal status.
    /// The returned job finishes once the status is back to idle.
    pub async fn upload_and_track_document(&self, file: UploadFile) -> JobHandle {
        let temp = temp_id();
        tracing::info!("Uploading {}", file.file_name);
        self.dispatch(Event::UploadStarted(PlaceholderRoom::processing(
            temp.clone(),
            file.file_name.clone(),
        )));

        let document_id = match self.inner.api.upload_pdf(file).await {
            Ok(resp) => resp.document_id.filter(|id| !id.is_empty()),
            Err(e) => {
                tracing::error!("Upload failed: {}", e);
                None
            }
        };

        let Some(document_id) = document_id else {
            self.dispatch(Event::UploadFailed { temp_id: temp });
            let store = self.clone();
            return self.spawn_job(async move { store.reset_upload_status().await });
        };

        tracing::info!("Document {} accepted, waiting for ingestion", document_id);
        self.dispatch(Event::UploadAccepted);

        let store = self.clone();
        self.spawn_job(async move { store.track_ingestion(document_id, temp).await })
    }

    async fn track_ingestion(&self, document_id: String, temp: String) {
        let api = Arc::clone(&self.inner.api);
        let settings = &self.inner.settings;

        let outcome = poll_until(
            self.inner.scheduler.as_ref(),
            settings.poll_interval,
            settings.max_poll_attempts,
            || {
                let api = Arc::clone(&api);
                let document_id = document_id.clone();
                async move {
                    let resp = api.get_document_status(&document_id).await?;
                    Ok::<_, ApiError>(match resp.phase() {
                        DocumentPhase::Pending(status) => PollStep::Pending(status),
                        terminal => PollStep::Ready(terminal),
                    })
                }
            },
        )
        .await;

        match outcome {
            Ok(DocumentPhase::Completed) => {
                tracing::info!("Document {} is ready", document_id);
                self.fetch_chat_rooms().await;
                // The refresh replaces the list, but not if it failed.
                self.dispatch(Event::PlaceholderRemoved(temp));
                self.dispatch(Event::UploadSucceeded);
            }
            Ok(_) => {
                tracing::error!("Processing failed for document {}", document_id);
                self.dispatch(Event::UploadFailed { temp_id: temp });
            }
            Err(e) => {
                tracing::error!("Stopped tracking document {}: {}", document_id, e);
                self.dispatch(Event::UploadFailed { temp_id: temp });
            }
        }

        self.reset_upload_status().await;
    }

    async fn reset_upload_status(&self) {
        self.inner
            .scheduler
            .sleep(self.inner.settings.upload_reset_delay)
            .await;
        self.dispatch(Event::UploadReset);
    }

    /// Start podcast generation for a document and poll until it settles.
    ///
    /// Returns `None` without doing anything while a generation is running.
    pub async fn generate_podcast(&self, document_id: &str) -> Option<JobHandle> {
        if self.inner.state.borrow().podcast.status == PodcastStatus::Generating {
            tracing::warn!("Podcast generation already in progress");
            return None;
        }

        let document_id = document_id.to_string();
        let scope = Scope::Document(document_id.clone());

        // Under Discard every write for an inactive document is dropped,
        // including the Generating guard above.
        if self.inner.settings.stale_updates == StaleUpdatePolicy::Discard
            && !scope.is_current(&self.inner.state.borrow())
        {
            tracing::warn!("Document {} is not active; podcast not requested", document_id);
            return None;
        }

        self.dispatch_scoped(scope.clone(), Event::PodcastRequested);

        if let Err(e) = self.inner.api.start_podcast_generation(&document_id).await {
            tracing::error!("Failed to start podcast generation: {}", e);
            self.dispatch_scoped(scope, Event::PodcastFailed);
            let store = self.clone();
            let job = async move { store.reset_podcast_status(document_id).await };
            return Some(self.spawn_job(job));
        }

        tracing::info!("Podcast generation started for {}", document_id);
        let store = self.clone();
        Some(self.spawn_job(async move { store.track_podcast(document_id).await }))
    }

    async fn track_podcast(&self, document_id: String) {
        let api = Arc::clone(&self.inner.api);
        let settings = &self.inner.settings;

        let outcome = poll_until(
            self.inner.scheduler.as_ref(),
            settings.poll_interval,
            settings.max_poll_attempts,
            || {
                let api = Arc::clone(&api);
                let document_id = document_id.clone();
                async move {
                    let resp = api.get_podcast_status(&document_id).await?;
                    Ok::<_, ApiError>(match resp.podcast_status() {
                        PodcastStatus::Completed => PollStep::Ready(Some(resp.url)),
                        PodcastStatus::Failed => PollStep::Ready(None),
                        _ => PollStep::Pending(resp.status),
                    })
                }
            },
        )
        .await;

        let scope = Scope::Document(document_id.clone());
        match outcome {
            Ok(Some(url)) => {
                tracing::info!("Podcast ready for {}", document_id);
                self.dispatch_scoped(scope, Event::PodcastCompleted { url });
                return;
            }
            Ok(None) => {
                tracing::error!("Podcast generation failed for {}", document_id);
            }
            Err(e) => {
                tracing::error!("Stopped tracking podcast for {}: {}", document_id, e);
            }
        }

        self.dispatch_scoped(scope, Event::PodcastFailed);
        self.reset_podcast_status(document_id).await;
    }

    async fn reset_podcast_status(&self, document_id: String) {
        self.inner
            .scheduler
            .sleep(self.inner.settings.podcast_reset_delay)
            .await;
        self.dispatch_scoped(Scope::Document(document_id), Event::PodcastReset);
    }
}
