//! Application state store.
//!
//! The store owns every entity the client knows about. State lives in a
//! `watch` channel so views can subscribe to changes; it is only ever
//! replaced through [`reduce`], driven by the action handlers in
//! `actions.rs`.

mod actions;
mod polling;
mod reducer;


use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

use crate::api::ChatApi;
use crate::models::{MessageEntry, PodcastState, RoomEntry, UploadStatus};
use crate::scheduler::Scheduler;

pub use polling::{poll_until, PollError, PollStep};
pub use reducer::{reduce, Event};

/// Default delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);
/// Default time a terminal upload status stays visible.
pub const DEFAULT_UPLOAD_RESET_DELAY: Duration = Duration::from_millis(3000);
/// Default time a failed podcast status stays visible.
pub const DEFAULT_PODCAST_RESET_DELAY: Duration = Duration::from_millis(4000);

/// Everything the client tracks.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub chat_rooms: Vec<RoomEntry>,
    pub active_chat_room_id: Option<String>,
    pub messages: Vec<MessageEntry>,
    pub upload_status: UploadStatus,
    pub podcast: PodcastState,
    pub active_document_id: Option<String>,
    pub is_loading_chat_rooms: bool,
    pub is_loading_messages: bool,
    pub is_sending_message: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            chat_rooms: Vec::new(),
            active_chat_room_id: None,
            messages: Vec::new(),
            upload_status: UploadStatus::Idle,
            podcast: PodcastState::default(),
            active_document_id: None,
            // Rooms are fetched on startup, so the list starts out loading.
            is_loading_chat_rooms: true,
            is_loading_messages: false,
            is_sending_message: false,
        }
    }
}

/// What happens to the optimistic message when sending fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SendFailurePolicy {
    /// Leave the pending message in place with no error indicator
    #[default]
    KeepOptimistic,
    /// Also append a client-made assistant reply reporting the failure
    ErrorReply,
}

impl SendFailurePolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "keep" => Some(SendFailurePolicy::KeepOptimistic),
            "error-reply" => Some(SendFailurePolicy::ErrorReply),
            _ => None,
        }
    }
}

/// What happens to responses that arrive after the user moved on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StaleUpdatePolicy {
    /// Write late responses whatever is active now
    #[default]
    Apply,
    /// Drop responses for a room or document that is no longer active
    Discard,
}

impl StaleUpdatePolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "apply" => Some(StaleUpdatePolicy::Apply),
            "discard" => Some(StaleUpdatePolicy::Discard),
            _ => None,
        }
    }
}

/// Timing and policy knobs for the action handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub poll_interval: Duration,
    pub upload_reset_delay: Duration,
    pub podcast_reset_delay: Duration,
    /// Unset means poll until a terminal status or a request error
    pub max_poll_attempts: Option<u32>,
    pub send_failure: SendFailurePolicy,
    pub stale_updates: StaleUpdatePolicy,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            upload_reset_delay: DEFAULT_UPLOAD_RESET_DELAY,
            podcast_reset_delay: DEFAULT_PODCAST_RESET_DELAY,
            max_poll_attempts: None,
            send_failure: SendFailurePolicy::default(),
            stale_updates: StaleUpdatePolicy::default(),
        }
    }
}

/// The part of the state a late response belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    ChatRoom(String),
    Document(String),
}

impl Scope {
    fn is_current(&self, state: &AppState) -> bool {
        match self {
            Scope::ChatRoom(id) => state.active_chat_room_id.as_deref() == Some(id.as_str()),
            Scope::Document(id) => state.active_document_id.as_deref() == Some(id.as_str()),
        }
    }
}

/// A spawned polling or reset task.
#[derive(Debug)]
pub struct JobHandle {
    handle: JoinHandle<()>,
}

impl JobHandle {
    /// Wait for the job to finish, including its auto-reset delay.
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            if e.is_cancelled() {
                tracing::debug!("Background job was cancelled");
            } else {
                tracing::error!("Background job panicked: {}", e);
            }
        }
    }

    /// Stop this job at its next suspension point.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

/// Follow upload status changes until the store settles back to idle.
///
/// Every distinct status is passed to `report`. Returns the terminal status
/// (success or failed) if one was observed. Subscribe before starting the
/// upload, or the early transitions count as already seen.
pub async fn follow_upload(
    mut rx: watch::Receiver<AppState>,
    mut report: impl FnMut(UploadStatus),
) -> Option<UploadStatus> {
    let mut last = UploadStatus::Idle;
    let mut outcome = None;

    while rx.changed().await.is_ok() {
        let status = rx.borrow_and_update().upload_status;
        if status == last {
            continue;
        }
        report(status);
        if matches!(status, UploadStatus::Success | UploadStatus::Failed) {
            outcome = Some(status);
        }
        if status == UploadStatus::Idle {
            break;
        }
        last = status;
    }
    outcome
}

struct StoreInner {
    state: watch::Sender<AppState>,
    api: Arc<dyn ChatApi>,
    scheduler: Arc<dyn Scheduler>,
    settings: StoreSettings,
    jobs: Mutex<Vec<AbortHandle>>,
}

/// Shared handle to the client state and its actions.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    pub fn new(
        api: Arc<dyn ChatApi>,
        scheduler: Arc<dyn Scheduler>,
        settings: StoreSettings,
    ) -> Self {
        let (state, _) = watch::channel(AppState::default());
        Self {
            inner: Arc::new(StoreInner {
                state,
                api,
                scheduler,
                settings,
                jobs: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> AppState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.inner.state.subscribe()
    }

    pub fn chat_rooms(&self) -> Vec<RoomEntry> {
        self.inner.state.borrow().chat_rooms.clone()
    }

    pub fn active_chat_room_id(&self) -> Option<String> {
        self.inner.state.borrow().active_chat_room_id.clone()
    }

    pub fn messages(&self) -> Vec<MessageEntry> {
        self.inner.state.borrow().messages.clone()
    }

    pub fn upload_status(&self) -> UploadStatus {
        self.inner.state.borrow().upload_status
    }

    pub fn podcast(&self) -> PodcastState {
        self.inner.state.borrow().podcast.clone()
    }

    pub fn active_document_id(&self) -> Option<String> {
        self.inner.state.borrow().active_document_id.clone()
    }

    /// Abort every outstanding poll and reset task.
    ///
    /// Nothing calls this implicitly; switching rooms leaves jobs running.
    pub fn cancel_background_jobs(&self) -> usize {
        let handles = match self.inner.jobs.lock() {
            Ok(mut jobs) => std::mem::take(&mut *jobs),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        let mut cancelled = 0;
        for handle in handles {
            if !handle.is_finished() {
                handle.abort();
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            tracing::info!("Cancelled {} background job(s)", cancelled);
        }
        cancelled
    }

    fn dispatch(&self, event: Event) {
        tracing::trace!("dispatch {:?}", event);
        self.inner
            .state
            .send_modify(|state| *state = reduce(std::mem::take(state), event));
    }

    /// Dispatch a response-driven event, dropping it if it went stale.
    fn dispatch_scoped(&self, scope: Scope, event: Event) {
        if self.inner.settings.stale_updates == StaleUpdatePolicy::Apply {
            self.dispatch(event);
            return;
        }

        let applied = self.inner.state.send_if_modified(|state| {
            if !scope.is_current(state) {
                return false;
            }
            *state = reduce(std::mem::take(state), event);
            true
        });
        if !applied {
            tracing::debug!("Discarded stale update for {:?}", scope);
        }
    }

    fn spawn_job<F>(&self, job: F) -> JobHandle
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(job);
        match self.inner.jobs.lock() {
            Ok(mut jobs) => {
                jobs.retain(|h| !h.is_finished());
                jobs.push(handle.abort_handle());
            }
            Err(_) => tracing::warn!("Job registry poisoned; job cannot be cancelled"),
        }
        JobHandle { handle }
    }
}
