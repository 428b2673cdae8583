//! Delay scheduling for polling and auto-reset timers.

use std::time::Duration;

use async_trait::async_trait;

/// Suspends the caller for a delay.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Real timers on the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
pub use recording::RecordingScheduler;

#[cfg(test)]
mod recording {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::watch;

    use super::Scheduler;
    use crate::store::AppState;

    /// Test scheduler that never waits.
    ///
    /// Each requested delay is recorded, and when a store is attached the
    /// state at that moment is captured too.
    #[derive(Default)]
    pub struct RecordingScheduler {
        delays: Mutex<Vec<Duration>>,
        probe: Mutex<Option<watch::Receiver<AppState>>>,
        seen: Mutex<Vec<AppState>>,
    }

    impl RecordingScheduler {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn observe(&self, rx: watch::Receiver<AppState>) {
            *self.probe.lock().unwrap() = Some(rx);
        }

        pub fn delays(&self) -> Vec<Duration> {
            self.delays.lock().unwrap().clone()
        }

        /// States captured at each delay boundary, in order.
        pub fn seen(&self) -> Vec<AppState> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Scheduler for RecordingScheduler {
        async fn sleep(&self, delay: Duration) {
            self.delays.lock().unwrap().push(delay);
            let snapshot = self
                .probe
                .lock()
                .unwrap()
                .as_ref()
                .map(|rx| rx.borrow().clone());
            if let Some(state) = snapshot {
                self.seen.lock().unwrap().push(state);
            }
            tokio::task::yield_now().await;
        }
    }
}
