//! Fixed-interval polling of background job status.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::errors::ApiError;
use crate::scheduler::Scheduler;

/// Result of one status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep<T> {
    /// Terminal status observed
    Ready(T),
    /// Still running; carries the raw status for logging
    Pending(String),
}

/// Why a polling loop stopped without a terminal status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    Request(ApiError),
    Exhausted { attempts: u32 },
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollError::Request(err) => write!(f, "status request failed: {}", err),
            PollError::Exhausted { attempts } => {
                write!(f, "no terminal status after {} attempts", attempts)
            }
        }
    }
}

impl std::error::Error for PollError {}

/// Wait `interval`, check, and repeat until `check` reports a terminal status.
///
/// With `max_attempts` unset the loop only ends on a terminal status or a
/// request error.
pub async fn poll_until<T, F, Fut>(
    scheduler: &dyn Scheduler,
    interval: Duration,
    max_attempts: Option<u32>,
    mut check: F,
) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStep<T>, ApiError>>,
{
    let mut attempts: u32 = 0;

    loop {
        if let Some(max) = max_attempts {
            if attempts >= max {
                return Err(PollError::Exhausted { attempts });
            }
        }

        scheduler.sleep(interval).await;
        attempts += 1;

        match check().await {
            Ok(PollStep::Ready(value)) => return Ok(value),
            Ok(PollStep::Pending(status)) => {
                tracing::debug!("Poll attempt {} returned {}", attempts, status);
            }
            Err(err) => return Err(PollError::Request(err)),
        }
    }
}
