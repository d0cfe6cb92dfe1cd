//! Generic bounded poll loop for synchronous wait-for-completion call sites.
//!
//! Distinct from the background reconciliation scans: callers here block
//! until a single job resolves, the attempt budget runs out, the job is
//! detected as stuck, or the caller cancels. "Stuck" means the job has
//! continuously reported a processing-like status for longer than
//! [`PollOptions::stuck_after`], which is tracked independently of the
//! overall attempt budget.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Boxed error returned by a caller-supplied check function.
pub type CheckError = Box<dyn std::error::Error + Send + Sync>;

/// Tuning knobs for [`poll_until`].
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Fixed wait between attempts.
    pub interval: Duration,
    /// Overall attempt budget.
    pub max_attempts: u32,
    /// Ceiling on a continuous processing-like streak.
    pub stuck_after: Duration,
    /// Log progress on attempt 1 and every Nth attempt; 0 disables.
    pub log_every: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 240,
            stuck_after: Duration::from_secs(180),
            log_every: 10,
        }
    }
}

/// One check result: either the final value or the provider's status.
#[derive(Debug)]
pub enum PollOutcome<T> {
    Ready(T),
    Pending { status: String },
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("job {request_id} stuck in '{status}' for {held_secs}s")]
    Stuck {
        request_id: String,
        status: String,
        held_secs: u64,
    },

    #[error("job {request_id} unresolved after {attempts} attempts")]
    TimedOut { request_id: String, attempts: u32 },

    #[error("polling cancelled for job {request_id}")]
    Cancelled { request_id: String },

    #[error("status check failed: {0}")]
    Check(CheckError),
}

/// Statuses that count toward the continuous-processing stuck streak.
fn is_processing_like(status: &str) -> bool {
    matches!(status, "processing" | "created" | "running")
}

/// Repeatedly invoke `check` until it reports a value or a bound trips.
///
/// The cancellation token is consulted at the top of every iteration and
/// during the inter-attempt wait.
pub async fn poll_until<T, F, Fut>(
    request_id: &str,
    opts: &PollOptions,
    cancel: &CancellationToken,
    mut check: F,
) -> Result<T, PollError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollOutcome<T>, CheckError>>,
{
    let mut processing_since: Option<Instant> = None;

    for attempt in 1..=opts.max_attempts {
        if cancel.is_cancelled() {
            return Err(PollError::Cancelled {
                request_id: request_id.to_string(),
            });
        }

        match check(attempt).await.map_err(PollError::Check)? {
            PollOutcome::Ready(value) => return Ok(value),
            PollOutcome::Pending { status } => {
                if is_processing_like(&status) {
                    let since = *processing_since.get_or_insert_with(Instant::now);
                    let held = since.elapsed();
                    if held > opts.stuck_after {
                        tracing::error!(
                            request_id,
                            status = %status,
                            held_secs = held.as_secs(),
                            "Job held a processing status past the stuck ceiling"
                        );
                        return Err(PollError::Stuck {
                            request_id: request_id.to_string(),
                            status,
                            held_secs: held.as_secs(),
                        });
                    }
                } else {
                    processing_since = None;
                }

                if opts.log_every > 0 && (attempt == 1 || attempt % opts.log_every == 0) {
                    tracing::debug!(
                        request_id,
                        attempt,
                        max_attempts = opts.max_attempts,
                        status = %status,
                        "Poll progress"
                    );
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(PollError::Cancelled {
                    request_id: request_id.to_string(),
                });
            }
            _ = tokio::time::sleep(opts.interval) => {}
        }
    }

    tracing::error!(
        request_id,
        attempts = opts.max_attempts,
        "Poll attempt budget exhausted"
    );
    Err(PollError::TimedOut {
        request_id: request_id.to_string(),
        attempts: opts.max_attempts,
    })
}
