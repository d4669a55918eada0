//! Completion polling for motion commands.
//!
//! Move procedures on the PLC return as soon as motion has started; the
//! only way to learn that the mechanics have finished is to re-read the
//! device's status pair until it reports the terminal combination. The
//! poller here is deliberately simple: a single-task sleep/sample/check
//! loop with a fixed cadence and an explicit per-iteration deadline check.
//! No backoff (motion time dominates poller overhead by orders of
//! magnitude), no background timers, and no retry of the command that
//! started the motion.

use crate::error::{ControlError, Result};
use crate::session::OpcValue;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Status word reported once motion has stopped.
pub const STATUS_STANDING: &str = "STANDING";
/// State reported while the drive is healthy and enabled.
pub const STATE_OPERATIONAL: &str = "OPERATIONAL";

/// Default cadence between status samples.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One observation of a device's discrete status/state pair.
///
/// Samples are transient: each is produced by a single batch read and
/// consumed immediately by the completion predicate, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSample {
    /// Motion status word, e.g. `MOVING` or `STANDING`.
    pub status: String,
    /// Operational state, e.g. `OPERATIONAL`.
    pub state: String,
}

impl StatusSample {
    /// Builds a sample from owned or borrowed strings.
    pub fn new(status: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            state: state.into(),
        }
    }

    /// Interprets a batch read of the status and state sub-nodes, in that
    /// order.
    pub fn from_values(values: &[OpcValue]) -> Result<Self> {
        match values {
            [status, state] => {
                let status = status.as_str().ok_or_else(|| {
                    ControlError::RemoteCall(format!(
                        "status node returned a non-string value: {:?}",
                        status
                    ))
                })?;
                let state = state.as_str().ok_or_else(|| {
                    ControlError::RemoteCall(format!(
                        "state node returned a non-string value: {:?}",
                        state
                    ))
                })?;
                Ok(Self::new(status, state))
            }
            other => Err(ControlError::RemoteCall(format!(
                "expected status and state values, got {}",
                other.len()
            ))),
        }
    }

    /// True once the device reports the terminal pair
    /// `STANDING`/`OPERATIONAL`.
    pub fn is_settled(&self) -> bool {
        self.status == STATUS_STANDING && self.state == STATE_OPERATIONAL
    }
}

/// What "done" means for a polled command, and how long to wait for it.
///
/// The default policy matches the instrument scripts this crate replaces:
/// sample every 10 ms until the terminal pair appears, with no deadline.
/// Callers that need a bounded wait opt in via [`with_timeout`].
///
/// [`with_timeout`]: CompletionPolicy::with_timeout
#[derive(Debug, Clone, Copy)]
pub struct CompletionPolicy {
    /// Decides whether a sample is terminal.
    pub predicate: fn(&StatusSample) -> bool,
    /// Pause between samples.
    pub poll_interval: Duration,
    /// Optional overall deadline. `None` polls until the predicate holds.
    pub timeout: Option<Duration>,
}

impl CompletionPolicy {
    /// Policy with a custom completion predicate and default cadence.
    pub fn new(predicate: fn(&StatusSample) -> bool) -> Self {
        Self {
            predicate,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }

    /// Policy recognizing the motion terminal pair.
    pub fn motion_settled() -> Self {
        Self::new(StatusSample::is_settled)
    }

    /// Replaces the sample cadence.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Bounds the overall wait.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for CompletionPolicy {
    fn default() -> Self {
        Self::motion_settled()
    }
}

/// Polls `sample` until the policy's predicate holds, returning the
/// terminal sample.
///
/// Each iteration sleeps `poll_interval`, takes one sample, evaluates the
/// predicate, and only then checks the deadline. At least one sample is
/// therefore always taken, even when the timeout is shorter than the
/// interval. A sampling error aborts the wait immediately. On deadline
/// expiry the error is [`ControlError::Timeout`], distinct from remote
/// rejection, and the command that started the motion is not retried.
pub async fn wait_until<S, Fut>(policy: &CompletionPolicy, mut sample: S) -> Result<StatusSample>
where
    S: FnMut() -> Fut,
    Fut: Future<Output = Result<StatusSample>>,
{
    let started = Instant::now();
    loop {
        tokio::time::sleep(policy.poll_interval).await;
        let observed = sample().await?;
        if (policy.predicate)(&observed) {
            return Ok(observed);
        }
        if let Some(timeout) = policy.timeout {
            let waited = started.elapsed();
            if waited >= timeout {
                return Err(ControlError::Timeout { waited });
            }
        }
        trace!(status = %observed.status, state = %observed.state, "not settled yet");
    }
}
