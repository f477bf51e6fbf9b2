//! # Operation Tracking
//!
//! Classification of asynchronous CF operations and bounded polling.
//!
//! CF reports every asynchronous state as one nullable string. It is turned
//! into an [`OperationPhase`] once, here, and callers branch on the variant.
//! Reconcile ticks never wait on running work: they record the operation in
//! status and re-queue. Only deletion polls synchronously, under a deadline.

use crate::constants::{JOB_POLL_INITIAL_SECS, JOB_POLL_MAX_SECS};
use crate::crd::Operation;
use crate::error::{Error, Result};
use crate::provider::JobApi;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub const STATE_RUNNING: &str = "RUNNING";
pub const STATE_FINISHED: &str = "FINISHED";
pub const STATE_FAILED: &str = "FAILED";
pub const STATE_ABORTED: &str = "ABORTED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No operation is or ever was in flight
    None,
    Running,
    Finished,
    Failed,
}

/// Operation state with the user-visible failure message attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationPhase {
    None,
    Running,
    Finished,
    Failed(String),
    Aborted(String),
}

impl OperationPhase {
    pub fn classification(&self) -> Classification {
        match self {
            Self::None => Classification::None,
            Self::Running => Classification::Running,
            Self::Finished => Classification::Finished,
            Self::Failed(_) | Self::Aborted(_) => Classification::Failed,
        }
    }
}

/// Classify an operation
///
/// A missing state on a known id counts as running. Any state other than
/// `RUNNING` or `FINISHED` is terminal, including `ACTION_REQUIRED`.
pub fn classify(op: Option<&Operation>) -> Classification {
    phase(op).classification()
}

pub fn phase(op: Option<&Operation>) -> OperationPhase {
    let Some(op) = op.filter(|op| op.id.as_deref().is_some_and(|id| !id.is_empty())) else {
        return OperationPhase::None;
    };
    match op.state.as_deref() {
        None | Some("") | Some(STATE_RUNNING) => OperationPhase::Running,
        Some(STATE_FINISHED) => OperationPhase::Finished,
        Some(state) => {
            let message = op
                .error
                .as_deref()
                .filter(|e| !e.is_empty())
                .unwrap_or(state)
                .to_string();
            if state == STATE_ABORTED {
                OperationPhase::Aborted(message)
            } else {
                OperationPhase::Failed(message)
            }
        }
    }
}

/// Failure message of a failed operation; empty for any other operation
pub fn error_message(op: Option<&Operation>) -> String {
    match phase(op) {
        OperationPhase::Failed(message) | OperationPhase::Aborted(message) => message,
        _ => String::new(),
    }
}

pub fn is_running(op: Option<&Operation>) -> bool {
    classify(op) == Classification::Running
}

/// Poll until the operation leaves the running state
///
/// Back-off starts at 1s, doubles and is capped at 30s. Exceeding
/// `deadline` yields a transient error so the caller retries on a later tick.
pub async fn poll_until_complete<F, Fut>(id: &str, deadline: Duration, mut poll: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Operation>>,
{
    let max_delay = Duration::from_secs(JOB_POLL_MAX_SECS);
    let polling = async {
        let mut delay = Duration::from_secs(JOB_POLL_INITIAL_SECS);
        loop {
            let op = poll().await?;
            match phase(Some(&op)) {
                OperationPhase::None | OperationPhase::Finished => return Ok(()),
                OperationPhase::Failed(message) | OperationPhase::Aborted(message) => {
                    return Err(Error::operation_failed(message).with("operation", id));
                }
                OperationPhase::Running => {
                    debug!("Operation {} still running, next poll in {:?}", id, delay);
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(max_delay);
                }
            }
        }
    };
    match tokio::time::timeout(deadline, polling).await {
        Ok(result) => result,
        Err(_) => Err(Error::transient(format!(
            "operation {id} did not complete within {}s",
            deadline.as_secs()
        ))
        .with("operation", id)),
    }
}

/// Poll a CF v3 job to completion
pub async fn poll_job_complete(jobs: &dyn JobApi, job_id: &str, deadline: Duration) -> Result<()> {
    poll_until_complete(job_id, deadline, move || async move {
        jobs.get_job(job_id).await.map_err(Error::from)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn op(id: Option<&str>, state: Option<&str>, error: Option<&str>) -> Operation {
        Operation {
            id: id.map(str::to_string),
            state: state.map(str::to_string),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(None), Classification::None);
        assert_eq!(classify(Some(&op(None, Some("RUNNING"), None))), Classification::None);
        assert_eq!(classify(Some(&op(Some("j1"), None, None))), Classification::Running);
        assert_eq!(classify(Some(&op(Some("j1"), Some("RUNNING"), None))), Classification::Running);
        assert_eq!(classify(Some(&op(Some("j1"), Some("FINISHED"), None))), Classification::Finished);
        assert_eq!(classify(Some(&op(Some("j1"), Some("FAILED"), None))), Classification::Failed);
        assert_eq!(classify(Some(&op(Some("j1"), Some("ABORTED"), None))), Classification::Failed);
        assert_eq!(
            classify(Some(&op(Some("j1"), Some("ACTION_REQUIRED"), None))),
            Classification::Failed
        );
    }

    #[test]
    fn test_error_message_empty_iff_not_failed() {
        let cases = [
            op(None, None, None),
            op(Some("j1"), None, Some("ignored")),
            op(Some("j1"), Some("RUNNING"), Some("ignored")),
            op(Some("j1"), Some("FINISHED"), Some("ignored")),
            op(Some("j1"), Some("FAILED"), None),
            op(Some("j1"), Some("FAILED"), Some("")),
            op(Some("j1"), Some("ABORTED"), Some("aborted by user")),
        ];
        for case in &cases {
            let failed = classify(Some(case)) == Classification::Failed;
            assert_eq!(error_message(Some(case)).is_empty(), !failed, "{case:?}");
        }
    }

    #[test]
    fn test_error_message_prefers_error_then_state() {
        assert_eq!(
            error_message(Some(&op(Some("j2"), Some("FAILED"), Some("service quota exhausted")))),
            "service quota exhausted"
        );
        assert_eq!(error_message(Some(&op(Some("j2"), Some("FAILED"), None))), "FAILED");
        assert_eq!(
            phase(Some(&op(Some("j2"), Some("ABORTED"), None))),
            OperationPhase::Aborted("ABORTED".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_complete_backs_off_until_finished() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let started = tokio::time::Instant::now();
        poll_until_complete("j1", Duration::from_secs(120), || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let state = if n < 3 { "RUNNING" } else { "FINISHED" };
                Ok(op(Some("j1"), Some(state), None))
            }
        })
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // 1s + 2s + 4s
        assert_eq!(started.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_complete_surfaces_failure() {
        let err = poll_until_complete("j1", Duration::from_secs(120), || async {
            Ok(op(Some("j1"), Some("FAILED"), Some("space not empty")))
        })
        .await
        .unwrap_err();
        assert_eq!(err.reason(), "OperationFailed");
        assert_eq!(err.to_string(), "space not empty");
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_complete_times_out_as_transient() {
        let err = poll_until_complete("j1", Duration::from_secs(10), || async {
            Ok(op(Some("j1"), Some("RUNNING"), None))
        })
        .await
        .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(err.attributes().get("operation"), Some("j1"));
    }
}
