use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{auth_headers, transport::Transport};
use crate::{
    config::Endpoint,
    error::{DashScopeError, Result},
    models::{TaskHandle, TaskStatus},
};

/// Fixed-interval polling with a wall-clock budget per task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
    /// Give up after this many transport failures in a row. `None` keeps
    /// retrying until the timeout.
    pub max_transient_failures: Option<u32>,
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            max_transient_failures: None,
        }
    }

    pub fn with_max_transient_failures(mut self, max: Option<u32>) -> Self {
        self.max_transient_failures = max;
        self
    }
}

/// Reads `output.task_status`, falling back to a top-level `task_status`.
pub fn lookup_task_status(response: &Value) -> Option<&str> {
    let nested = response
        .get("output")
        .and_then(|output| output.get("task_status"))
        .and_then(Value::as_str);
    let flat = response.get("task_status").and_then(Value::as_str);

    nested
        .filter(|status| !status.is_empty())
        .or(flat.filter(|status| !status.is_empty()))
}

/// Sleeps for `interval` unless the batch is canceled first.
pub(crate) async fn pause(interval: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(DashScopeError::Canceled),
        _ = tokio::time::sleep(interval) => Ok(()),
    }
}

#[derive(Clone)]
pub struct TaskPoller {
    transport: Arc<dyn Transport>,
    request_timeout: Duration,
}

impl TaskPoller {
    pub fn new(transport: Arc<dyn Transport>, request_timeout: Duration) -> Self {
        Self {
            transport,
            request_timeout,
        }
    }

    /// Polls until the task succeeds, returning the terminal response.
    ///
    /// Transport failures are retried after one interval; only the deadline
    /// (or the optional consecutive-failure cap) ends the job on them.
    /// Remote and protocol errors are returned immediately.
    pub async fn await_completion(
        &self,
        handle: &TaskHandle,
        credential: &str,
        endpoint: &Endpoint,
        policy: PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let headers = auth_headers(credential)?;
        let url = endpoint.task_url(&handle.task_id);
        let deadline = Instant::now() + policy.timeout;
        let mut consecutive_failures = 0u32;

        loop {
            if Instant::now() > deadline {
                log::warn!(
                    "Task {} still not finished after {:.1}s",
                    handle,
                    policy.timeout.as_secs_f64()
                );
                return Err(DashScopeError::JobTimeout {
                    task_id: handle.task_id.clone(),
                    timeout: policy.timeout,
                });
            }
            if cancel.is_cancelled() {
                return Err(DashScopeError::Canceled);
            }

            match self
                .transport
                .request_json(
                    Method::GET,
                    &url,
                    headers.clone(),
                    None,
                    self.request_timeout,
                )
                .await
            {
                Ok(response) => {
                    consecutive_failures = 0;
                    let status = lookup_task_status(&response)
                        .map(TaskStatus::parse)
                        .unwrap_or(TaskStatus::Unknown);
                    log::debug!("Task {} status: {}", handle, status.as_str());

                    match status {
                        TaskStatus::Succeeded => return Ok(response),
                        TaskStatus::Failed | TaskStatus::Canceled => {
                            return Err(DashScopeError::JobFailed {
                                task_id: handle.task_id.clone(),
                                response,
                            });
                        }
                        TaskStatus::Pending | TaskStatus::Running | TaskStatus::Unknown => {}
                    }
                }
                Err(err) if err.is_transient() => {
                    consecutive_failures += 1;
                    if let Some(max) = policy.max_transient_failures {
                        if consecutive_failures > max {
                            return Err(err);
                        }
                    }
                    log::warn!(
                        "Status query for task {} failed ({} in a row), retrying: {}",
                        handle,
                        consecutive_failures,
                        err
                    );
                }
                Err(err) => return Err(err),
            }

            pause(policy.interval, cancel).await?;
        }
    }
}
