use std::fmt;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Pipeline stage a per-prompt failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Submit,
    Poll,
    Collect,
    Download,
    Decode,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Submit => "submit",
            Stage::Poll => "poll",
            Stage::Collect => "collect",
            Stage::Download => "download",
            Stage::Decode => "decode",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum DashScopeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Input error: {0}")]
    InputError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Remote error (HTTP {status_code}): {body}")]
    RemoteError { status_code: u16, body: String },

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Task {task_id} failed: {response}")]
    JobFailed { task_id: String, response: Value },

    #[error("Task {task_id} timed out after {}s", .timeout.as_secs_f64())]
    JobTimeout { task_id: String, timeout: Duration },

    #[error("Failed to decode image from {url}: {cause}")]
    DecodeError { url: String, cause: String },

    #[error("Empty batch: {0}")]
    EmptyBatch(String),

    #[error("Batch canceled")]
    Canceled,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Prompt #{prompt_index} failed at {stage}: {source}")]
    StageFailed {
        stage: Stage,
        prompt_index: usize,
        #[source]
        source: Box<DashScopeError>,
    },
}

impl DashScopeError {
    /// Attributes an error to a pipeline stage. Already attributed errors and
    /// cancellations pass through untouched.
    pub fn at_stage(self, stage: Stage, prompt_index: usize) -> Self {
        match self {
            DashScopeError::StageFailed { .. } | DashScopeError::Canceled => self,
            other => DashScopeError::StageFailed {
                stage,
                prompt_index,
                source: Box::new(other),
            },
        }
    }

    /// The underlying error with any stage attribution stripped.
    pub fn root_cause(&self) -> &DashScopeError {
        match self {
            DashScopeError::StageFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            DashScopeError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Network-level failures worth retrying. Only the status poller retries.
    pub fn is_transient(&self) -> bool {
        matches!(self.root_cause(), DashScopeError::TransportError(_))
    }
}

impl From<serde_json::Error> for DashScopeError {
    fn from(err: serde_json::Error) -> Self {
        DashScopeError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DashScopeError>;
