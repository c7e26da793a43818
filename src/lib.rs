pub mod codec;
pub mod config;
pub mod dashscope;
pub mod error;
pub mod logger;
pub mod models;
pub mod prompts;

pub use config::{BatchConfig, Endpoint};
pub use dashscope::{
    BatchOrchestrator, BatchSettings, DashScopeClient, HttpTransport, PollPolicy, ResultFetcher,
    TaskPoller, TaskSubmitter, Transport,
};
pub use error::{DashScopeError, Result, Stage};
pub use models::*;
pub use prompts::{json_array_items, parse_prompts};
pub use tokio_util::sync::CancellationToken;
