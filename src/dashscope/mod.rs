pub mod batch;
pub mod fetcher;
pub mod poller;
pub mod submitter;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

use crate::{
    config::BatchConfig,
    error::{DashScopeError, Result},
    models::{BatchOutput, ImageBatch},
    prompts,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use batch::{BatchOrchestrator, BatchSettings};
pub use fetcher::ResultFetcher;
pub use poller::{PollPolicy, TaskPoller};
pub use submitter::TaskSubmitter;
pub use transport::{HttpTransport, Transport};

pub(crate) fn auth_headers(credential: &str) -> Result<HeaderMap> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", credential)).map_err(|_| {
        DashScopeError::ConfigError("API key contains characters not allowed in a header".into())
    })?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

/// Batch text-to-image client configured from a [`BatchConfig`].
#[derive(Clone)]
pub struct DashScopeClient {
    submitter: TaskSubmitter,
    poller: TaskPoller,
    fetcher: ResultFetcher,
    orchestrator: BatchOrchestrator,
    settings: BatchSettings,
}

impl DashScopeClient {
    pub fn new(config: BatchConfig) -> Result<Self> {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(config: BatchConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let submitter = TaskSubmitter::new(transport.clone(), config.request_timeout);
        let poller = TaskPoller::new(transport.clone(), config.request_timeout);
        let fetcher = ResultFetcher::new(transport, config.download_timeout);
        let orchestrator =
            BatchOrchestrator::new(submitter.clone(), poller.clone(), fetcher.clone());

        let settings = BatchSettings {
            params: config.generation_params(),
            credential: config.api_key.clone().unwrap_or_default(),
            endpoint: config.endpoint(),
            policy: PollPolicy::new(config.poll_interval(), config.timeout())
                .with_max_transient_failures(config.max_transient_failures),
            concurrency: config.concurrency,
        };

        log::debug!(
            "DashScope client ready: endpoint={}, model={}, n={}",
            settings.endpoint.base_url(),
            settings.params.model,
            settings.params.n_per_prompt
        );

        Ok(Self {
            submitter,
            poller,
            fetcher,
            orchestrator,
            settings,
        })
    }

    pub fn submitter(&self) -> &TaskSubmitter {
        &self.submitter
    }

    pub fn poller(&self) -> &TaskPoller {
        &self.poller
    }

    pub fn fetcher(&self) -> &ResultFetcher {
        &self.fetcher
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    pub async fn run_batch(
        &self,
        prompts: &[String],
        cancel: &CancellationToken,
    ) -> Result<ImageBatch> {
        self.orchestrator
            .run_batch(prompts, &self.settings, cancel)
            .await
    }

    /// Parses a JSON prompt list, runs it, and packages the host outputs.
    pub async fn run_json(
        &self,
        prompts_json: &str,
        cancel: &CancellationToken,
    ) -> Result<BatchOutput> {
        let prompts = prompts::parse_prompts(prompts_json)?;
        let batch = self.run_batch(&prompts, cancel).await?;
        BatchOutput::from_batch(batch)
    }
}
