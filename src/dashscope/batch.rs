use futures::{stream, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use super::{
    fetcher::ResultFetcher,
    poller::{PollPolicy, TaskPoller},
    submitter::TaskSubmitter,
};
use crate::{
    config::Endpoint,
    error::{DashScopeError, Result, Stage},
    logger,
    models::{GenerationParams, GenerationRequest, ImageBatch},
};

/// Everything a batch run needs besides the prompts themselves.
#[derive(Clone)]
pub struct BatchSettings {
    pub params: GenerationParams,
    pub credential: String,
    pub endpoint: Endpoint,
    pub policy: PollPolicy,
    /// Prompts in flight at once. Results are still assembled in prompt order.
    pub concurrency: usize,
}

/// Drives submit, poll, collect and download for every prompt.
#[derive(Clone)]
pub struct BatchOrchestrator {
    submitter: TaskSubmitter,
    poller: TaskPoller,
    fetcher: ResultFetcher,
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(DashScopeError::Canceled)
    } else {
        Ok(())
    }
}

impl BatchOrchestrator {
    pub fn new(submitter: TaskSubmitter, poller: TaskPoller, fetcher: ResultFetcher) -> Self {
        Self {
            submitter,
            poller,
            fetcher,
        }
    }

    /// Runs every prompt and returns all images in prompt order, then result
    /// order. The first failure aborts the whole batch.
    pub async fn run_batch(
        &self,
        prompts: &[String],
        settings: &BatchSettings,
        cancel: &CancellationToken,
    ) -> Result<ImageBatch> {
        if prompts.is_empty() {
            return Err(DashScopeError::EmptyBatch("no prompts given".into()));
        }

        let _timer = logger::timer(&format!("image batch of {} prompt(s)", prompts.len()));

        // Prompts finish in any order; the first error returns at once and
        // dropping the stream cancels the prompts still in flight.
        let mut slots: Vec<Option<ImageBatch>> = prompts.iter().map(|_| None).collect();
        let mut runs = stream::iter(prompts.iter().enumerate())
            .map(|(index, prompt)| async move {
                self.run_prompt(index, prompt, settings, cancel)
                    .await
                    .map(|images| (index, images))
            })
            .buffer_unordered(settings.concurrency.max(1));

        while let Some((index, images)) = runs.try_next().await? {
            slots[index] = Some(images);
        }

        let mut batch = ImageBatch::new();
        for images in slots.into_iter().flatten() {
            batch.extend(images);
        }

        if batch.is_empty() {
            return Err(DashScopeError::EmptyBatch(
                "no images were produced".into(),
            ));
        }

        log::info!(
            "Batch finished: {} image(s) from {} prompt(s)",
            batch.len(),
            prompts.len()
        );
        Ok(batch)
    }

    async fn run_prompt(
        &self,
        index: usize,
        prompt: &str,
        settings: &BatchSettings,
        cancel: &CancellationToken,
    ) -> Result<ImageBatch> {
        ensure_active(cancel)?;
        let request = GenerationRequest::new(prompt, &settings.params);
        let handle = self
            .submitter
            .submit(&request, &settings.credential, &settings.endpoint)
            .await
            .map_err(|e| e.at_stage(Stage::Submit, index))?;

        let terminal = self
            .poller
            .await_completion(
                &handle,
                &settings.credential,
                &settings.endpoint,
                settings.policy,
                cancel,
            )
            .await
            .map_err(|e| e.at_stage(Stage::Poll, index))?;

        let items = self
            .fetcher
            .collect(&terminal)
            .map_err(|e| e.at_stage(Stage::Collect, index))?;

        let mut images = ImageBatch::new();
        for item in items {
            ensure_active(cancel)?;
            let image = self
                .fetcher
                .download_and_decode(&item.url)
                .await
                .map_err(|e| {
                    let stage = match e {
                        DashScopeError::DecodeError { .. } => Stage::Decode,
                        _ => Stage::Download,
                    };
                    e.at_stage(stage, index)
                })?;
            images.push(image, item.url);
        }

        log::info!(
            "Prompt #{} (task {}) produced {} image(s)",
            index,
            handle,
            images.len()
        );
        Ok(images)
    }
}
