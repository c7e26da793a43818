use std::sync::Arc;
use std::time::Duration;

use reqwest::{header::HeaderValue, Method};
use serde_json::Value;

use super::{auth_headers, transport::Transport};
use crate::{
    config::Endpoint,
    error::{DashScopeError, Result},
    models::{GenerationRequest, TaskHandle},
};

const ASYNC_HEADER: &str = "x-dashscope-async";

/// Finds the task id, trying `output.task_id` before a top-level `task_id`.
/// Empty strings count as absent.
pub fn lookup_task_id(response: &Value) -> Option<String> {
    let nested = response
        .get("output")
        .and_then(|output| output.get("task_id"))
        .and_then(Value::as_str);
    let flat = response.get("task_id").and_then(Value::as_str);

    nested
        .filter(|id| !id.is_empty())
        .or(flat.filter(|id| !id.is_empty()))
        .map(str::to_string)
}

/// Creates one asynchronous image-synthesis task per request.
#[derive(Clone)]
pub struct TaskSubmitter {
    transport: Arc<dyn Transport>,
    request_timeout: Duration,
}

impl TaskSubmitter {
    pub fn new(transport: Arc<dyn Transport>, request_timeout: Duration) -> Self {
        Self {
            transport,
            request_timeout,
        }
    }

    pub async fn submit(
        &self,
        request: &GenerationRequest,
        credential: &str,
        endpoint: &Endpoint,
    ) -> Result<TaskHandle> {
        let body = serde_json::to_value(request.to_body())?;

        let mut headers = auth_headers(credential)?;
        headers.insert(ASYNC_HEADER, HeaderValue::from_static("enable"));

        let response = self
            .transport
            .request_json(
                Method::POST,
                &endpoint.create_task_url(),
                headers,
                Some(&body),
                self.request_timeout,
            )
            .await?;

        let task_id = lookup_task_id(&response).ok_or_else(|| {
            log::debug!("Create-task response without task id: {}", response);
            DashScopeError::ProtocolError("missing task id".into())
        })?;

        log::info!("Submitted task {} with model {}", task_id, request.model);
        Ok(TaskHandle::new(task_id))
    }
}
