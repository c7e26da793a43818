//! Scripted in-memory transport for exercising the task pipeline offline.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use reqwest::{header::HeaderMap, Method};
use serde_json::{json, Value};

use super::transport::Transport;
use crate::codec::encode_png;
use crate::error::{DashScopeError, Result};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

/// Replays queued JSON replies in call order and serves downloads from a map.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<Value>>>,
    downloads: Mutex<HashMap<String, Result<Vec<u8>>>>,
    calls: Mutex<Vec<RecordedCall>>,
    download_calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, reply: Result<Value>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn reply_ok(self, value: Value) -> Self {
        self.reply(Ok(value))
    }

    pub fn reply_transport_error(self) -> Self {
        self.reply(Err(DashScopeError::TransportError("connection reset".into())))
    }

    pub fn serve(self, url: &str, bytes: Vec<u8>) -> Self {
        self.downloads
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(bytes));
        self
    }

    pub fn serve_png(self, url: &str, width: u32, height: u32) -> Self {
        self.serve(url, encode_png(&RgbImage::from_pixel(width, height, Rgb([9, 9, 9]))))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn status_queries(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.method == Method::GET)
            .count()
    }

    pub fn download_calls(&self) -> Vec<String> {
        self.download_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request_json(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<&Value>,
        _timeout: Duration,
    ) -> Result<Value> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            url: url.to_string(),
            headers,
            body: body.cloned(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DashScopeError::TransportError("script exhausted".into())))
    }

    async fn download_bytes(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>> {
        self.download_calls.lock().unwrap().push(url.to_string());
        match self.downloads.lock().unwrap().remove(url) {
            Some(reply) => reply,
            None => Err(DashScopeError::RemoteError {
                status_code: 404,
                body: format!("no fixture for {}", url),
            }),
        }
    }
}

/// Answers by request content instead of call order, so prompts running
/// side by side can each follow their own script. Create-task replies are keyed
/// by prompt text, status replies by task id. The last status for a task is
/// repeated once its queue runs dry.
#[derive(Default)]
pub struct RoutedTransport {
    submissions: Mutex<HashMap<String, Result<Value>>>,
    statuses: Mutex<HashMap<String, VecDeque<Value>>>,
    downloads: Mutex<HashMap<String, Vec<u8>>>,
    status_calls: Mutex<Vec<String>>,
    download_calls: Mutex<Vec<String>>,
}

impl RoutedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_submit(self, prompt: &str, reply: Result<Value>) -> Self {
        self.submissions
            .lock()
            .unwrap()
            .insert(prompt.to_string(), reply);
        self
    }

    pub fn on_status(self, task_id: &str, replies: Vec<Value>) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(task_id.to_string(), replies.into());
        self
    }

    pub fn serve_png(self, url: &str, width: u32, height: u32) -> Self {
        self.downloads.lock().unwrap().insert(
            url.to_string(),
            encode_png(&RgbImage::from_pixel(width, height, Rgb([3, 3, 3]))),
        );
        self
    }

    /// Task ids in the order their status was queried.
    pub fn status_calls(&self) -> Vec<String> {
        self.status_calls.lock().unwrap().clone()
    }

    pub fn download_calls(&self) -> Vec<String> {
        self.download_calls.lock().unwrap().clone()
    }

    fn next_status(&self, task_id: &str) -> Result<Value> {
        self.status_calls.lock().unwrap().push(task_id.to_string());
        let mut statuses = self.statuses.lock().unwrap();
        let queue = statuses.get_mut(task_id).ok_or_else(|| {
            DashScopeError::TransportError(format!("no status scripted for {}", task_id))
        })?;
        match queue.len() {
            0 => Err(DashScopeError::TransportError("empty status script".into())),
            1 => Ok(queue[0].clone()),
            _ => Ok(queue.pop_front().unwrap()),
        }
    }
}

#[async_trait]
impl Transport for RoutedTransport {
    async fn request_json(
        &self,
        method: Method,
        url: &str,
        _headers: HeaderMap,
        body: Option<&Value>,
        _timeout: Duration,
    ) -> Result<Value> {
        if method == Method::POST {
            let prompt = body
                .and_then(|b| b["input"]["prompt"].as_str())
                .unwrap_or_default()
                .to_string();
            return self
                .submissions
                .lock()
                .unwrap()
                .remove(&prompt)
                .unwrap_or_else(|| {
                    Err(DashScopeError::TransportError(format!(
                        "no submission scripted for {:?}",
                        prompt
                    )))
                });
        }
        let task_id = url.rsplit('/').next().unwrap_or_default();
        self.next_status(task_id)
    }

    async fn download_bytes(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>> {
        self.download_calls.lock().unwrap().push(url.to_string());
        self.downloads
            .lock()
            .unwrap()
            .remove(url)
            .ok_or_else(|| DashScopeError::RemoteError {
                status_code: 404,
                body: format!("no fixture for {}", url),
            })
    }
}

pub fn created(task_id: &str) -> Value {
    json!({ "output": { "task_id": task_id, "task_status": "PENDING" }, "request_id": "req-1" })
}

pub fn status(task_status: &str) -> Value {
    json!({ "output": { "task_id": "t", "task_status": task_status } })
}

pub fn succeeded(urls: &[&str]) -> Value {
    let results: Vec<Value> = urls.iter().map(|url| json!({ "url": url })).collect();
    json!({ "output": { "task_id": "t", "task_status": "SUCCEEDED", "results": results } })
}
