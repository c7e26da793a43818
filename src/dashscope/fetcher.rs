use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use serde_json::Value;

use super::transport::Transport;
use crate::{
    codec,
    error::{DashScopeError, Result},
    models::ResultItem,
};

/// Extracts `output.results[].url` from a succeeded task.
///
/// A missing, non-array or empty `results` is an error. Entries without a
/// usable URL are skipped.
pub fn collect_results(terminal_response: &Value) -> Result<Vec<ResultItem>> {
    let results = terminal_response
        .get("output")
        .and_then(|output| output.get("results"))
        .and_then(Value::as_array)
        .filter(|results| !results.is_empty())
        .ok_or_else(|| DashScopeError::ProtocolError("no results".into()))?;

    let mut items = Vec::with_capacity(results.len());
    for (index, entry) in results.iter().enumerate() {
        match entry.get("url").and_then(Value::as_str) {
            Some(url) if !url.is_empty() => items.push(ResultItem {
                url: url.to_string(),
            }),
            _ => log::warn!("Skipping result #{} without url: {}", index, entry),
        }
    }
    Ok(items)
}

#[derive(Clone)]
pub struct ResultFetcher {
    transport: Arc<dyn Transport>,
    download_timeout: Duration,
}

impl ResultFetcher {
    pub fn new(transport: Arc<dyn Transport>, download_timeout: Duration) -> Self {
        Self {
            transport,
            download_timeout,
        }
    }

    pub fn collect(&self, terminal_response: &Value) -> Result<Vec<ResultItem>> {
        collect_results(terminal_response)
    }

    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        self.transport
            .download_bytes(url, self.download_timeout)
            .await
    }

    pub async fn download_and_decode(&self, url: &str) -> Result<RgbImage> {
        let bytes = self.download(url).await?;
        log::debug!("Downloaded {} bytes from {}", bytes.len(), url);
        codec::decode_rgb(url, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashscope::testing::{succeeded, ScriptedTransport};
    use serde_json::json;

    #[test]
    fn test_collect_in_service_order() {
        let items = collect_results(&succeeded(&["https://img/a.png", "https://img/b.png"]))
            .unwrap();
        let urls: Vec<&str> = items.iter().map(|item| item.url.as_str()).collect();
        assert_eq!(urls, vec!["https://img/a.png", "https://img/b.png"]);
    }

    #[test]
    fn test_empty_or_missing_results_is_protocol_error() {
        for response in [
            json!({"output": {"task_status": "SUCCEEDED", "results": []}}),
            json!({"output": {"task_status": "SUCCEEDED"}}),
            json!({"output": {"results": {"url": "not a list"}}}),
            json!({"results": [{"url": "top-level is ignored"}]}),
        ] {
            let err = collect_results(&response).unwrap_err();
            assert!(
                matches!(err, DashScopeError::ProtocolError(ref m) if m == "no results"),
                "unexpected error for {response}: {err:?}"
            );
        }
    }

    #[test]
    fn test_entries_without_url_are_skipped() {
        let response = json!({"output": {"results": [
            {"code": "DataInspectionFailed", "message": "blocked"},
            {"url": "https://img/ok.png"},
            {"url": ""},
            {"url": 7},
            "https://img/bare-string.png"
        ]}});
        let items = collect_results(&response).unwrap();
        assert_eq!(
            items,
            vec![ResultItem {
                url: "https://img/ok.png".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_download_and_decode() {
        let transport = Arc::new(ScriptedTransport::new().serve_png("https://img/a.png", 4, 3));
        let fetcher = ResultFetcher::new(transport.clone(), Duration::from_secs(120));

        let image = fetcher.download_and_decode("https://img/a.png").await.unwrap();
        assert_eq!(image.dimensions(), (4, 3));
        assert_eq!(transport.download_calls(), vec!["https://img/a.png".to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_bytes_are_decode_error() {
        let transport = Arc::new(
            ScriptedTransport::new().serve("https://img/bad.png", b"<html>oops</html>".to_vec()),
        );
        let fetcher = ResultFetcher::new(transport, Duration::from_secs(120));

        let err = fetcher
            .download_and_decode("https://img/bad.png")
            .await
            .unwrap_err();
        assert!(matches!(err, DashScopeError::DecodeError { ref url, .. } if url == "https://img/bad.png"));
    }
}
