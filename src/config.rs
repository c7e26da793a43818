use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{DashScopeError, Result};
use crate::models::GenerationParams;

pub const DEFAULT_API_HOST: &str = "dashscope.aliyuncs.com";
pub const DEFAULT_MODEL: &str = "wan2.5-t2i-preview";
pub const DEFAULT_SIZE: &str = "1024*1024";

const CREATE_TASK_PATH: &str = "/api/v1/services/aigc/text2image/image-synthesis";
const TASKS_PATH: &str = "/api/v1/tasks";

/// Base URL of the remote service plus the two routes the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
}

impl Endpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_host(host: &str) -> Self {
        Self::new(format!("https://{}", host.trim()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn create_task_url(&self) -> String {
        format!("{}{}", self.base_url, CREATE_TASK_PATH)
    }

    pub fn task_url(&self, task_id: &str) -> String {
        format!("{}{}/{}", self.base_url, TASKS_PATH, task_id)
    }
}

/// Flat configuration bundle for one batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub size: String,
    pub n_per_prompt: u32,
    pub negative_prompt: String,
    pub prompt_extend: bool,
    pub watermark: bool,
    pub api_host: String,
    pub base_url: Option<String>,
    pub poll_interval_secs: f64,
    pub timeout_secs: u64,
    pub request_timeout: Duration,
    pub download_timeout: Duration,
    pub max_transient_failures: Option<u32>,
    pub concurrency: usize,
    /// Environment values that could not be parsed, kept for `validate`.
    env_errors: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            size: DEFAULT_SIZE.to_string(),
            n_per_prompt: 1,
            negative_prompt: String::new(),
            prompt_extend: true,
            watermark: false,
            api_host: DEFAULT_API_HOST.to_string(),
            base_url: None,
            poll_interval_secs: 1.0,
            timeout_secs: 120,
            request_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(120),
            max_transient_failures: None,
            concurrency: 1,
            env_errors: Vec::new(),
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `DASHSCOPE_*` variables. Unset variables fall back to defaults;
    /// values that fail to parse are reported by [`BatchConfig::validate`].
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Same as [`BatchConfig::from_env`] with an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let mut env_errors = Vec::new();

        let api_key = lookup("DASHSCOPE_API_KEY");
        let model = lookup("DASHSCOPE_MODEL").unwrap_or(defaults.model);
        let size = lookup("DASHSCOPE_SIZE").unwrap_or(defaults.size);
        let n_per_prompt = parse_var(&lookup, "DASHSCOPE_N", &mut env_errors)
            .unwrap_or(defaults.n_per_prompt);
        let negative_prompt =
            lookup("DASHSCOPE_NEGATIVE_PROMPT").unwrap_or(defaults.negative_prompt);
        let prompt_extend = flag_var(&lookup, "DASHSCOPE_PROMPT_EXTEND", &mut env_errors)
            .unwrap_or(defaults.prompt_extend);
        let watermark = flag_var(&lookup, "DASHSCOPE_WATERMARK", &mut env_errors)
            .unwrap_or(defaults.watermark);
        let api_host = lookup("DASHSCOPE_HOST").unwrap_or(defaults.api_host);
        let base_url = lookup("DASHSCOPE_BASE_URL");
        let poll_interval_secs = parse_var(&lookup, "DASHSCOPE_POLL_INTERVAL", &mut env_errors)
            .unwrap_or(defaults.poll_interval_secs);
        let timeout_secs = parse_var(&lookup, "DASHSCOPE_TIMEOUT", &mut env_errors)
            .unwrap_or(defaults.timeout_secs);
        let max_transient_failures =
            parse_var(&lookup, "DASHSCOPE_MAX_TRANSIENT_FAILURES", &mut env_errors);
        let concurrency = parse_var(&lookup, "DASHSCOPE_CONCURRENCY", &mut env_errors)
            .unwrap_or(defaults.concurrency);

        BatchConfig {
            api_key,
            model,
            size,
            n_per_prompt,
            negative_prompt,
            prompt_extend,
            watermark,
            api_host,
            base_url,
            poll_interval_secs,
            timeout_secs,
            max_transient_failures,
            concurrency,
            env_errors,
            ..defaults
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    pub fn with_n_per_prompt(mut self, n: u32) -> Self {
        self.n_per_prompt = n;
        self
    }

    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.negative_prompt = negative_prompt.into();
        self
    }

    pub fn with_prompt_extend(mut self, enabled: bool) -> Self {
        self.prompt_extend = enabled;
        self
    }

    pub fn with_watermark(mut self, enabled: bool) -> Self {
        self.watermark = enabled;
        self
    }

    pub fn with_api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = host.into();
        self
    }

    /// Overrides `https://{api_host}`, e.g. for a proxy or a local test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_poll_interval_secs(mut self, secs: f64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn with_max_transient_failures(mut self, max: u32) -> Self {
        self.max_transient_failures = Some(max);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.env_errors.is_empty() {
            return Err(DashScopeError::ConfigError(self.env_errors.join("; ")));
        }
        match &self.api_key {
            Some(key) if !key.trim().is_empty() => {}
            _ => return Err(DashScopeError::ConfigError("API key is required".into())),
        }
        if self.model.trim().is_empty() {
            return Err(DashScopeError::ConfigError("model is required".into()));
        }
        if self.size.trim().is_empty() {
            return Err(DashScopeError::ConfigError("size is required".into()));
        }
        if self.base_url.is_none() && self.api_host.trim().is_empty() {
            return Err(DashScopeError::ConfigError("API host is required".into()));
        }
        if !(1..=4).contains(&self.n_per_prompt) {
            return Err(DashScopeError::ConfigError(format!(
                "n_per_prompt must be between 1 and 4, got {}",
                self.n_per_prompt
            )));
        }
        if !(0.2..=10.0).contains(&self.poll_interval_secs) {
            return Err(DashScopeError::ConfigError(format!(
                "poll interval must be between 0.2 and 10.0 seconds, got {}",
                self.poll_interval_secs
            )));
        }
        if !(10..=600).contains(&self.timeout_secs) {
            return Err(DashScopeError::ConfigError(format!(
                "timeout must be between 10 and 600 seconds, got {}",
                self.timeout_secs
            )));
        }
        if self.concurrency == 0 {
            return Err(DashScopeError::ConfigError(
                "concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        match &self.base_url {
            Some(base_url) => Endpoint::new(base_url.as_str()),
            None => Endpoint::from_host(&self.api_host),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            model: self.model.clone(),
            size: self.size.clone(),
            n_per_prompt: self.n_per_prompt,
            negative_prompt: self.negative_prompt.clone(),
            prompt_extend: self.prompt_extend,
            watermark: self.watermark,
        }
    }
}

fn parse_var<T, F>(lookup: &F, name: &str, errors: &mut Vec<String>) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(format!("{} has an invalid value {:?}", name, raw));
            None
        }
    }
}

fn flag_var<F>(lookup: &F, name: &str, errors: &mut Vec<String>) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            errors.push(format!("{} must be true or false, got {:?}", name, raw));
            None
        }
    }
}
