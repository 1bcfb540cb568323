use std::env;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use galleria_contracts::config::DEFAULT_REQUEST_RETRIES;
use galleria_contracts::error::truncate_text;
use log::warn;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response as HttpResponse};
use reqwest::StatusCode;
use serde_json::Value;

const MAX_REQUEST_RETRIES: usize = 5;
// Gemini's free tier throttles per minute, so waits grow in whole seconds.
const RETRY_BACKOFF_S: f64 = 2.0;
const ERROR_BODY_MAX_CHARS: usize = 240;

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn first_non_empty_env(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| non_empty_env(key))
}

pub(crate) fn api_base_from_env(key: &str, default_base: &str) -> String {
    non_empty_env(key)
        .map(|value| value.trim_end_matches('/').to_string())
        .unwrap_or_else(|| default_base.to_string())
}

/// Blocking HTTP client with a fixed per-request timeout. Timeouts, refused
/// connections and throttling statuses are retried with linear backoff;
/// every other failure is returned at once.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
    timeout: Duration,
    max_retries: usize,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: HttpClient::new(),
            timeout,
            max_retries: DEFAULT_REQUEST_RETRIES,
        }
    }

    pub fn with_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries.min(MAX_REQUEST_RETRIES);
        self
    }

    fn backoff(&self, label: &str, attempt: usize, reason: &str) {
        warn!(
            "{label} retry {}/{} after {reason}",
            attempt + 1,
            self.max_retries
        );
        thread::sleep(Duration::from_secs_f64(RETRY_BACKOFF_S * (attempt as f64 + 1.0)));
    }

    /// Sends the request built by `build` and returns the parsed JSON body.
    pub fn post_json<F>(&self, label: &str, endpoint: &str, build: F) -> Result<Value>
    where
        F: Fn(&HttpClient) -> RequestBuilder,
    {
        let response = self.send_with_retries(label, endpoint, build)?;
        response_json_or_error(label, response)
    }

    fn send_with_retries<F>(
        &self,
        label: &str,
        endpoint: &str,
        build: F,
    ) -> Result<HttpResponse>
    where
        F: Fn(&HttpClient) -> RequestBuilder,
    {
        let mut attempt = 0usize;
        loop {
            let can_retry = attempt < self.max_retries;
            match build(&self.http).timeout(self.timeout).send() {
                Ok(response) if can_retry && is_throttling_status(response.status()) => {
                    self.backoff(label, attempt, &format!("HTTP {}", response.status().as_u16()));
                }
                Ok(response) => return Ok(response),
                Err(raw) => {
                    let err =
                        anyhow::Error::new(raw).context(format!("{label} request failed ({endpoint})"));
                    if !can_retry || !is_retryable_transport_error(&err) {
                        return Err(err);
                    }
                    self.backoff(label, attempt, "a transient transport failure");
                }
            }
            attempt += 1;
        }
    }
}

/// 429 and gateway errors are how Gemini and OpenAI signal load.
pub(crate) fn is_throttling_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// The `error.message` both providers put in failure bodies, or the raw body
/// when it has no such field.
pub(crate) fn provider_error_detail(body: &str) -> String {
    let message = serde_json::from_str::<Value>(body).ok().and_then(|parsed| {
        parsed
            .pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    truncate_text(message.as_deref().unwrap_or(body).trim(), ERROR_BODY_MAX_CHARS)
}

pub(crate) fn response_json_or_error(label: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{label} response body read failed"))?;
    if !status.is_success() {
        bail!("{label} request failed ({code}): {}", provider_error_detail(&body));
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{label} returned invalid JSON payload"))?;
    Ok(parsed)
}

/// Only failures that never reached the provider are worth repeating.
pub(crate) fn is_retryable_transport_error(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<reqwest::Error>())
        .any(|reqwest_err| reqwest_err.is_timeout() || reqwest_err.is_connect())
}
