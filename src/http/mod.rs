#[cfg(test)]
mod tests;

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};
use url::Url;

use crate::{RagError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Blocking JSON client shared by the service gateways.
///
/// Failures are classified into [`RagError`] variants: transport problems and
/// 5xx responses become `BackendUnavailable`, 404 becomes `NotFound`, and any
/// other client error or unparseable body becomes `InvalidInput`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    service: &'static str,
    agent: ureq::Agent,
    retry_attempts: u32,
    backoff_base_ms: u64,
}

impl HttpClient {
    /// Create a client for the named service; a single attempt per request
    #[inline]
    pub fn new(service: &'static str) -> Self {
        Self {
            service,
            agent: build_agent(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)),
            retry_attempts: 1,
            backoff_base_ms: 1000,
        }
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Base delay before the first retry; doubles on each further attempt
    #[inline]
    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.backoff_base_ms = base.as_millis() as u64;
        self
    }

    #[inline]
    pub fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let text = self.request_with_retry(url, || {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;
        self.parse(url, &text)
    }

    #[inline]
    pub fn post_json<B: Serialize, T: DeserializeOwned>(&self, url: &Url, body: &B) -> Result<T> {
        let body = self.serialize(body)?;
        let text = self.request_with_retry(url, || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&body)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;
        self.parse(url, &text)
    }

    #[inline]
    pub fn put_json<B: Serialize, T: DeserializeOwned>(&self, url: &Url, body: &B) -> Result<T> {
        let body = self.serialize(body)?;
        let text = self.request_with_retry(url, || {
            self.agent
                .put(url.as_str())
                .header("Content-Type", "application/json")
                .send(&body)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;
        self.parse(url, &text)
    }

    #[inline]
    pub fn delete(&self, url: &Url) -> Result<()> {
        self.request_with_retry(url, || {
            self.agent
                .delete(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;
        Ok(())
    }

    fn serialize<B: Serialize>(&self, body: &B) -> Result<String> {
        serde_json::to_string(body).map_err(|e| {
            RagError::InvalidInput(format!("Failed to serialize {} request: {}", self.service, e))
        })
    }

    fn parse<T: DeserializeOwned>(&self, url: &Url, text: &str) -> Result<T> {
        serde_json::from_str(text).map_err(|e| {
            RagError::InvalidInput(format!(
                "Unexpected {} response from {}: {}",
                self.service, url, e
            ))
        })
    }

    fn request_with_retry<F>(&self, url: &Url, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> std::result::Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!(
                "{} request to {} (attempt {}/{})",
                self.service, url, attempt, self.retry_attempts
            );

            match request_fn() {
                Ok(text) => return Ok(text),
                Err(e) => {
                    let error = classify(self.service, url, &e);
                    if !error.is_unavailable() {
                        warn!("{} request to {} failed: {}", self.service, url, error);
                        return Err(error);
                    }

                    warn!(
                        "{} unavailable: {}, attempt {}/{}",
                        self.service, e, attempt, self.retry_attempts
                    );
                    last_error = Some(error);

                    if attempt < self.retry_attempts {
                        let delay = Duration::from_millis(
                            EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * self.backoff_base_ms,
                        );
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        if self.retry_attempts > 1 {
            error!("All retry attempts failed for {} at {}", self.service, url);
        }

        Err(last_error.unwrap_or_else(|| {
            RagError::BackendUnavailable(format!("{} request to {} failed", self.service, url))
        }))
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Map a transport or status error onto the gateway error taxonomy
#[inline]
pub fn classify(service: &str, url: &Url, error: &ureq::Error) -> RagError {
    match error {
        ureq::Error::StatusCode(404) => {
            RagError::NotFound(format!("{} returned HTTP 404 for {}", service, url))
        }
        ureq::Error::StatusCode(status) if *status >= 500 => RagError::BackendUnavailable(
            format!("{} returned HTTP {} for {}", service, status, url),
        ),
        ureq::Error::StatusCode(status) => {
            RagError::InvalidInput(format!("{} rejected request to {}: HTTP {}", service, url, status))
        }
        ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound
        | ureq::Error::Timeout(_)
        | ureq::Error::Io(_) => RagError::BackendUnavailable(format!(
            "{} is unreachable at {}: {}",
            service, url, error
        )),
        other => RagError::InvalidInput(format!("{} request to {} failed: {}", service, url, other)),
    }
}
