//! Request execution against the HCaaS proxy.
//!
//! The platform serializes mutating operations on the same target behind an
//! event lock. While the lock is held, requests fail with a 5xx whose body
//! contains [`EVENT_LOCKED_MARKER`] (or a transport error carrying the same
//! text). Those are retried with exponential backoff until the deadline;
//! any other 4xx/5xx is a real application error and fails immediately.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, warn};

use crate::error::{HcaasError, Result, error_chain};

pub const EVENT_LOCKED_MARKER: &str = "event locked";

/// Reserved out of every operation timeout for plugin-host round trips.
pub const DEADLINE_SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// Retry budget for an operation with the given timeout.
pub fn deadline_for(operation_timeout: Duration) -> Duration {
    operation_timeout.saturating_sub(DEADLINE_SAFETY_MARGIN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): doubles, capped at `max_delay`.
    pub fn delay(&self, retry: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2_u32.saturating_pow(retry.min(16)))
            .min(self.max_delay)
    }
}

/// A request that can be sent any number of times: the body is kept as bytes
/// and a fresh HTTP request is built for each attempt.
#[derive(Debug, Clone)]
pub struct LockedRequest {
    method: Method,
    url: String,
    token: String,
    body: Option<Vec<u8>>,
    accept_json: bool,
}

impl LockedRequest {
    pub fn new(method: Method, url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            token: token.into(),
            body: None,
            accept_json: false,
        }
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body).map_err(|e| HcaasError::Encode(e.to_string()))?;
        self.body = Some(bytes);
        Ok(self)
    }

    pub fn accept_json(mut self) -> Self {
        self.accept_json = true;
        self
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    fn build(&self, http: &Client) -> reqwest::RequestBuilder {
        let mut req = http
            .request(self.method.clone(), &self.url)
            .header("Authorization", &self.token);
        if self.accept_json {
            req = req.header("Accept", "application/json");
        }
        if let Some(body) = &self.body {
            req = req
                .header("Content-Type", "application/json")
                .body(body.clone());
        }
        req
    }
}

/// Maps a completed response to the attempt result. Lock conflicts come
/// back as [`HcaasError::LockConflict`].
pub fn classify_status(status: StatusCode, body: &str) -> Result<()> {
    let code = status.as_u16();
    if code >= 500 && body.contains(EVENT_LOCKED_MARKER) {
        return Err(HcaasError::LockConflict(format!("status {code}: {}", body.trim())));
    }
    if code >= 400 {
        return Err(HcaasError::api(code, body));
    }
    Ok(())
}

pub fn classify_transport(message: String) -> HcaasError {
    if message.contains(EVENT_LOCKED_MARKER) {
        HcaasError::LockConflict(message)
    } else {
        HcaasError::Transport(message)
    }
}

#[derive(Clone)]
pub struct LockedExecutor {
    http: Client,
    policy: RetryPolicy,
}

impl LockedExecutor {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sends `request` until it succeeds, fails with a non-lock error, or
    /// `deadline` elapses. Every attempt is cut off at the deadline.
    pub async fn execute(&self, request: &LockedRequest, deadline: Duration) -> Result<()> {
        let started = Instant::now();
        let mut attempts = 0u32;
        let mut last = String::from("deadline elapsed before the first attempt");

        loop {
            let remaining = deadline.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(HcaasError::Timeout {
                    waited: started.elapsed(),
                    attempts,
                    last,
                });
            }

            attempts += 1;
            debug!(method = %request.method, url = %request.url, attempt = attempts, "Sending request");

            let result = match timeout(remaining, self.attempt(request)).await {
                Ok(result) => result,
                Err(_) => {
                    last = format!("attempt {attempts} was still running at the deadline");
                    continue;
                }
            };

            match result {
                Ok(()) => {
                    debug!(method = %request.method, attempts, "Request succeeded");
                    return Ok(());
                }
                Err(conflict) if conflict.is_retryable() => {
                    let delay = self
                        .policy
                        .delay(attempts - 1)
                        .min(deadline.saturating_sub(started.elapsed()));
                    warn!(
                        method = %request.method,
                        attempt = attempts,
                        retry_in = ?delay,
                        reason = %conflict,
                        "Target is event locked, retrying"
                    );
                    last = conflict.to_string();
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Single attempt without lock handling. Returns the body of a
    /// successful response.
    pub async fn fetch(&self, request: &LockedRequest) -> Result<String> {
        let resp = request
            .build(&self.http)
            .send()
            .await
            .map_err(|e| HcaasError::Transport(error_chain(&e)))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| HcaasError::Transport(error_chain(&e)))?;
        if status.as_u16() >= 400 {
            return Err(HcaasError::api(status.as_u16(), &body));
        }
        Ok(body)
    }

    async fn attempt(&self, request: &LockedRequest) -> Result<()> {
        let resp = request
            .build(&self.http)
            .send()
            .await
            .map_err(|e| classify_transport(error_chain(&e)))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| classify_transport(error_chain(&e)))?;
        classify_status(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_reserves_one_minute() {
        assert_eq!(deadline_for(Duration::from_secs(120)), Duration::from_secs(60));
        assert_eq!(deadline_for(Duration::from_secs(30)), Duration::ZERO);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(800));
        assert_eq!(policy.delay(7), Duration::from_secs(10));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_classify_locked_server_error_retries() {
        let outcome = classify_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"event locked: healthcheck my-hc"}"#,
        );
        assert!(matches!(outcome, Err(HcaasError::LockConflict(_))));
    }

    #[test]
    fn test_classify_marker_on_client_error_is_fatal() {
        let outcome = classify_status(StatusCode::CONFLICT, "event locked");
        assert!(matches!(outcome, Err(HcaasError::Api { status: 409, .. })));
    }

    #[test]
    fn test_classify_server_error_without_marker_is_fatal() {
        let outcome = classify_status(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(outcome, Err(HcaasError::Api { status: 502, .. })));
    }

    #[test]
    fn test_classify_success_statuses() {
        for status in [StatusCode::OK, StatusCode::CREATED, StatusCode::NO_CONTENT, StatusCode::FOUND] {
            assert!(classify_status(status, "").is_ok());
        }
    }

    #[test]
    fn test_classify_transport_messages() {
        assert!(classify_transport("proxy error: event locked".into()).is_retryable());
        assert!(matches!(
            classify_transport("connection refused".into()),
            HcaasError::Transport(_)
        ));
    }

    #[test]
    fn test_request_keeps_body_for_replay() {
        let req = LockedRequest::new(Method::POST, "http://h/x", "tok")
            .json(&serde_json::json!({"group": "ops"}))
            .unwrap();
        assert_eq!(req.body(), Some(br#"{"group":"ops"}"#.as_slice()));
        let http = Client::new();
        let first = req.build(&http).build().unwrap();
        let second = req.build(&http).build().unwrap();
        assert_eq!(
            first.body().and_then(|b| b.as_bytes()),
            second.body().and_then(|b| b.as_bytes())
        );
        assert_eq!(first.headers()["Authorization"], "tok");
    }
}
