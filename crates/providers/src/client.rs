//! Shared HTTP transport for the prediction API.
//!
//! All model clients go through [`PredictionClient`]: a bearer-authed
//! POST to a model-specific path for submission, and a GET against the
//! generic `predictions/{id}/result` endpoint for status. Submission
//! failures are hard errors; result-query failures are soft (mapped to
//! [`JobStatus::Unknown`]) so transient network trouble reads as "not
//! yet decided" instead of failing the record.

use std::time::Duration;

use crate::error::ProviderError;
use crate::status::{JobResult, JobStatus};

/// Default submission timeout.
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(20);

/// Submission timeout for heavier payloads (video inputs).
pub const SUBMIT_TIMEOUT_HEAVY: Duration = Duration::from_secs(30);

/// Timeout for result queries.
const RESULT_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP client for one prediction-API account.
pub struct PredictionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PredictionClient {
    /// Create a new client against the given API base URL.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (connection pooling across the model clients).
    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Submit a job payload to a model path, returning the provider's
    /// job id from the `{ data: { id } }` envelope.
    pub async fn submit(
        &self,
        path: &str,
        payload: &serde_json::Value,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        let started = std::time::Instant::now();
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| Self::classify_transport(e, "submit", timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        tracing::debug!(
            path,
            status = status.as_u16(),
            cost_ms = started.elapsed().as_millis() as u64,
            "Submission request finished"
        );

        if !status.is_success() {
            return Err(ProviderError::Submission {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Malformed(format!("submit response: {e}")))?;
        match extract_job_id(&json) {
            Some(id) => Ok(id.to_string()),
            None => Err(ProviderError::MissingJobId { body }),
        }
    }

    /// Query the generic result endpoint for a job.
    ///
    /// Transport failures, non-2xx answers, and unparseable bodies all
    /// come back as a [`JobStatus::Unknown`] result rather than an error.
    pub async fn result(&self, job_id: &str) -> Result<JobResult, ProviderError> {
        let response = self
            .http
            .get(format!("{}/predictions/{}/result", self.base_url, job_id))
            .bearer_auth(&self.api_key)
            .timeout(RESULT_TIMEOUT)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(job_id, error = %e, "Result query failed; treating as undecided");
                return Ok(JobResult::unknown(format!("result query failed: {e}")));
            }
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        if !status.is_success() {
            tracing::warn!(
                job_id,
                status = status.as_u16(),
                "Result query rejected; treating as undecided"
            );
            return Ok(JobResult::unknown(format!(
                "result query rejected ({status}): {body}",
                status = status.as_u16()
            )));
        }

        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(json) => Ok(parse_result_envelope(&json)),
            Err(e) => Ok(JobResult::unknown(format!("unparseable result body: {e}"))),
        }
    }

    fn classify_transport(
        e: reqwest::Error,
        operation: &'static str,
        timeout: Duration,
    ) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout {
                operation,
                timeout_secs: timeout.as_secs(),
            }
        } else {
            ProviderError::Transport(e)
        }
    }
}

/// Pull the job id out of a `{ data: { id } }` submit envelope.
fn extract_job_id(json: &serde_json::Value) -> Option<&str> {
    json.pointer("/data/id")
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.is_empty())
}

/// Normalize a `{ data: { status, outputs, error } }` result envelope.
fn parse_result_envelope(json: &serde_json::Value) -> JobResult {
    let data = match json.get("data") {
        Some(data) => data,
        None => return JobResult::unknown("result envelope missing 'data'"),
    };

    let status = data
        .get("status")
        .and_then(serde_json::Value::as_str)
        .map(JobStatus::from_provider)
        .unwrap_or(JobStatus::Unknown);

    let outputs = data
        .get("outputs")
        .and_then(serde_json::Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let error = data
        .get("error")
        .and_then(serde_json::Value::as_str)
        .filter(|msg| !msg.is_empty())
        .map(str::to_string);

    JobResult {
        status,
        outputs,
        error,
    }
}
