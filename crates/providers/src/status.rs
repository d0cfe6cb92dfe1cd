//! Normalized job status vocabulary.
//!
//! Providers disagree on naming (`created/processing/completed/failed`
//! versus `PENDING/RUNNING/SUCCEEDED/FAILED`); everything downstream of
//! the client layer sees only this enum.

use serde::{Deserialize, Serialize};

/// Normalized lifecycle of one external job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    /// The provider's answer could not be obtained or understood this
    /// round. Non-terminal: callers retry on the next scan.
    Unknown,
}

impl JobStatus {
    /// Map a provider status string (either vocabulary, any case) onto
    /// the normalized set. Unrecognized strings become [`Self::Unknown`].
    pub fn from_provider(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "created" | "queued" | "pending" => Self::Queued,
            "processing" | "running" => Self::Running,
            "completed" | "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Outcome of one result query against a provider.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub status: JobStatus,
    pub outputs: Vec<String>,
    pub error: Option<String>,
}

impl JobResult {
    /// A non-terminal result standing in for an unreadable answer.
    pub fn unknown(error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Unknown,
            outputs: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// First non-empty output URL, if any.
    pub fn first_output(&self) -> Option<&str> {
        self.outputs
            .iter()
            .map(String::as_str)
            .find(|url| !url.is_empty())
    }
}
