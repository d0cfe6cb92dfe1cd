/// Errors from the provider client layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Caller-supplied parameters violate the client's contract.
    /// Raised before any network call is made.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// The provider rejected the submission with a non-2xx status.
    /// Carries the raw response body for diagnostics.
    #[error("Submission rejected ({status}): {body}")]
    Submission { status: u16, body: String },

    /// The provider accepted the submission but returned no job id.
    #[error("Submission accepted but no job id in response: {body}")]
    MissingJobId { body: String },

    /// The network call exceeded its timeout.
    #[error("Provider {operation} timed out after {timeout_secs}s")]
    Timeout {
        operation: &'static str,
        timeout_secs: u64,
    },

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body could not be parsed as the expected shape.
    #[error("Provider response could not be parsed: {0}")]
    Malformed(String),
}
