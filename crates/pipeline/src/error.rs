use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    Validation(String),

    /// Submission failed after the record was persisted. The record id
    /// lets the caller retry against the same row.
    #[error("submission failed for record {record_id} (recorded, retryable): {message}")]
    Submission { record_id: String, message: String },

    #[error(transparent)]
    Provider(#[from] vidpipe_providers::ProviderError),

    #[error(transparent)]
    State(#[from] vidpipe_core::error::CoreError),

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Poll(#[from] vidpipe_core::poll::PollError),
}

impl From<vidpipe_db::DbError> for PipelineError {
    fn from(e: vidpipe_db::DbError) -> Self {
        Self::Store(e.to_string())
    }
}
