use sqlx::types::Json;
use uuid::Uuid;

use vidpipe_core::state::PipelineState;
use vidpipe_core::status::{RecordStatus, Stage};
use vidpipe_core::types::Timestamp;

/// One row of the `pipeline_records` table.
///
/// `status` is the caller-facing verdict; `stage` mirrors the tag of
/// the `pipeline` state document so the scan loops can select work
/// without deserializing JSON.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PipelineRecord {
    pub id: Uuid,
    pub request_id: String,
    pub owner_id: Option<String>,
    pub model_name: String,
    pub prompt: String,
    pub thumb_url: Option<String>,
    pub output_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: RecordStatus,
    #[sqlx(try_from = "String")]
    pub stage: Stage,
    pub pipeline: Json<PipelineState>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PipelineRecord {
    /// Borrow the pipeline state document.
    pub fn state(&self) -> &PipelineState {
        &self.pipeline.0
    }
}
