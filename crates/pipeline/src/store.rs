//! Persistence seam for pipeline records.
//!
//! The runner and scheduler talk to [`RecordStore`] rather than the
//! repository directly, so tests can drive them against an in-memory
//! store. [`PgRecordStore`] is the production implementation.

use async_trait::async_trait;

use vidpipe_core::state::PipelineState;
use vidpipe_core::status::Stage;
use vidpipe_db::models::PipelineRecord;
use vidpipe_db::repositories::{NewPipelineRecord, PipelineRecordRepo};
use vidpipe_db::DbPool;

use crate::error::PipelineError;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create or refresh the record keyed on its request id.
    async fn upsert(&self, new: &NewPipelineRecord) -> Result<PipelineRecord, PipelineError>;

    async fn find_by_request_id(
        &self,
        request_id: &str,
    ) -> Result<Option<PipelineRecord>, PipelineError>;

    /// Oldest-first in-flight records at the given stage.
    async fn find_processing_by_stage(
        &self,
        stage: Stage,
        limit: i64,
    ) -> Result<Vec<PipelineRecord>, PipelineError>;

    /// All transition methods return false when the record was no
    /// longer at the expected stage, which the caller treats as
    /// "someone else got there first".
    async fn advance_to_upscaling(
        &self,
        request_id: &str,
        state: &PipelineState,
    ) -> Result<bool, PipelineError>;

    async fn mark_completed(
        &self,
        request_id: &str,
        expected_stage: Stage,
        state: &PipelineState,
        output_url: &str,
    ) -> Result<bool, PipelineError>;

    async fn mark_degraded(
        &self,
        request_id: &str,
        expected_stage: Stage,
        state: &PipelineState,
        fallback_output_url: Option<&str>,
    ) -> Result<bool, PipelineError>;

    async fn mark_failed(
        &self,
        request_id: &str,
        expected_stage: Stage,
        state: &PipelineState,
    ) -> Result<bool, PipelineError>;
}

/// Postgres-backed store delegating to the record repository.
pub struct PgRecordStore {
    pool: DbPool,
}

impl PgRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn upsert(&self, new: &NewPipelineRecord) -> Result<PipelineRecord, PipelineError> {
        Ok(PipelineRecordRepo::upsert(&self.pool, new).await?)
    }

    async fn find_by_request_id(
        &self,
        request_id: &str,
    ) -> Result<Option<PipelineRecord>, PipelineError> {
        Ok(PipelineRecordRepo::find_by_request_id(&self.pool, request_id).await?)
    }

    async fn find_processing_by_stage(
        &self,
        stage: Stage,
        limit: i64,
    ) -> Result<Vec<PipelineRecord>, PipelineError> {
        Ok(PipelineRecordRepo::find_processing_by_stage(&self.pool, stage, limit).await?)
    }

    async fn advance_to_upscaling(
        &self,
        request_id: &str,
        state: &PipelineState,
    ) -> Result<bool, PipelineError> {
        Ok(PipelineRecordRepo::advance_to_upscaling(&self.pool, request_id, state).await?)
    }

    async fn mark_completed(
        &self,
        request_id: &str,
        expected_stage: Stage,
        state: &PipelineState,
        output_url: &str,
    ) -> Result<bool, PipelineError> {
        Ok(PipelineRecordRepo::mark_completed(
            &self.pool,
            request_id,
            expected_stage,
            state,
            output_url,
        )
        .await?)
    }

    async fn mark_degraded(
        &self,
        request_id: &str,
        expected_stage: Stage,
        state: &PipelineState,
        fallback_output_url: Option<&str>,
    ) -> Result<bool, PipelineError> {
        Ok(PipelineRecordRepo::mark_degraded(
            &self.pool,
            request_id,
            expected_stage,
            state,
            fallback_output_url,
        )
        .await?)
    }

    async fn mark_failed(
        &self,
        request_id: &str,
        expected_stage: Stage,
        state: &PipelineState,
    ) -> Result<bool, PipelineError> {
        Ok(PipelineRecordRepo::mark_failed(&self.pool, request_id, expected_stage, state).await?)
    }
}
