//! Repository for pipeline records.
//!
//! Creation is an upsert keyed on `request_id`, so a retried submission
//! refreshes the existing row instead of duplicating it. Every stage
//! transition carries its expected current stage in the WHERE clause;
//! a concurrent or repeated transition simply matches zero rows.

use sqlx::types::Json;

use vidpipe_core::state::PipelineState;
use vidpipe_core::status::{RecordStatus, Stage};

use crate::error::DbError;
use crate::models::PipelineRecord;
use crate::DbPool;

const COLUMNS: &str = "id, request_id, owner_id, model_name, prompt, thumb_url, \
     output_url, status, stage, pipeline, created_at, updated_at";

/// Inputs for creating (or refreshing) a record.
#[derive(Debug, Clone)]
pub struct NewPipelineRecord {
    pub request_id: String,
    pub owner_id: Option<String>,
    pub model_name: String,
    pub prompt: String,
    pub thumb_url: Option<String>,
    pub status: RecordStatus,
    pub state: PipelineState,
}

pub struct PipelineRecordRepo;

impl PipelineRecordRepo {
    /// Insert a record, or refresh the row if the request id already
    /// exists (a retried submission takes over the old row).
    pub async fn upsert(pool: &DbPool, new: &NewPipelineRecord) -> Result<PipelineRecord, DbError> {
        let query = format!(
            "INSERT INTO pipeline_records \
                (request_id, owner_id, model_name, prompt, thumb_url, status, stage, pipeline) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (request_id) DO UPDATE SET \
                owner_id = EXCLUDED.owner_id, \
                model_name = EXCLUDED.model_name, \
                prompt = EXCLUDED.prompt, \
                thumb_url = EXCLUDED.thumb_url, \
                output_url = NULL, \
                status = EXCLUDED.status, \
                stage = EXCLUDED.stage, \
                pipeline = EXCLUDED.pipeline, \
                updated_at = now() \
             RETURNING {COLUMNS}"
        );
        let record = sqlx::query_as::<_, PipelineRecord>(&query)
            .bind(&new.request_id)
            .bind(&new.owner_id)
            .bind(&new.model_name)
            .bind(&new.prompt)
            .bind(&new.thumb_url)
            .bind(new.status.as_str())
            .bind(new.state.stage().as_str())
            .bind(Json(&new.state))
            .fetch_one(pool)
            .await?;
        Ok(record)
    }

    pub async fn find_by_request_id(
        pool: &DbPool,
        request_id: &str,
    ) -> Result<Option<PipelineRecord>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM pipeline_records WHERE request_id = $1");
        let record = sqlx::query_as::<_, PipelineRecord>(&query)
            .bind(request_id)
            .fetch_optional(pool)
            .await?;
        Ok(record)
    }

    /// Oldest-first batch of in-flight records at the given stage.
    pub async fn find_processing_by_stage(
        pool: &DbPool,
        stage: Stage,
        limit: i64,
    ) -> Result<Vec<PipelineRecord>, DbError> {
        let query = format!(
            "SELECT {COLUMNS} FROM pipeline_records \
             WHERE status = $1 AND stage = $2 \
             ORDER BY created_at ASC \
             LIMIT $3"
        );
        let records = sqlx::query_as::<_, PipelineRecord>(&query)
            .bind(RecordStatus::Processing.as_str())
            .bind(stage.as_str())
            .bind(limit)
            .fetch_all(pool)
            .await?;
        Ok(records)
    }

    /// Move a submitted record into the upscaling stage.
    ///
    /// Returns false when the record was no longer at `submitted`,
    /// meaning some other pass already advanced it.
    pub async fn advance_to_upscaling(
        pool: &DbPool,
        request_id: &str,
        state: &PipelineState,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE pipeline_records \
             SET stage = $3, pipeline = $4, updated_at = now() \
             WHERE request_id = $1 AND stage = $2",
        )
        .bind(request_id)
        .bind(Stage::Submitted.as_str())
        .bind(Stage::Upscaling.as_str())
        .bind(Json(state))
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Finish a record successfully, recording its output URL.
    pub async fn mark_completed(
        pool: &DbPool,
        request_id: &str,
        expected_stage: Stage,
        state: &PipelineState,
        output_url: &str,
    ) -> Result<bool, DbError> {
        Self::finish(
            pool,
            request_id,
            expected_stage,
            state,
            RecordStatus::Completed,
            Some(output_url),
        )
        .await
    }

    /// Finish a degraded record: the upscale failed but the primary
    /// render survived, so the record still completes with the
    /// fallback output.
    pub async fn mark_degraded(
        pool: &DbPool,
        request_id: &str,
        expected_stage: Stage,
        state: &PipelineState,
        fallback_output_url: Option<&str>,
    ) -> Result<bool, DbError> {
        Self::finish(
            pool,
            request_id,
            expected_stage,
            state,
            RecordStatus::Completed,
            fallback_output_url,
        )
        .await
    }

    /// Finish a record as failed; the error lives in the state document.
    pub async fn mark_failed(
        pool: &DbPool,
        request_id: &str,
        expected_stage: Stage,
        state: &PipelineState,
    ) -> Result<bool, DbError> {
        Self::finish(
            pool,
            request_id,
            expected_stage,
            state,
            RecordStatus::Failed,
            None,
        )
        .await
    }

    async fn finish(
        pool: &DbPool,
        request_id: &str,
        expected_stage: Stage,
        state: &PipelineState,
        status: RecordStatus,
        output_url: Option<&str>,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE pipeline_records \
             SET status = $3, stage = $4, pipeline = $5, output_url = $6, updated_at = now() \
             WHERE request_id = $1 AND stage = $2",
        )
        .bind(request_id)
        .bind(expected_stage.as_str())
        .bind(status.as_str())
        .bind(state.stage().as_str())
        .bind(Json(state))
        .bind(output_url)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
