//! Submission path of the commercial pipeline.
//!
//! The runner owns the synchronous part of a run: validate, enhance,
//! submit the primary job, and persist exactly one record. Everything
//! after that belongs to the reconciliation scheduler. Its guarantee:
//! every call leaves one persisted record behind, processing or failed,
//! so the caller always has something to track or retry.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use vidpipe_core::poll::{poll_until, PollOptions, PollOutcome};
use vidpipe_core::request_id;
use vidpipe_core::state::PipelineState;
use vidpipe_core::status::RecordStatus;
use vidpipe_db::models::PipelineRecord;
use vidpipe_db::repositories::NewPipelineRecord;
use vidpipe_providers::enhance::{EnhanceRequest, PromptEnhancer};
use vidpipe_providers::job::{VideoGenTask, VideoGenerator};

use crate::error::PipelineError;
use crate::request::GenerationRequest;
use crate::store::RecordStore;

pub struct PipelineRunner {
    store: Arc<dyn RecordStore>,
    generator: Arc<dyn VideoGenerator>,
    enhancer: Option<Arc<dyn PromptEnhancer>>,
    model_name: String,
}

impl PipelineRunner {
    pub fn new(
        store: Arc<dyn RecordStore>,
        generator: Arc<dyn VideoGenerator>,
        enhancer: Option<Arc<dyn PromptEnhancer>>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            generator,
            enhancer,
            model_name: model_name.into(),
        }
    }

    /// Run one submission end to end.
    ///
    /// On submission failure the record is persisted as failed before
    /// the error is returned, and the error names the record id so the
    /// caller can retry against the same row.
    pub async fn submit(
        &self,
        req: &GenerationRequest,
    ) -> Result<PipelineRecord, PipelineError> {
        let (duration, upscale_mode) = req.validate()?;

        // A retry reuses its previous request id and takes over the row.
        let request_id = match &req.request_id {
            Some(id) => id.clone(),
            None => request_id::synthesize(req.tx_hash.as_deref(), chrono::Utc::now()),
        };

        tracing::info!(
            %request_id,
            model = %self.model_name,
            duration,
            upscale = %upscale_mode,
            "Starting pipeline run"
        );

        let (video_prompt, start_frame) = self.enhanced_inputs(req, duration).await;

        match self
            .generator
            .submit(&VideoGenTask {
                prompt: video_prompt.clone(),
                start_frame: start_frame.clone(),
                duration,
                seed: None,
                negative_prompt: None,
            })
            .await
        {
            Ok(primary_job_id) => {
                tracing::info!(%request_id, %primary_job_id, "Primary job accepted");
                let state = PipelineState::submitted(
                    video_prompt,
                    start_frame,
                    primary_job_id,
                    upscale_mode,
                );
                let record = self
                    .store
                    .upsert(&self.new_record(req, &request_id, RecordStatus::Processing, state))
                    .await?;
                Ok(record)
            }
            Err(e) => {
                tracing::error!(%request_id, error = %e, "Primary submission failed");
                let state = PipelineState::failed(e.to_string(), None);
                self.store
                    .upsert(&self.new_record(req, &request_id, RecordStatus::Failed, state))
                    .await?;
                Err(PipelineError::Submission {
                    record_id: request_id,
                    message: e.to_string(),
                })
            }
        }
    }

    /// Block until the record reaches a terminal status.
    ///
    /// Synchronous counterpart to the background scans, for call sites
    /// that need the final record in hand.
    pub async fn wait_for_record(
        &self,
        request_id: &str,
        opts: &PollOptions,
        cancel: &CancellationToken,
    ) -> Result<PipelineRecord, PipelineError> {
        let record = poll_until(request_id, opts, cancel, |_| {
            let store = Arc::clone(&self.store);
            let request_id = request_id.to_string();
            async move {
                let record = store
                    .find_by_request_id(&request_id)
                    .await
                    .map_err(|e| -> vidpipe_core::poll::CheckError { Box::new(e) })?;
                match record {
                    Some(record) if record.status != RecordStatus::Processing => {
                        Ok(PollOutcome::Ready(record))
                    }
                    Some(record) => Ok(PollOutcome::Pending {
                        status: record.status.as_str().to_string(),
                    }),
                    None => Err(format!("record {request_id} disappeared").into()),
                }
            }
        })
        .await?;
        Ok(record)
    }

    /// Enhancement is advisory: any failure logs a warning and the run
    /// proceeds with the caller's original inputs.
    async fn enhanced_inputs(&self, req: &GenerationRequest, duration: u32) -> (String, String) {
        let original = (req.prompt.clone(), req.image.clone());
        if !req.enhance {
            return original;
        }
        let Some(enhancer) = &self.enhancer else {
            return original;
        };

        match enhancer
            .enhance(&EnhanceRequest {
                prompt: req.prompt.clone(),
                image: req.image.clone(),
                voice_id: req.voice_id.clone(),
                duration,
            })
            .await
        {
            Ok(enhanced) => (enhanced.video_prompt, enhanced.start_frame),
            Err(e) => {
                tracing::warn!(error = %e, "Enhancement failed; proceeding with original inputs");
                original
            }
        }
    }

    fn new_record(
        &self,
        req: &GenerationRequest,
        request_id: &str,
        status: RecordStatus,
        state: PipelineState,
    ) -> NewPipelineRecord {
        NewPipelineRecord {
            request_id: request_id.to_string(),
            owner_id: req.owner_id.clone(),
            model_name: self.model_name.clone(),
            prompt: req.prompt.clone(),
            thumb_url: Some(req.image.clone()),
            status,
            state,
        }
    }
}
