//! Background reconciliation of in-flight pipeline records.
//!
//! Two scans, one per stage. Each scan is a single owned loop: one
//! tick finishes before the next begins, so a slow provider cannot
//! stack concurrent passes over the same rows. Within a tick, records
//! are processed concurrently and a failure on one record never aborts
//! the batch.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use vidpipe_core::state::PipelineState;
use vidpipe_core::status::Stage;
use vidpipe_db::models::PipelineRecord;
use vidpipe_providers::job::{VideoGenerator, VideoUpscaler};
use vidpipe_providers::JobStatus;

use crate::error::PipelineError;
use crate::store::RecordStore;

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Tick interval of the stage-1 (submitted) scan.
    pub submitted_interval: Duration,
    /// Tick interval of the stage-2 (upscaling) scan.
    pub upscaling_interval: Duration,
    /// Maximum records pulled per tick per scan.
    pub batch_size: i64,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            submitted_interval: Duration::from_secs(30),
            upscaling_interval: Duration::from_secs(30),
            batch_size: 20,
        }
    }
}

/// What one scan pass did, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub scanned: usize,
    /// Records moved into the upscaling stage.
    pub advanced: usize,
    pub completed: usize,
    /// Records finished on the fallback output.
    pub degraded: usize,
    pub failed: usize,
    /// Records left untouched (still running or undecided).
    pub pending: usize,
    /// Per-record errors, logged and swallowed.
    pub errors: usize,
}

/// Outcome of reconciling a single record.
enum Advance {
    Advanced,
    Completed,
    Degraded,
    Failed,
    Pending,
}

pub struct ReconciliationScheduler {
    store: Arc<dyn RecordStore>,
    generator: Arc<dyn VideoGenerator>,
    upscaler: Arc<dyn VideoUpscaler>,
    opts: SchedulerOptions,
}

impl ReconciliationScheduler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        generator: Arc<dyn VideoGenerator>,
        upscaler: Arc<dyn VideoUpscaler>,
        opts: SchedulerOptions,
    ) -> Self {
        Self {
            store,
            generator,
            upscaler,
            opts,
        }
    }

    /// Drive the stage-1 scan until cancelled.
    pub async fn run_submitted_loop(self: Arc<Self>, cancel: CancellationToken) {
        self.run_loop("submitted-scan", self.opts.submitted_interval, cancel, |s| {
            Box::pin(async move { s.scan_submitted_once().await })
        })
        .await;
    }

    /// Drive the stage-2 scan until cancelled.
    pub async fn run_upscaling_loop(self: Arc<Self>, cancel: CancellationToken) {
        self.run_loop("upscaling-scan", self.opts.upscaling_interval, cancel, |s| {
            Box::pin(async move { s.scan_upscaling_once().await })
        })
        .await;
    }

    async fn run_loop<F>(
        self: &Arc<Self>,
        name: &'static str,
        period: Duration,
        cancel: CancellationToken,
        scan: F,
    ) where
        F: Fn(
            Arc<Self>,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<ScanSummary, PipelineError>> + Send>,
        >,
    {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(scan = name, period_secs = period.as_secs(), "Scan loop started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(scan = name, "Scan loop stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            match scan(Arc::clone(self)).await {
                Ok(summary) if summary.scanned > 0 => {
                    tracing::info!(
                        scan = name,
                        scanned = summary.scanned,
                        advanced = summary.advanced,
                        completed = summary.completed,
                        degraded = summary.degraded,
                        failed = summary.failed,
                        errors = summary.errors,
                        "Scan pass finished"
                    );
                }
                Ok(_) => {}
                // A failed batch read; the next tick retries.
                Err(e) => tracing::error!(scan = name, error = %e, "Scan pass failed"),
            }
        }
    }

    /// One pass over `stage=submitted` records: resolve primary jobs.
    pub async fn scan_submitted_once(&self) -> Result<ScanSummary, PipelineError> {
        let records = self
            .store
            .find_processing_by_stage(Stage::Submitted, self.opts.batch_size)
            .await?;
        let results = join_all(
            records
                .iter()
                .map(|record| self.reconcile_submitted(record)),
        )
        .await;
        Ok(summarize(&records, results))
    }

    /// One pass over `stage=upscaling` records: resolve secondary jobs.
    pub async fn scan_upscaling_once(&self) -> Result<ScanSummary, PipelineError> {
        let records = self
            .store
            .find_processing_by_stage(Stage::Upscaling, self.opts.batch_size)
            .await?;
        let results = join_all(
            records
                .iter()
                .map(|record| self.reconcile_upscaling(record)),
        )
        .await;
        Ok(summarize(&records, results))
    }

    async fn reconcile_submitted(&self, record: &PipelineRecord) -> Result<Advance, PipelineError> {
        let PipelineState::Submitted {
            primary_job_id,
            upscale_mode,
            ..
        } = record.state()
        else {
            // Stage column and state document disagree; leave the row alone.
            tracing::warn!(
                request_id = %record.request_id,
                stage = %record.stage,
                "Record state out of step with its stage column"
            );
            return Ok(Advance::Pending);
        };
        let upscale_mode = *upscale_mode;

        let result = self.generator.result(primary_job_id).await?;
        match result.status {
            JobStatus::Succeeded => {
                let Some(output) = result.first_output() else {
                    // A success without an artifact is a failure.
                    let state = PipelineState::failed(
                        "primary job succeeded without output",
                        None,
                    );
                    let updated = self
                        .store
                        .mark_failed(&record.request_id, Stage::Submitted, &state)
                        .await?;
                    note_skip(updated, &record.request_id);
                    tracing::error!(
                        request_id = %record.request_id,
                        %primary_job_id,
                        "Primary job succeeded without output"
                    );
                    return Ok(Advance::Failed);
                };
                let output = output.to_string();

                if upscale_mode.requests_upscale() {
                    self.start_upscale(record, &output, upscale_mode.target_resolution())
                        .await
                } else {
                    let state = record.state().clone().into_completed(&output)?;
                    let updated = self
                        .store
                        .mark_completed(&record.request_id, Stage::Submitted, &state, &output)
                        .await?;
                    note_skip(updated, &record.request_id);
                    tracing::info!(request_id = %record.request_id, "Record completed");
                    Ok(Advance::Completed)
                }
            }
            JobStatus::Failed => {
                let message = result
                    .error
                    .unwrap_or_else(|| "primary job failed".to_string());
                let state = PipelineState::failed(&message, None);
                let updated = self
                    .store
                    .mark_failed(&record.request_id, Stage::Submitted, &state)
                    .await?;
                note_skip(updated, &record.request_id);
                tracing::error!(
                    request_id = %record.request_id,
                    error = %message,
                    "Primary job failed"
                );
                Ok(Advance::Failed)
            }
            JobStatus::Queued | JobStatus::Running | JobStatus::Unknown => Ok(Advance::Pending),
        }
    }

    /// Primary output in hand; try to start the secondary job. A
    /// refused submission leaves the record at stage-1, so the next
    /// pass retries instead of forfeiting the requested upscale.
    async fn start_upscale(
        &self,
        record: &PipelineRecord,
        primary_output: &str,
        target_resolution: &str,
    ) -> Result<Advance, PipelineError> {
        match self.upscaler.submit(primary_output, target_resolution).await {
            Ok(secondary_job_id) => {
                let state = record
                    .state()
                    .clone()
                    .into_upscaling(primary_output, &secondary_job_id)?;
                let updated = self
                    .store
                    .advance_to_upscaling(&record.request_id, &state)
                    .await?;
                note_skip(updated, &record.request_id);
                tracing::info!(
                    request_id = %record.request_id,
                    %secondary_job_id,
                    target_resolution,
                    "Record advanced to upscaling"
                );
                Ok(Advance::Advanced)
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %record.request_id,
                    error = %e,
                    "Upscale submission failed; record left for the next pass"
                );
                Ok(Advance::Pending)
            }
        }
    }

    async fn reconcile_upscaling(&self, record: &PipelineRecord) -> Result<Advance, PipelineError> {
        let PipelineState::Upscaling {
            primary_output_url,
            secondary_job_id,
            ..
        } = record.state()
        else {
            tracing::warn!(
                request_id = %record.request_id,
                stage = %record.stage,
                "Record state out of step with its stage column"
            );
            return Ok(Advance::Pending);
        };

        let result = self.upscaler.result(secondary_job_id).await?;
        match result.status {
            JobStatus::Succeeded => {
                // An empty secondary result falls back to the primary cut.
                let output = result
                    .first_output()
                    .unwrap_or(primary_output_url)
                    .to_string();
                let state = record.state().clone().into_completed(&output)?;
                let updated = self
                    .store
                    .mark_completed(&record.request_id, Stage::Upscaling, &state, &output)
                    .await?;
                note_skip(updated, &record.request_id);
                tracing::info!(request_id = %record.request_id, "Record completed after upscale");
                Ok(Advance::Completed)
            }
            JobStatus::Failed => {
                let message = result
                    .error
                    .unwrap_or_else(|| "upscale job failed".to_string());
                let fallback = primary_output_url.clone();
                let state = record.state().clone().into_degraded(message.clone())?;
                let updated = self
                    .store
                    .mark_degraded(
                        &record.request_id,
                        Stage::Upscaling,
                        &state,
                        Some(&fallback),
                    )
                    .await?;
                note_skip(updated, &record.request_id);
                tracing::warn!(
                    request_id = %record.request_id,
                    error = %message,
                    "Upscale failed; record completed on primary output"
                );
                Ok(Advance::Degraded)
            }
            JobStatus::Queued | JobStatus::Running | JobStatus::Unknown => Ok(Advance::Pending),
        }
    }
}

/// A false return from a transition means another pass already moved
/// the record past the expected stage; there is nothing left to do.
fn note_skip(updated: bool, request_id: &str) {
    if !updated {
        tracing::debug!(request_id, "Record already advanced; transition skipped");
    }
}

/// Fold per-record outcomes into a summary, logging each error with its
/// record id rather than failing the pass.
fn summarize(
    records: &[PipelineRecord],
    results: Vec<Result<Advance, PipelineError>>,
) -> ScanSummary {
    let mut summary = ScanSummary {
        scanned: records.len(),
        ..ScanSummary::default()
    };
    for (record, result) in records.iter().zip(results) {
        match result {
            Ok(Advance::Advanced) => summary.advanced += 1,
            Ok(Advance::Completed) => summary.completed += 1,
            Ok(Advance::Degraded) => summary.degraded += 1,
            Ok(Advance::Failed) => summary.failed += 1,
            Ok(Advance::Pending) => summary.pending += 1,
            Err(e) => {
                summary.errors += 1;
                tracing::error!(
                    request_id = %record.request_id,
                    error = %e,
                    "Failed to reconcile record"
                );
            }
        }
    }
    summary
}
