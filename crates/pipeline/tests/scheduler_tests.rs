//! Reconciliation behavior: stage advancement, the degrade-gracefully
//! policy, and per-record failure isolation.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;

use common::{failed, running, succeeded, FakeGenerator, FakeUpscaler, MemoryStore};
use vidpipe_core::state::{PipelineState, UpscaleMode};
use vidpipe_core::status::{RecordStatus, Stage};
use vidpipe_pipeline::{RecordStore, ReconciliationScheduler, SchedulerOptions};
use vidpipe_providers::job::{VideoGenTask, VideoGenerator};
use vidpipe_providers::{JobResult, ProviderError};

fn submitted(job_id: &str, mode: UpscaleMode) -> PipelineState {
    PipelineState::submitted(
        "a cinematic ad",
        "https://img/product.png",
        job_id,
        mode,
    )
}

fn scheduler(
    store: &Arc<MemoryStore>,
    generator: &Arc<FakeGenerator>,
    upscaler: &Arc<FakeUpscaler>,
) -> ReconciliationScheduler {
    ReconciliationScheduler::new(
        Arc::clone(store) as _,
        Arc::clone(generator) as _,
        Arc::clone(upscaler) as _,
        SchedulerOptions::default(),
    )
}

#[tokio::test]
async fn primary_success_without_upscale_completes_the_record() {
    let store = Arc::new(MemoryStore::default());
    let generator = Arc::new(FakeGenerator::accepting("unused"));
    let upscaler = Arc::new(FakeUpscaler::accepting("unused"));
    store.insert_processing("req-1", submitted("job-1", UpscaleMode::Default));
    generator.set_result("job-1", succeeded(&["https://cdn/raw.mp4"]));

    let summary = scheduler(&store, &generator, &upscaler)
        .scan_submitted_once()
        .await
        .unwrap();

    assert_eq!(summary.completed, 1);
    let record = store.get("req-1").unwrap();
    assert_eq!(record.status, RecordStatus::Completed);
    assert_eq!(record.stage, Stage::Completed);
    assert_eq!(record.output_url.as_deref(), Some("https://cdn/raw.mp4"));
}

#[tokio::test]
async fn primary_success_without_output_fails_the_record() {
    let store = Arc::new(MemoryStore::default());
    let generator = Arc::new(FakeGenerator::accepting("unused"));
    let upscaler = Arc::new(FakeUpscaler::accepting("unused"));
    store.insert_processing("req-1", submitted("job-1", UpscaleMode::Default));
    generator.set_result("job-1", succeeded(&[]));

    let summary = scheduler(&store, &generator, &upscaler)
        .scan_submitted_once()
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    let record = store.get("req-1").unwrap();
    assert_eq!(record.status, RecordStatus::Failed);
    assert_eq!(record.stage, Stage::CompletedWithError);
    assert!(record.state().error().unwrap().contains("without output"));
}

#[tokio::test]
async fn primary_failure_records_the_provider_error() {
    let store = Arc::new(MemoryStore::default());
    let generator = Arc::new(FakeGenerator::accepting("unused"));
    let upscaler = Arc::new(FakeUpscaler::accepting("unused"));
    store.insert_processing("req-1", submitted("job-1", UpscaleMode::Default));
    generator.set_result("job-1", failed("nsfw content"));

    scheduler(&store, &generator, &upscaler)
        .scan_submitted_once()
        .await
        .unwrap();

    let record = store.get("req-1").unwrap();
    assert_eq!(record.status, RecordStatus::Failed);
    assert_eq!(record.state().error(), Some("nsfw content"));
}

#[tokio::test]
async fn running_and_unknown_jobs_are_left_untouched() {
    let store = Arc::new(MemoryStore::default());
    let generator = Arc::new(FakeGenerator::accepting("unused"));
    let upscaler = Arc::new(FakeUpscaler::accepting("unused"));
    store.insert_processing("req-1", submitted("job-1", UpscaleMode::Default));
    generator.set_result("job-1", running());
    // req-2 has no programmed result: the fake reports running.
    store.insert_processing("req-2", submitted("job-2", UpscaleMode::Default));

    let summary = scheduler(&store, &generator, &upscaler)
        .scan_submitted_once()
        .await
        .unwrap();

    assert_eq!(summary.pending, 2);
    for id in ["req-1", "req-2"] {
        let record = store.get(id).unwrap();
        assert_eq!(record.status, RecordStatus::Processing);
        assert_eq!(record.stage, Stage::Submitted);
    }
}

#[tokio::test]
async fn upscale_request_advances_to_the_secondary_stage() {
    let store = Arc::new(MemoryStore::default());
    let generator = Arc::new(FakeGenerator::accepting("unused"));
    let upscaler = Arc::new(FakeUpscaler::accepting("job-2"));
    store.insert_processing("req-1", submitted("job-1", UpscaleMode::FourK));
    generator.set_result("job-1", succeeded(&["https://cdn/raw.mp4"]));

    let summary = scheduler(&store, &generator, &upscaler)
        .scan_submitted_once()
        .await
        .unwrap();

    assert_eq!(summary.advanced, 1);
    let record = store.get("req-1").unwrap();
    assert_eq!(record.status, RecordStatus::Processing);
    assert_eq!(record.stage, Stage::Upscaling);
    assert_matches!(
        record.state(),
        PipelineState::Upscaling { primary_output_url, secondary_job_id, .. }
            if primary_output_url == "https://cdn/raw.mp4" && secondary_job_id == "job-2"
    );

    let (video, target) = upscaler.last_submission.lock().unwrap().clone().unwrap();
    assert_eq!(video, "https://cdn/raw.mp4");
    assert_eq!(target, "4k");
}

#[tokio::test]
async fn upscale_success_completes_with_the_upscaled_output() {
    let store = Arc::new(MemoryStore::default());
    let generator = Arc::new(FakeGenerator::accepting("unused"));
    let upscaler = Arc::new(FakeUpscaler::accepting("job-2"));
    store.insert_processing("req-1", submitted("job-1", UpscaleMode::TwoK));
    generator.set_result("job-1", succeeded(&["https://cdn/raw.mp4"]));
    upscaler.set_result("job-2", succeeded(&["https://cdn/2k.mp4"]));

    let scheduler = scheduler(&store, &generator, &upscaler);
    scheduler.scan_submitted_once().await.unwrap();
    let summary = scheduler.scan_upscaling_once().await.unwrap();

    assert_eq!(summary.completed, 1);
    let record = store.get("req-1").unwrap();
    assert_eq!(record.status, RecordStatus::Completed);
    assert_eq!(record.stage, Stage::Completed);
    assert_eq!(record.output_url.as_deref(), Some("https://cdn/2k.mp4"));
    assert_matches!(
        record.state(),
        PipelineState::Completed { secondary_job_id: Some(id), .. } if id == "job-2"
    );
}

#[tokio::test]
async fn upscale_failure_degrades_to_the_primary_output() {
    let store = Arc::new(MemoryStore::default());
    let generator = Arc::new(FakeGenerator::accepting("unused"));
    let upscaler = Arc::new(FakeUpscaler::accepting("job-2"));
    store.insert_processing("req-1", submitted("job-1", UpscaleMode::FourK));
    generator.set_result("job-1", succeeded(&["https://cdn/raw.mp4"]));
    upscaler.set_result("job-2", failed("upscaler out of memory"));

    let scheduler = scheduler(&store, &generator, &upscaler);
    scheduler.scan_submitted_once().await.unwrap();
    let summary = scheduler.scan_upscaling_once().await.unwrap();

    assert_eq!(summary.degraded, 1);
    let record = store.get("req-1").unwrap();
    // Completed, not failed: the primary artifact is still usable.
    assert_eq!(record.status, RecordStatus::Completed);
    assert_eq!(record.stage, Stage::CompletedWithError);
    assert_eq!(record.output_url.as_deref(), Some("https://cdn/raw.mp4"));
    assert_matches!(
        record.state(),
        PipelineState::CompletedWithError { fallback_output_url: Some(url), .. }
            if url == "https://cdn/raw.mp4"
    );
}

#[tokio::test]
async fn empty_upscale_output_falls_back_to_the_primary_cut() {
    let store = Arc::new(MemoryStore::default());
    let generator = Arc::new(FakeGenerator::accepting("unused"));
    let upscaler = Arc::new(FakeUpscaler::accepting("job-2"));
    store.insert_processing("req-1", submitted("job-1", UpscaleMode::TwoK));
    generator.set_result("job-1", succeeded(&["https://cdn/raw.mp4"]));
    upscaler.set_result("job-2", succeeded(&[]));

    let scheduler = scheduler(&store, &generator, &upscaler);
    scheduler.scan_submitted_once().await.unwrap();
    scheduler.scan_upscaling_once().await.unwrap();

    let record = store.get("req-1").unwrap();
    assert_eq!(record.status, RecordStatus::Completed);
    assert_eq!(record.output_url.as_deref(), Some("https://cdn/raw.mp4"));
}

#[tokio::test]
async fn rejected_upscale_submission_leaves_the_record_for_retry() {
    let store = Arc::new(MemoryStore::default());
    let generator = Arc::new(FakeGenerator::accepting("unused"));
    let upscaler = Arc::new(FakeUpscaler::rejecting(503));
    store.insert_processing("req-1", submitted("job-1", UpscaleMode::FourK));
    generator.set_result("job-1", succeeded(&["https://cdn/raw.mp4"]));

    let summary = scheduler(&store, &generator, &upscaler)
        .scan_submitted_once()
        .await
        .unwrap();

    // A refused submission is treated as transient: no stage change.
    assert_eq!(summary.pending, 1);
    let record = store.get("req-1").unwrap();
    assert_eq!(record.status, RecordStatus::Processing);
    assert_eq!(record.stage, Stage::Submitted);
    assert_eq!(record.output_url, None);

    // Once the upscaler recovers, the next pass picks the record up.
    let recovered = Arc::new(FakeUpscaler::accepting("job-2"));
    let summary = scheduler(&store, &generator, &recovered)
        .scan_submitted_once()
        .await
        .unwrap();

    assert_eq!(summary.advanced, 1);
    let record = store.get("req-1").unwrap();
    assert_eq!(record.status, RecordStatus::Processing);
    assert_eq!(record.stage, Stage::Upscaling);
}

/// Generator whose result query races the scan: it finishes the record
/// through the store before answering, as a second worker would.
struct RacingGenerator {
    store: Arc<MemoryStore>,
}

#[async_trait]
impl VideoGenerator for RacingGenerator {
    async fn submit(&self, _task: &VideoGenTask) -> Result<String, ProviderError> {
        Ok("job-1".to_string())
    }

    async fn result(&self, _job_id: &str) -> Result<JobResult, ProviderError> {
        let state = self
            .store
            .get("req-1")
            .unwrap()
            .state()
            .clone()
            .into_completed("https://cdn/other-worker.mp4")
            .unwrap();
        self.store
            .mark_completed(
                "req-1",
                Stage::Submitted,
                &state,
                "https://cdn/other-worker.mp4",
            )
            .await
            .unwrap();
        Ok(succeeded(&["https://cdn/stale.mp4"]))
    }
}

#[tokio::test]
async fn already_advanced_records_skip_the_stale_transition() {
    let store = Arc::new(MemoryStore::default());
    let generator = Arc::new(RacingGenerator {
        store: Arc::clone(&store),
    });
    let upscaler = Arc::new(FakeUpscaler::accepting("unused"));
    store.insert_processing("req-1", submitted("job-1", UpscaleMode::Default));

    let summary = ReconciliationScheduler::new(
        Arc::clone(&store) as _,
        generator as _,
        upscaler as _,
        SchedulerOptions::default(),
    )
    .scan_submitted_once()
    .await
    .unwrap();

    // Losing the race is not an error; the stale write is dropped.
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.completed, 1);
    let record = store.get("req-1").unwrap();
    assert_eq!(record.status, RecordStatus::Completed);
    assert_eq!(
        record.output_url.as_deref(),
        Some("https://cdn/other-worker.mp4")
    );
}

#[tokio::test]
async fn one_bad_record_never_aborts_the_batch() {
    let store = Arc::new(MemoryStore::default());
    let generator = Arc::new(FakeGenerator::accepting("unused"));
    let upscaler = Arc::new(FakeUpscaler::accepting("unused"));
    store.insert_processing("req-bad", submitted("job-bad", UpscaleMode::Default));
    store.insert_processing("req-good", submitted("job-good", UpscaleMode::Default));
    generator.set_result_error("job-bad", "provider returned garbage");
    generator.set_result("job-good", succeeded(&["https://cdn/good.mp4"]));

    let summary = scheduler(&store, &generator, &upscaler)
        .scan_submitted_once()
        .await
        .unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.completed, 1);
    let good = store.get("req-good").unwrap();
    assert_eq!(good.status, RecordStatus::Completed);
    // The bad record stays eligible for the next pass.
    let bad = store.get("req-bad").unwrap();
    assert_eq!(bad.status, RecordStatus::Processing);
}

#[tokio::test]
async fn stages_never_move_backward() {
    let store = Arc::new(MemoryStore::default());
    let generator = Arc::new(FakeGenerator::accepting("unused"));
    let upscaler = Arc::new(FakeUpscaler::accepting("job-2"));
    store.insert_processing("req-1", submitted("job-1", UpscaleMode::TwoK));
    generator.set_result("job-1", succeeded(&["https://cdn/raw.mp4"]));
    upscaler.set_result("job-2", succeeded(&["https://cdn/2k.mp4"]));

    let scheduler = scheduler(&store, &generator, &upscaler);
    scheduler.scan_submitted_once().await.unwrap();
    scheduler.scan_upscaling_once().await.unwrap();

    // Further passes find nothing in flight and change nothing.
    let summary = scheduler.scan_submitted_once().await.unwrap();
    assert_eq!(summary.scanned, 0);
    let summary = scheduler.scan_upscaling_once().await.unwrap();
    assert_eq!(summary.scanned, 0);

    let record = store.get("req-1").unwrap();
    assert_eq!(record.stage, Stage::Completed);
    assert_eq!(record.output_url.as_deref(), Some("https://cdn/2k.mp4"));
}
