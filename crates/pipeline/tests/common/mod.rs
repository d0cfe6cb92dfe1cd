//! In-memory store and provider fakes shared by the integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::types::Json;
use uuid::Uuid;

use vidpipe_core::state::PipelineState;
use vidpipe_core::status::{RecordStatus, Stage};
use vidpipe_db::models::PipelineRecord;
use vidpipe_db::repositories::NewPipelineRecord;
use vidpipe_pipeline::{PipelineError, RecordStore};
use vidpipe_providers::enhance::{EnhanceRequest, Enhanced, PromptEnhancer};
use vidpipe_providers::job::{VideoGenTask, VideoGenerator, VideoUpscaler};
use vidpipe_providers::{JobResult, JobStatus, ProviderError};

pub fn succeeded(outputs: &[&str]) -> JobResult {
    JobResult {
        status: JobStatus::Succeeded,
        outputs: outputs.iter().map(|s| s.to_string()).collect(),
        error: None,
    }
}

pub fn failed(error: &str) -> JobResult {
    JobResult {
        status: JobStatus::Failed,
        outputs: Vec::new(),
        error: Some(error.to_string()),
    }
}

pub fn running() -> JobResult {
    JobResult {
        status: JobStatus::Running,
        outputs: Vec::new(),
        error: None,
    }
}

/// Record store backed by a map, enforcing the same stage preconditions
/// as the Postgres repository.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, PipelineRecord>>,
}

impl MemoryStore {
    pub fn get(&self, request_id: &str) -> Option<PipelineRecord> {
        self.records.lock().unwrap().get(request_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Seed a record directly, as the runner would have written it.
    pub fn insert_processing(&self, request_id: &str, state: PipelineState) {
        let record = make_record(&NewPipelineRecord {
            request_id: request_id.to_string(),
            owner_id: None,
            model_name: "wan-2.6".to_string(),
            prompt: "a cinematic ad".to_string(),
            thumb_url: Some("https://img/product.png".to_string()),
            status: RecordStatus::Processing,
            state,
        });
        self.records
            .lock()
            .unwrap()
            .insert(request_id.to_string(), record);
    }

    fn update<F>(&self, request_id: &str, expected_stage: Stage, apply: F) -> bool
    where
        F: FnOnce(&mut PipelineRecord),
    {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(request_id) {
            Some(record) if record.stage == expected_stage => {
                apply(record);
                record.updated_at = chrono::Utc::now();
                true
            }
            _ => false,
        }
    }
}

fn make_record(new: &NewPipelineRecord) -> PipelineRecord {
    let now = chrono::Utc::now();
    PipelineRecord {
        id: Uuid::new_v4(),
        request_id: new.request_id.clone(),
        owner_id: new.owner_id.clone(),
        model_name: new.model_name.clone(),
        prompt: new.prompt.clone(),
        thumb_url: new.thumb_url.clone(),
        output_url: None,
        status: new.status,
        stage: new.state.stage(),
        pipeline: Json(new.state.clone()),
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert(&self, new: &NewPipelineRecord) -> Result<PipelineRecord, PipelineError> {
        let mut records = self.records.lock().unwrap();
        let mut record = make_record(new);
        if let Some(existing) = records.get(&new.request_id) {
            record.id = existing.id;
            record.created_at = existing.created_at;
        }
        records.insert(new.request_id.clone(), record.clone());
        Ok(record)
    }

    async fn find_by_request_id(
        &self,
        request_id: &str,
    ) -> Result<Option<PipelineRecord>, PipelineError> {
        Ok(self.get(request_id))
    }

    async fn find_processing_by_stage(
        &self,
        stage: Stage,
        limit: i64,
    ) -> Result<Vec<PipelineRecord>, PipelineError> {
        let records = self.records.lock().unwrap();
        let mut matches: Vec<PipelineRecord> = records
            .values()
            .filter(|r| r.status == RecordStatus::Processing && r.stage == stage)
            .cloned()
            .collect();
        matches.sort_by_key(|r| r.created_at);
        matches.truncate(limit as usize);
        Ok(matches)
    }

    async fn advance_to_upscaling(
        &self,
        request_id: &str,
        state: &PipelineState,
    ) -> Result<bool, PipelineError> {
        Ok(self.update(request_id, Stage::Submitted, |record| {
            record.stage = Stage::Upscaling;
            record.pipeline = Json(state.clone());
        }))
    }

    async fn mark_completed(
        &self,
        request_id: &str,
        expected_stage: Stage,
        state: &PipelineState,
        output_url: &str,
    ) -> Result<bool, PipelineError> {
        Ok(self.update(request_id, expected_stage, |record| {
            record.status = RecordStatus::Completed;
            record.stage = state.stage();
            record.pipeline = Json(state.clone());
            record.output_url = Some(output_url.to_string());
        }))
    }

    async fn mark_degraded(
        &self,
        request_id: &str,
        expected_stage: Stage,
        state: &PipelineState,
        fallback_output_url: Option<&str>,
    ) -> Result<bool, PipelineError> {
        Ok(self.update(request_id, expected_stage, |record| {
            record.status = RecordStatus::Completed;
            record.stage = state.stage();
            record.pipeline = Json(state.clone());
            record.output_url = fallback_output_url.map(str::to_string);
        }))
    }

    async fn mark_failed(
        &self,
        request_id: &str,
        expected_stage: Stage,
        state: &PipelineState,
    ) -> Result<bool, PipelineError> {
        Ok(self.update(request_id, expected_stage, |record| {
            record.status = RecordStatus::Failed;
            record.stage = state.stage();
            record.pipeline = Json(state.clone());
            record.output_url = None;
        }))
    }
}

/// Generator fake: programmable submit answer plus per-job results.
pub struct FakeGenerator {
    submit: Mutex<Result<String, u16>>,
    results: Mutex<HashMap<String, Result<JobResult, String>>>,
    pub last_task: Mutex<Option<VideoGenTask>>,
}

impl FakeGenerator {
    pub fn accepting(job_id: &str) -> Self {
        Self {
            submit: Mutex::new(Ok(job_id.to_string())),
            results: Mutex::new(HashMap::new()),
            last_task: Mutex::new(None),
        }
    }

    pub fn rejecting(status: u16) -> Self {
        Self {
            submit: Mutex::new(Err(status)),
            results: Mutex::new(HashMap::new()),
            last_task: Mutex::new(None),
        }
    }

    pub fn set_result(&self, job_id: &str, result: JobResult) {
        self.results
            .lock()
            .unwrap()
            .insert(job_id.to_string(), Ok(result));
    }

    /// Make result queries for this job error out.
    pub fn set_result_error(&self, job_id: &str, message: &str) {
        self.results
            .lock()
            .unwrap()
            .insert(job_id.to_string(), Err(message.to_string()));
    }
}

#[async_trait]
impl VideoGenerator for FakeGenerator {
    async fn submit(&self, task: &VideoGenTask) -> Result<String, ProviderError> {
        *self.last_task.lock().unwrap() = Some(task.clone());
        match &*self.submit.lock().unwrap() {
            Ok(job_id) => Ok(job_id.clone()),
            Err(status) => Err(ProviderError::Submission {
                status: *status,
                body: "provider rejected the submission".to_string(),
            }),
        }
    }

    async fn result(&self, job_id: &str) -> Result<JobResult, ProviderError> {
        match self.results.lock().unwrap().get(job_id) {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err(message)) => Err(ProviderError::Malformed(message.clone())),
            None => Ok(running()),
        }
    }
}

/// Upscaler fake in the same shape as [`FakeGenerator`].
pub struct FakeUpscaler {
    submit: Mutex<Result<String, u16>>,
    results: Mutex<HashMap<String, JobResult>>,
    pub last_submission: Mutex<Option<(String, String)>>,
}

impl FakeUpscaler {
    pub fn accepting(job_id: &str) -> Self {
        Self {
            submit: Mutex::new(Ok(job_id.to_string())),
            results: Mutex::new(HashMap::new()),
            last_submission: Mutex::new(None),
        }
    }

    pub fn rejecting(status: u16) -> Self {
        Self {
            submit: Mutex::new(Err(status)),
            results: Mutex::new(HashMap::new()),
            last_submission: Mutex::new(None),
        }
    }

    pub fn set_result(&self, job_id: &str, result: JobResult) {
        self.results
            .lock()
            .unwrap()
            .insert(job_id.to_string(), result);
    }
}

#[async_trait]
impl VideoUpscaler for FakeUpscaler {
    async fn submit(
        &self,
        video_url: &str,
        target_resolution: &str,
    ) -> Result<String, ProviderError> {
        *self.last_submission.lock().unwrap() =
            Some((video_url.to_string(), target_resolution.to_string()));
        match &*self.submit.lock().unwrap() {
            Ok(job_id) => Ok(job_id.clone()),
            Err(status) => Err(ProviderError::Submission {
                status: *status,
                body: "upscaler rejected the submission".to_string(),
            }),
        }
    }

    async fn result(&self, job_id: &str) -> Result<JobResult, ProviderError> {
        Ok(self
            .results
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .unwrap_or_else(running))
    }
}

/// Enhancer fake: a fixed answer or a fixed failure.
pub struct FakeEnhancer {
    response: Result<Enhanced, String>,
}

impl FakeEnhancer {
    pub fn answering(video_prompt: &str, start_frame: &str) -> Self {
        Self {
            response: Ok(Enhanced {
                video_prompt: video_prompt.to_string(),
                start_frame: start_frame.to_string(),
            }),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl PromptEnhancer for FakeEnhancer {
    async fn enhance(&self, _req: &EnhanceRequest) -> Result<Enhanced, ProviderError> {
        match &self.response {
            Ok(enhanced) => Ok(enhanced.clone()),
            Err(message) => Err(ProviderError::Malformed(message.clone())),
        }
    }
}
