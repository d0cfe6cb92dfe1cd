//! Client for the ltx-2-19b image-to-video model.
//!
//! Always renders at 1080p; duration defaults to 5 seconds.

use async_trait::async_trait;

use crate::client::{PredictionClient, SUBMIT_TIMEOUT};
use crate::error::ProviderError;
use crate::job::{VideoGenTask, VideoGenerator};
use crate::status::JobResult;

const PATH: &str = "wavespeed-ai/ltx-2-19b/image-to-video";

/// Default clip length in seconds.
const DEFAULT_DURATION: u32 = 5;

#[derive(Debug, Clone)]
pub struct Ltx2Task {
    pub image: String,
    pub prompt: String,
    pub duration: Option<u32>,
    pub seed: Option<i64>,
}

pub struct Ltx2Client {
    client: PredictionClient,
}

impl Ltx2Client {
    pub fn new(client: PredictionClient) -> Self {
        Self { client }
    }

    pub async fn submit_task(&self, task: &Ltx2Task) -> Result<String, ProviderError> {
        let payload = build_payload(task)?;
        tracing::info!(
            duration = payload["duration"].as_u64(),
            "Submitting ltx-2 task"
        );
        self.client.submit(PATH, &payload, SUBMIT_TIMEOUT).await
    }

    pub async fn get_result(&self, job_id: &str) -> Result<JobResult, ProviderError> {
        self.client.result(job_id).await
    }
}

fn build_payload(task: &Ltx2Task) -> Result<serde_json::Value, ProviderError> {
    if task.image.trim().is_empty() {
        return Err(ProviderError::InvalidParams("image is required".to_string()));
    }
    if task.prompt.trim().is_empty() {
        return Err(ProviderError::InvalidParams("prompt is required".to_string()));
    }

    Ok(serde_json::json!({
        "image": task.image,
        "prompt": task.prompt,
        "resolution": "1080p",
        "duration": task.duration.unwrap_or(DEFAULT_DURATION),
        "seed": task.seed.unwrap_or(-1),
    }))
}

#[async_trait]
impl VideoGenerator for Ltx2Client {
    async fn submit(&self, task: &VideoGenTask) -> Result<String, ProviderError> {
        self.submit_task(&Ltx2Task {
            image: task.start_frame.clone(),
            prompt: task.prompt.clone(),
            duration: Some(task.duration),
            seed: task.seed,
        })
        .await
    }

    async fn result(&self, job_id: &str) -> Result<JobResult, ProviderError> {
        self.get_result(job_id).await
    }
}
