//! Client for the wan-2.6 image-to-video model.
//!
//! The primary generator for commercial pipeline runs. Validates its
//! parameter contract before calling out and never substitutes values
//! the caller did not request, beyond the documented defaults
//! (resolution 1080p, multi shot, seed -1, prompt expansion on).

use async_trait::async_trait;

use crate::client::{PredictionClient, SUBMIT_TIMEOUT_HEAVY};
use crate::error::ProviderError;
use crate::job::{VideoGenTask, VideoGenerator};
use crate::status::JobResult;

const PATH: &str = "alibaba/wan-2.6/image-to-video";

const VALID_RESOLUTIONS: &[&str] = &["720p", "1080p"];
const VALID_SHOT_TYPES: &[&str] = &["single", "multi"];

/// Submission parameters for a wan-2.6 job.
#[derive(Debug, Clone)]
pub struct Wan26Task {
    pub image: String,
    pub prompt: String,
    /// Clip length in seconds. Required by the provider.
    pub duration: u32,
    /// `720p` or `1080p`; defaults to `1080p`.
    pub resolution: Option<String>,
    pub negative_prompt: Option<String>,
    /// `single` or `multi`; defaults to `multi`.
    pub shot_type: Option<String>,
    pub seed: Option<i64>,
}

pub struct Wan26Client {
    client: PredictionClient,
}

impl Wan26Client {
    pub fn new(client: PredictionClient) -> Self {
        Self { client }
    }

    pub async fn submit_task(&self, task: &Wan26Task) -> Result<String, ProviderError> {
        let payload = build_payload(task)?;
        tracing::info!(duration = task.duration, "Submitting wan-2.6 task");
        self.client.submit(PATH, &payload, SUBMIT_TIMEOUT_HEAVY).await
    }

    pub async fn get_result(&self, job_id: &str) -> Result<JobResult, ProviderError> {
        self.client.result(job_id).await
    }
}

fn build_payload(task: &Wan26Task) -> Result<serde_json::Value, ProviderError> {
    if task.image.trim().is_empty() {
        return Err(ProviderError::InvalidParams("image is required".to_string()));
    }
    if task.duration == 0 {
        return Err(ProviderError::InvalidParams(
            "duration must be positive".to_string(),
        ));
    }

    let resolution = task.resolution.as_deref().unwrap_or("1080p");
    if !VALID_RESOLUTIONS.contains(&resolution) {
        return Err(ProviderError::InvalidParams(format!(
            "resolution '{resolution}' not in {VALID_RESOLUTIONS:?}"
        )));
    }

    let shot_type = task.shot_type.as_deref().unwrap_or("multi");
    if !VALID_SHOT_TYPES.contains(&shot_type) {
        return Err(ProviderError::InvalidParams(format!(
            "shot_type '{shot_type}' not in {VALID_SHOT_TYPES:?}"
        )));
    }

    let mut payload = serde_json::json!({
        "image": task.image,
        "prompt": task.prompt,
        "duration": task.duration,
        "resolution": resolution,
        "shot_type": shot_type,
        "enable_prompt_expansion": true,
        "seed": task.seed.unwrap_or(-1),
    });
    if let Some(negative) = &task.negative_prompt {
        payload["negative_prompt"] = serde_json::Value::String(negative.clone());
    }
    Ok(payload)
}

#[async_trait]
impl VideoGenerator for Wan26Client {
    async fn submit(&self, task: &VideoGenTask) -> Result<String, ProviderError> {
        self.submit_task(&Wan26Task {
            image: task.start_frame.clone(),
            prompt: task.prompt.clone(),
            duration: task.duration,
            resolution: None,
            negative_prompt: task.negative_prompt.clone(),
            shot_type: None,
            seed: task.seed,
        })
        .await
    }

    async fn result(&self, job_id: &str) -> Result<JobResult, ProviderError> {
        self.get_result(job_id).await
    }
}
