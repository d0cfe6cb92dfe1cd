//! Client for the video-upscaler-pro model (the secondary pipeline stage).

use async_trait::async_trait;

use crate::client::{PredictionClient, SUBMIT_TIMEOUT};
use crate::error::ProviderError;
use crate::job::VideoUpscaler;
use crate::status::JobResult;

const PATH: &str = "wavespeed-ai/video-upscaler-pro";

const VALID_TARGETS: &[&str] = &["720p", "1080p", "2k", "4k"];

/// Default target when the caller does not pick one.
const DEFAULT_TARGET: &str = "1080p";

pub struct UpscalerProClient {
    client: PredictionClient,
}

impl UpscalerProClient {
    pub fn new(client: PredictionClient) -> Self {
        Self { client }
    }

    pub async fn submit_task(
        &self,
        video: &str,
        target_resolution: Option<&str>,
    ) -> Result<String, ProviderError> {
        let payload = build_payload(video, target_resolution)?;
        tracing::info!(
            target_resolution = payload["target_resolution"].as_str(),
            "Submitting upscale task"
        );
        self.client.submit(PATH, &payload, SUBMIT_TIMEOUT).await
    }

    pub async fn get_result(&self, job_id: &str) -> Result<JobResult, ProviderError> {
        self.client.result(job_id).await
    }
}

fn build_payload(
    video: &str,
    target_resolution: Option<&str>,
) -> Result<serde_json::Value, ProviderError> {
    if video.trim().is_empty() {
        return Err(ProviderError::InvalidParams("video is required".to_string()));
    }
    let target = target_resolution.unwrap_or(DEFAULT_TARGET);
    if !VALID_TARGETS.contains(&target) {
        return Err(ProviderError::InvalidParams(format!(
            "target_resolution '{target}' not in {VALID_TARGETS:?}"
        )));
    }
    Ok(serde_json::json!({
        "video": video,
        "target_resolution": target,
    }))
}

#[async_trait]
impl VideoUpscaler for UpscalerProClient {
    async fn submit(
        &self,
        video_url: &str,
        target_resolution: &str,
    ) -> Result<String, ProviderError> {
        self.submit_task(video_url, Some(target_resolution)).await
    }

    async fn result(&self, job_id: &str) -> Result<JobResult, ProviderError> {
        self.get_result(job_id).await
    }
}
