//! Client for the sam3 video-segmentation model.

use crate::client::{PredictionClient, SUBMIT_TIMEOUT_HEAVY};
use crate::error::ProviderError;
use crate::status::JobResult;

const PATH: &str = "wavespeed-ai/sam3-video";

#[derive(Debug, Clone)]
pub struct Sam3Task {
    pub video: String,
    /// What to segment, in plain language.
    pub prompt: String,
    /// Defaults to true.
    pub apply_mask: Option<bool>,
}

pub struct Sam3Client {
    client: PredictionClient,
}

impl Sam3Client {
    pub fn new(client: PredictionClient) -> Self {
        Self { client }
    }

    pub async fn submit_task(&self, task: &Sam3Task) -> Result<String, ProviderError> {
        let payload = build_payload(task)?;
        tracing::info!("Submitting sam3 segmentation task");
        self.client.submit(PATH, &payload, SUBMIT_TIMEOUT_HEAVY).await
    }

    pub async fn get_result(&self, job_id: &str) -> Result<JobResult, ProviderError> {
        self.client.result(job_id).await
    }
}

fn build_payload(task: &Sam3Task) -> Result<serde_json::Value, ProviderError> {
    if task.video.trim().is_empty() {
        return Err(ProviderError::InvalidParams("video is required".to_string()));
    }
    if task.prompt.trim().is_empty() {
        return Err(ProviderError::InvalidParams("prompt is required".to_string()));
    }

    Ok(serde_json::json!({
        "video": task.video,
        "prompt": task.prompt,
        "apply_mask": task.apply_mask.unwrap_or(true),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_mask_defaults_to_true() {
        let payload = build_payload(&Sam3Task {
            video: "https://cdn/in.mp4".to_string(),
            prompt: "the bottle".to_string(),
            apply_mask: None,
        })
        .unwrap();
        assert_eq!(payload["apply_mask"], true);
    }

    #[test]
    fn missing_video_is_rejected() {
        let result = build_payload(&Sam3Task {
            video: String::new(),
            prompt: "the bottle".to_string(),
            apply_mask: None,
        });
        assert!(result.is_err());
    }
}
