//! Client for the kling video-to-audio model.
//!
//! Dubs an existing video with sound effects and background music.
//! The provider returns two outputs: the dubbed video first, the bare
//! audio track second.

use crate::client::{PredictionClient, SUBMIT_TIMEOUT};
use crate::error::ProviderError;
use crate::status::JobResult;

const PATH: &str = "kwaivgi/kling-video-to-audio";

/// Provider-imposed ceiling on the audio prompt fields.
const MAX_PROMPT_CHARS: usize = 200;

#[derive(Debug, Clone, Default)]
pub struct KlingAudioTask {
    pub video: String,
    pub sound_effect_prompt: Option<String>,
    pub bgm_prompt: Option<String>,
    /// Defaults to false.
    pub asmr_mode: Option<bool>,
}

pub struct KlingAudioClient {
    client: PredictionClient,
}

impl KlingAudioClient {
    pub fn new(client: PredictionClient) -> Self {
        Self { client }
    }

    pub async fn submit_task(&self, task: &KlingAudioTask) -> Result<String, ProviderError> {
        let payload = build_payload(task)?;
        tracing::info!("Submitting kling video-to-audio task");
        self.client.submit(PATH, &payload, SUBMIT_TIMEOUT).await
    }

    pub async fn get_result(&self, job_id: &str) -> Result<JobResult, ProviderError> {
        self.client.result(job_id).await
    }
}

fn build_payload(task: &KlingAudioTask) -> Result<serde_json::Value, ProviderError> {
    if task.video.trim().is_empty() {
        return Err(ProviderError::InvalidParams("video is required".to_string()));
    }
    for (name, value) in [
        ("sound_effect_prompt", &task.sound_effect_prompt),
        ("bgm_prompt", &task.bgm_prompt),
    ] {
        if let Some(text) = value {
            if text.chars().count() > MAX_PROMPT_CHARS {
                return Err(ProviderError::InvalidParams(format!(
                    "{name} exceeds {MAX_PROMPT_CHARS} characters"
                )));
            }
        }
    }

    let mut payload = serde_json::json!({
        "video": task.video,
        "asmr_mode": task.asmr_mode.unwrap_or(false),
    });
    if let Some(sfx) = task.sound_effect_prompt.as_deref().filter(|s| !s.is_empty()) {
        payload["sound_effect_prompt"] = serde_json::Value::String(sfx.to_string());
    }
    if let Some(bgm) = task.bgm_prompt.as_deref().filter(|s| !s.is_empty()) {
        payload["bgm_prompt"] = serde_json::Value::String(bgm.to_string());
    }
    Ok(payload)
}
