//! One-shot model dispatcher.
//!
//! Routes a generation request tagged with a model name onto the right
//! typed client, returning the provider job id plus a thumbnail URL
//! derived from the input media. All models share the generic result
//! endpoint, so polling goes through a single [`PredictionClient`].

use serde::Deserialize;

use crate::client::PredictionClient;
use crate::error::ProviderError;
use crate::kling_audio::{KlingAudioClient, KlingAudioTask};
use crate::ltx2::{Ltx2Client, Ltx2Task};
use crate::sam3::{Sam3Client, Sam3Task};
use crate::status::JobResult;
use crate::upscaler::UpscalerProClient;
use crate::wan21::{Lora, Wan21Client, Wan21Task};
use crate::wan26::{Wan26Client, Wan26Task};

/// Wire-level request for a one-shot model submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DispatchRequest {
    pub model: String,
    pub prompt: Option<String>,
    pub image: Option<String>,
    pub video: Option<String>,
    pub duration: Option<u32>,
    pub seed: Option<i64>,
    pub negative_prompt: Option<String>,
    pub resolution: Option<String>,
    pub shot_type: Option<String>,
    pub sound_effect_prompt: Option<String>,
    pub bgm_prompt: Option<String>,
    pub asmr_mode: Option<bool>,
    pub apply_mask: Option<bool>,
    pub target_resolution: Option<String>,
    pub strength: Option<f64>,
    #[serde(skip)]
    pub loras: Vec<Lora>,
}

/// What the caller gets back immediately after dispatch.
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    pub job_id: String,
    /// Display thumbnail: the input image or video.
    pub thumb_url: String,
}

pub struct ModelDispatcher {
    wan26: Wan26Client,
    wan21: Wan21Client,
    ltx2: Ltx2Client,
    sam3: Sam3Client,
    kling: KlingAudioClient,
    upscaler: UpscalerProClient,
    results: PredictionClient,
}

impl ModelDispatcher {
    /// Build all model clients over one shared connection pool.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let http = reqwest::Client::new();
        let make = || PredictionClient::with_client(http.clone(), base_url, api_key);
        Self {
            wan26: Wan26Client::new(make()),
            wan21: Wan21Client::new(make()),
            ltx2: Ltx2Client::new(make()),
            sam3: Sam3Client::new(make()),
            kling: KlingAudioClient::new(make()),
            upscaler: UpscalerProClient::new(make()),
            results: make(),
        }
    }

    /// Submit a request to the model it names.
    pub async fn submit(&self, req: &DispatchRequest) -> Result<SubmitReceipt, ProviderError> {
        match req.model.as_str() {
            "wan-2.6" => {
                let image = required(&req.image, "image")?;
                let job_id = self
                    .wan26
                    .submit_task(&Wan26Task {
                        image: image.to_string(),
                        prompt: req.prompt.clone().unwrap_or_default(),
                        duration: req.duration.ok_or_else(|| {
                            ProviderError::InvalidParams("duration is required".to_string())
                        })?,
                        resolution: req.resolution.clone(),
                        negative_prompt: req.negative_prompt.clone(),
                        shot_type: req.shot_type.clone(),
                        seed: req.seed,
                    })
                    .await?;
                Ok(SubmitReceipt {
                    job_id,
                    thumb_url: image.to_string(),
                })
            }
            "wan-2.1" => {
                let video = required(&req.video, "video")?;
                let job_id = self
                    .wan21
                    .submit_task(&Wan21Task {
                        video: video.to_string(),
                        prompt: req.prompt.clone().unwrap_or_default(),
                        negative_prompt: req.negative_prompt.clone(),
                        loras: req.loras.clone(),
                        strength: req.strength,
                        duration: req.duration,
                        seed: req.seed,
                        ..Wan21Task::default()
                    })
                    .await?;
                Ok(SubmitReceipt {
                    job_id,
                    thumb_url: video.to_string(),
                })
            }
            "ltx-2-19b" => {
                let image = required(&req.image, "image")?;
                let job_id = self
                    .ltx2
                    .submit_task(&Ltx2Task {
                        image: image.to_string(),
                        prompt: req.prompt.clone().unwrap_or_default(),
                        duration: req.duration,
                        seed: req.seed,
                    })
                    .await?;
                Ok(SubmitReceipt {
                    job_id,
                    thumb_url: image.to_string(),
                })
            }
            "sam3" => {
                let video = required(&req.video, "video")?;
                let job_id = self
                    .sam3
                    .submit_task(&Sam3Task {
                        video: video.to_string(),
                        prompt: req.prompt.clone().unwrap_or_default(),
                        apply_mask: req.apply_mask,
                    })
                    .await?;
                Ok(SubmitReceipt {
                    job_id,
                    thumb_url: video.to_string(),
                })
            }
            "kling-video-to-audio" => {
                let video = required(&req.video, "video")?;
                let job_id = self
                    .kling
                    .submit_task(&KlingAudioTask {
                        video: video.to_string(),
                        sound_effect_prompt: req.sound_effect_prompt.clone(),
                        bgm_prompt: req.bgm_prompt.clone(),
                        asmr_mode: req.asmr_mode,
                    })
                    .await?;
                Ok(SubmitReceipt {
                    job_id,
                    thumb_url: video.to_string(),
                })
            }
            "video-upscaler-pro" => {
                let video = required(&req.video, "video")?;
                let job_id = self
                    .upscaler
                    .submit_task(video, req.target_resolution.as_deref())
                    .await?;
                Ok(SubmitReceipt {
                    job_id,
                    thumb_url: video.to_string(),
                })
            }
            other => Err(ProviderError::InvalidParams(format!(
                "unsupported model '{other}'"
            ))),
        }
    }

    /// Query any dispatched job; every model shares the result endpoint.
    pub async fn get_result(&self, job_id: &str) -> Result<JobResult, ProviderError> {
        self.results.result(job_id).await
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ProviderError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProviderError::InvalidParams(format!("{name} is required")))
}
