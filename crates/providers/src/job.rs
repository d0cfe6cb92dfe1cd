//! Trait seams between the pipeline coordinator and the job clients.
//!
//! The runner and scheduler only ever see these traits, so tests swap in
//! fakes and the worker binary picks concrete model clients at startup.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::status::JobResult;

/// Parameters for a primary image-to-video generation job.
#[derive(Debug, Clone)]
pub struct VideoGenTask {
    pub prompt: String,
    pub start_frame: String,
    /// Clip length in seconds.
    pub duration: u32,
    pub seed: Option<i64>,
    pub negative_prompt: Option<String>,
}

/// A provider that turns a start frame plus prompt into a video.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Submit the job, returning the provider's job id.
    async fn submit(&self, task: &VideoGenTask) -> Result<String, ProviderError>;

    /// Query the job's current result.
    async fn result(&self, job_id: &str) -> Result<JobResult, ProviderError>;
}

/// A provider that re-renders an existing video at a higher resolution.
#[async_trait]
pub trait VideoUpscaler: Send + Sync {
    /// Submit an upscale of `video_url` to `target_resolution`
    /// (`720p`, `1080p`, `2k` or `4k`).
    async fn submit(&self, video_url: &str, target_resolution: &str)
        -> Result<String, ProviderError>;

    /// Query the job's current result.
    async fn result(&self, job_id: &str) -> Result<JobResult, ProviderError>;
}
