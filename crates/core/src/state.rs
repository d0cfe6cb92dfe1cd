//! Tagged pipeline state carried inside each record.
//!
//! The state is persisted as JSONB with the stage name as the serde tag,
//! so every transition site matches exhaustively instead of probing
//! optional fields. Transition helpers return [`CoreError::InvalidTransition`]
//! for any backward or repeated move.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::Stage;

/// Requested upscale quality. Only `2k` and `4k` trigger the secondary
/// upscale stage; `default` completes straight off the primary output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpscaleMode {
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "2k")]
    TwoK,
    #[serde(rename = "4k")]
    FourK,
}

impl UpscaleMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::TwoK => "2k",
            Self::FourK => "4k",
        }
    }

    /// Whether this mode requests enhancement beyond the default output.
    pub fn requests_upscale(self) -> bool {
        !matches!(self, Self::Default)
    }

    /// Target resolution string accepted by the upscaler provider.
    pub fn target_resolution(self) -> &'static str {
        match self {
            Self::Default => "1080p",
            Self::TwoK => "2k",
            Self::FourK => "4k",
        }
    }
}

impl TryFrom<String> for UpscaleMode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "default" => Ok(Self::Default),
            "2k" => Ok(Self::TwoK),
            "4k" => Ok(Self::FourK),
            other => Err(CoreError::Validation(format!(
                "Unknown upscale mode '{other}' (expected default, 2k or 4k)"
            ))),
        }
    }
}

impl std::fmt::Display for UpscaleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage-specific pipeline state, tagged by stage name in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum PipelineState {
    /// Primary video-generation job in flight.
    Submitted {
        video_prompt: String,
        start_frame: String,
        primary_job_id: String,
        upscale_mode: UpscaleMode,
    },
    /// Primary output captured, secondary upscale job in flight.
    Upscaling {
        video_prompt: String,
        start_frame: String,
        primary_job_id: String,
        upscale_mode: UpscaleMode,
        primary_output_url: String,
        secondary_job_id: String,
    },
    /// Terminal success with the requested output.
    Completed {
        primary_job_id: String,
        output_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secondary_job_id: Option<String>,
    },
    /// Terminal with a fallback output, or a recorded failure.
    CompletedWithError {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback_output_url: Option<String>,
    },
}

impl PipelineState {
    /// State written by the runner once the primary job is accepted.
    pub fn submitted(
        video_prompt: impl Into<String>,
        start_frame: impl Into<String>,
        primary_job_id: impl Into<String>,
        upscale_mode: UpscaleMode,
    ) -> Self {
        Self::Submitted {
            video_prompt: video_prompt.into(),
            start_frame: start_frame.into(),
            primary_job_id: primary_job_id.into(),
            upscale_mode,
        }
    }

    /// State written when a run could not be started or resolved.
    pub fn failed(error: impl Into<String>, fallback_output_url: Option<String>) -> Self {
        Self::CompletedWithError {
            error: error.into(),
            fallback_output_url,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::Submitted { .. } => Stage::Submitted,
            Self::Upscaling { .. } => Stage::Upscaling,
            Self::Completed { .. } => Stage::Completed,
            Self::CompletedWithError { .. } => Stage::CompletedWithError,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::CompletedWithError { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Advance `submitted -> upscaling` after the primary job succeeded
    /// and the secondary job was accepted.
    pub fn into_upscaling(
        self,
        primary_output_url: impl Into<String>,
        secondary_job_id: impl Into<String>,
    ) -> Result<Self, CoreError> {
        match self {
            Self::Submitted {
                video_prompt,
                start_frame,
                primary_job_id,
                upscale_mode,
            } => Ok(Self::Upscaling {
                video_prompt,
                start_frame,
                primary_job_id,
                upscale_mode,
                primary_output_url: primary_output_url.into(),
                secondary_job_id: secondary_job_id.into(),
            }),
            other => Err(CoreError::InvalidTransition {
                from: other.stage().as_str(),
                to: Stage::Upscaling.as_str(),
            }),
        }
    }

    /// Advance a non-terminal stage to `completed` with its final output.
    pub fn into_completed(self, output_url: impl Into<String>) -> Result<Self, CoreError> {
        match self {
            Self::Submitted { primary_job_id, .. } => Ok(Self::Completed {
                primary_job_id,
                output_url: output_url.into(),
                secondary_job_id: None,
            }),
            Self::Upscaling {
                primary_job_id,
                secondary_job_id,
                ..
            } => Ok(Self::Completed {
                primary_job_id,
                output_url: output_url.into(),
                secondary_job_id: Some(secondary_job_id),
            }),
            other => Err(CoreError::InvalidTransition {
                from: other.stage().as_str(),
                to: Stage::Completed.as_str(),
            }),
        }
    }

    /// Degrade `upscaling -> completed_with_error`, keeping the primary
    /// output as the fallback artifact.
    pub fn into_degraded(self, error: impl Into<String>) -> Result<Self, CoreError> {
        match self {
            Self::Upscaling {
                primary_output_url, ..
            } => Ok(Self::CompletedWithError {
                error: error.into(),
                fallback_output_url: Some(primary_output_url),
            }),
            other => Err(CoreError::InvalidTransition {
                from: other.stage().as_str(),
                to: Stage::CompletedWithError.as_str(),
            }),
        }
    }
}
