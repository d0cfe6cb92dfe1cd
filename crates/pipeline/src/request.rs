//! Caller-facing submission request and its validation.

use serde::Deserialize;

use vidpipe_core::state::UpscaleMode;

use crate::error::PipelineError;

/// Shortest clip the providers accept.
pub const MIN_DURATION_SECS: u32 = 5;
/// Longest clip the providers accept.
pub const MAX_DURATION_SECS: u32 = 20;

/// One commercial-pipeline submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationRequest {
    /// May be empty; the enhancer or the provider's prompt expansion
    /// fills in the rest.
    pub prompt: String,
    /// Product image used as the starting frame.
    pub image: String,
    pub owner_id: Option<String>,
    /// Payment transaction hash; feeds the request-id suffix.
    pub tx_hash: Option<String>,
    /// Narration voice preset forwarded to the enhancer.
    pub voice_id: Option<String>,
    /// Clip length in seconds; defaults to the minimum.
    pub duration: Option<u32>,
    /// `default`, `2k` or `4k`; anything above default adds the
    /// secondary upscale stage.
    pub enable_upscale: Option<String>,
    /// Run the prompt enhancer before submission.
    pub enhance: bool,
    /// Set on retry to take over the previous record.
    pub request_id: Option<String>,
}

impl GenerationRequest {
    /// Check required fields and bounds, returning the normalized
    /// duration and upscale mode.
    pub fn validate(&self) -> Result<(u32, UpscaleMode), PipelineError> {
        if self.image.trim().is_empty() {
            return Err(PipelineError::Validation("image is required".to_string()));
        }

        let duration = self.duration.unwrap_or(MIN_DURATION_SECS);
        if !(MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&duration) {
            return Err(PipelineError::Validation(format!(
                "duration {duration}s outside [{MIN_DURATION_SECS}, {MAX_DURATION_SECS}]"
            )));
        }

        let upscale_mode = match self.enable_upscale.as_deref() {
            None | Some("") => UpscaleMode::Default,
            Some(value) => UpscaleMode::try_from(value.to_string())
                .map_err(|e| PipelineError::Validation(e.to_string()))?,
        };

        Ok((duration, upscale_mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "a cinematic ad".to_string(),
            image: "https://img/product.png".to_string(),
            ..GenerationRequest::default()
        }
    }

    #[test]
    fn defaults_to_minimum_duration_without_upscale() {
        let (duration, mode) = request().validate().unwrap();
        assert_eq!(duration, 5);
        assert_eq!(mode, UpscaleMode::Default);
    }

    #[test]
    fn upscale_values_parse() {
        let (_, mode) = GenerationRequest {
            enable_upscale: Some("4k".to_string()),
            ..request()
        }
        .validate()
        .unwrap();
        assert_eq!(mode, UpscaleMode::FourK);
    }

    #[test]
    fn unknown_upscale_value_is_rejected() {
        let result = GenerationRequest {
            enable_upscale: Some("8k".to_string()),
            ..request()
        }
        .validate();
        assert_matches!(result, Err(PipelineError::Validation(_)));
    }

    #[test]
    fn out_of_range_duration_is_rejected() {
        for duration in [0, 4, 21] {
            let result = GenerationRequest {
                duration: Some(duration),
                ..request()
            }
            .validate();
            assert_matches!(result, Err(PipelineError::Validation(_)), "{duration}");
        }
    }

    #[test]
    fn empty_prompt_is_accepted() {
        let result = GenerationRequest {
            prompt: String::new(),
            ..request()
        }
        .validate();
        assert!(result.is_ok());
    }

    #[test]
    fn missing_image_is_rejected() {
        let result = GenerationRequest {
            image: "  ".to_string(),
            ..request()
        }
        .validate();
        assert_matches!(result, Err(PipelineError::Validation(_)));
    }
}
