//! Prompt-enhancement collaborator.
//!
//! Given the user's raw prompt and product image, returns a refined
//! video direction and starting frame. Callers treat this as advisory:
//! the runner proceeds with the original inputs if enhancement fails.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderError;

/// Inputs to one enhancement call.
#[derive(Debug, Clone)]
pub struct EnhanceRequest {
    pub prompt: String,
    pub image: String,
    pub voice_id: Option<String>,
    /// Target clip length in seconds, for pacing hints.
    pub duration: u32,
}

/// Refined generation inputs.
#[derive(Debug, Clone)]
pub struct Enhanced {
    pub video_prompt: String,
    pub start_frame: String,
}

#[async_trait]
pub trait PromptEnhancer: Send + Sync {
    async fn enhance(&self, req: &EnhanceRequest) -> Result<Enhanced, ProviderError>;
}

/// Timeout for the chat-completion call.
const ENHANCE_TIMEOUT: Duration = Duration::from_secs(30);

/// Enhancer backed by an OpenAI-style chat-completion proxy.
///
/// Asks for strict-JSON output and falls back to the caller's image as
/// the start frame when the model does not supply one.
pub struct LlmEnhancer {
    http: reqwest::Client,
    url: String,
    token: String,
    model: String,
}

impl LlmEnhancer {
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            token: token.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl PromptEnhancer for LlmEnhancer {
    async fn enhance(&self, req: &EnhanceRequest) -> Result<Enhanced, ProviderError> {
        let voice_hint = req
            .voice_id
            .as_deref()
            .map(|v| format!(" Narration voice preset: {v}."))
            .unwrap_or_default();
        let instruction = format!(
            "Rewrite the following product description as a single \
             {duration}-second cinematic video direction for an \
             image-to-video model.{voice_hint} Respond with strict JSON \
             only: {{\"videoPrompt\": \"...\"}}\n\nProduct: {prompt}",
            duration = req.duration,
            prompt = req.prompt,
        );

        let body = serde_json::json!({
            "model": self.model,
            "stream": false,
            "messages": [{ "role": "user", "content": instruction }],
        });

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .timeout(ENHANCE_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        operation: "enhance",
                        timeout_secs: ENHANCE_TIMEOUT.as_secs(),
                    }
                } else {
                    ProviderError::Transport(e)
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        if !status.is_success() {
            return Err(ProviderError::Submission {
                status: status.as_u16(),
                body: text,
            });
        }

        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Malformed(format!("enhancer response: {e}")))?;
        let content = json
            .pointer("/choices/0/message/content")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ProviderError::Malformed("enhancer returned no content".to_string()))?;

        parse_enhanced(content, &req.image)
    }
}

/// Parse the model's JSON answer, tolerating surrounding prose or code
/// fences by slicing the outermost braces.
fn parse_enhanced(content: &str, fallback_frame: &str) -> Result<Enhanced, ProviderError> {
    let start = content.find('{');
    let end = content.rfind('}');
    let slice = match (start, end) {
        (Some(s), Some(e)) if s < e => &content[s..=e],
        _ => {
            return Err(ProviderError::Malformed(
                "enhancer answer contains no JSON object".to_string(),
            ))
        }
    };

    let json: serde_json::Value = serde_json::from_str(slice)
        .map_err(|e| ProviderError::Malformed(format!("enhancer answer: {e}")))?;

    let video_prompt = json
        .get("videoPrompt")
        .or_else(|| json.get("video_prompt"))
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ProviderError::Malformed("enhancer answer missing videoPrompt".to_string()))?;

    let start_frame = json
        .get("startFrame")
        .or_else(|| json.get("start_frame"))
        .and_then(serde_json::Value::as_str)
        .filter(|f| !f.is_empty())
        .unwrap_or(fallback_frame);

    Ok(Enhanced {
        video_prompt: video_prompt.to_string(),
        start_frame: start_frame.to_string(),
    })
}
