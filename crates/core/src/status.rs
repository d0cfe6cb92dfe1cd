//! Externally visible record status and the internal pipeline stage cursor.
//!
//! `status` is the coarse three-state lifecycle shown to callers;
//! `stage` tracks which external job a record is currently waiting on.
//! Stage transitions are monotonic: a record never walks backward.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Externally visible lifecycle state of a pipeline record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Processing,
    Completed,
    Failed,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<String> for RecordStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown record status '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Internal pipeline cursor. Exactly one of the non-terminal stages is
/// active while the record status is `processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Primary video-generation job submitted, awaiting its result.
    Submitted,
    /// Secondary upscale job submitted, awaiting its result.
    Upscaling,
    /// Terminal success with the requested output.
    Completed,
    /// Terminal, but resolved with a fallback output (or recorded failure).
    CompletedWithError,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Upscaling => "upscaling",
            Self::Completed => "completed",
            Self::CompletedWithError => "completed_with_error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::CompletedWithError)
    }

    /// Whether a transition to `next` is a legal forward step.
    ///
    /// `submitted -> {upscaling, completed, completed_with_error}` and
    /// `upscaling -> {completed, completed_with_error}`. Terminal stages
    /// never transition. No stage is ever revisited.
    pub fn may_advance_to(self, next: Stage) -> bool {
        match self {
            Self::Submitted => matches!(
                next,
                Self::Upscaling | Self::Completed | Self::CompletedWithError
            ),
            Self::Upscaling => matches!(next, Self::Completed | Self::CompletedWithError),
            Self::Completed | Self::CompletedWithError => false,
        }
    }
}

impl TryFrom<String> for Stage {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "submitted" => Ok(Self::Submitted),
            "upscaling" => Ok(Self::Upscaling),
            "completed" => Ok(Self::Completed),
            "completed_with_error" => Ok(Self::CompletedWithError),
            other => Err(CoreError::Validation(format!("Unknown stage '{other}'"))),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submitted_advances_forward_only() {
        assert!(Stage::Submitted.may_advance_to(Stage::Upscaling));
        assert!(Stage::Submitted.may_advance_to(Stage::Completed));
        assert!(Stage::Submitted.may_advance_to(Stage::CompletedWithError));
        assert!(!Stage::Submitted.may_advance_to(Stage::Submitted));
    }

    #[test]
    fn upscaling_never_returns_to_submitted() {
        assert!(!Stage::Upscaling.may_advance_to(Stage::Submitted));
        assert!(Stage::Upscaling.may_advance_to(Stage::Completed));
        assert!(Stage::Upscaling.may_advance_to(Stage::CompletedWithError));
    }

    #[test]
    fn terminal_stages_are_frozen() {
        for terminal in [Stage::Completed, Stage::CompletedWithError] {
            for next in [
                Stage::Submitted,
                Stage::Upscaling,
                Stage::Completed,
                Stage::CompletedWithError,
            ] {
                assert!(!terminal.may_advance_to(next));
            }
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            RecordStatus::Processing,
            RecordStatus::Completed,
            RecordStatus::Failed,
        ] {
            let parsed = RecordStatus::try_from(status.as_str().to_string()).unwrap();
            assert_eq!(parsed, status);
        }
        assert!(RecordStatus::try_from("queued".to_string()).is_err());
    }

    #[test]
    fn stage_round_trips_through_strings() {
        for stage in [
            Stage::Submitted,
            Stage::Upscaling,
            Stage::Completed,
            Stage::CompletedWithError,
        ] {
            let parsed = Stage::try_from(stage.as_str().to_string()).unwrap();
            assert_eq!(parsed, stage);
        }
        assert!(Stage::try_from("wan_submitted".to_string()).is_err());
    }
}
