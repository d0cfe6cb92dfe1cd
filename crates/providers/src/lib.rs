//! Job clients for the external generative-video inference providers.
//!
//! Every provider shares the same prediction API shape: a model-specific
//! submit endpoint returning `{ data: { id } }` and a generic
//! `predictions/{id}/result` endpoint returning a status plus output
//! URLs. [`client::PredictionClient`] owns that transport; the typed
//! model clients validate their own parameter contracts and build the
//! per-model payloads. Trait seams consumed by the pipeline coordinator
//! live in [`job`] and [`enhance`].

pub mod client;
pub mod dispatcher;
pub mod enhance;
pub mod error;
pub mod job;
pub mod kling_audio;
pub mod ltx2;
pub mod sam3;
pub mod status;
pub mod upscaler;
pub mod wan21;
pub mod wan26;

pub use error::ProviderError;
pub use status::{JobResult, JobStatus};
