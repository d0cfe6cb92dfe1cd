pub mod pipeline_record_repo;

pub use pipeline_record_repo::{NewPipelineRecord, PipelineRecordRepo};
