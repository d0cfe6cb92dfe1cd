pub mod pipeline_record;

pub use pipeline_record::PipelineRecord;
