//! Pipeline orchestration: submission, persistence seam, and the
//! background reconciliation scans.

pub mod error;
pub mod request;
pub mod runner;
pub mod scheduler;
pub mod store;

pub use error::PipelineError;
pub use request::GenerationRequest;
pub use runner::PipelineRunner;
pub use scheduler::{ReconciliationScheduler, ScanSummary, SchedulerOptions};
pub use store::{PgRecordStore, RecordStore};
