//! Shared domain types and pure logic for the vidpipe workspace.
//!
//! Holds the error taxonomy, the pipeline record state machine
//! (status/stage/tagged pipeline state), request-id synthesis, and the
//! generic bounded poll loop. Everything here is free of I/O except
//! [`poll`], which owns the inter-attempt waits.

pub mod error;
pub mod poll;
pub mod request_id;
pub mod state;
pub mod status;
pub mod types;
