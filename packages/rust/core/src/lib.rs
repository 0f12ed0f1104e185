//! Core pipeline orchestration for the water quality auditor.
//!
//! This crate ties the four stages (visual analysis, risk mapping, resource
//! research, report composition) into one end-to-end run, `run_audit`.

pub mod analyzer;
pub mod bundle;
pub mod composer;
pub mod export;
pub mod mapper;
pub mod pipeline;
pub mod prompts;
pub mod researcher;
mod response;

#[cfg(test)]
mod testing;

pub use bundle::{InputBundle, InputBundleBuilder};
pub use export::{DEFAULT_FILE_NAME, ExportResult, export_report};
pub use pipeline::{AuditOutcome, ProgressReporter, SilentProgress, generate_report, run_audit};
