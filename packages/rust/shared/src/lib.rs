//! Shared types, error model, configuration and service interfaces for the
//! water quality auditor.
//!
//! This crate is the foundation depended on by all other auditor crates.
//! It provides:
//! - [`AuditError`]: the unified error type
//! - Stage artifacts ([`VisualFindings`], [`RiskMap`], [`ResourceSet`], [`Report`])
//! - Configuration ([`AppConfig`], [`AuditConfig`], [`Credentials`], config loading)
//! - Capability traits ([`ReasoningService`], [`SearchService`])

pub mod config;
pub mod error;
pub mod services;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AuditConfig, Credentials, OpenAiConfig, OutputConfig, ResearchConfig,
    SearchFailurePolicy, SerpApiConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{AuditError, Result};
pub use services::{ReasoningRequest, ReasoningService, SearchHit, SearchQuery, SearchService};
pub use types::{
    ImageKind, Report, RequestId, ResourceCategory, ResourceLink, ResourceSet, RiskCategory,
    RiskEntry, RiskMap, SampleImage, Severity, Stage, VisualFindings,
};
