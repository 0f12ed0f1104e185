//! Capability interfaces for the external reasoning and search services.
//!
//! The pipeline only ever talks to these traits. HTTP adapters live in
//! `waterauditor-providers`; tests substitute deterministic stubs.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{ResourceCategory, SampleImage, Stage};

/// One templated request to the reasoning service.
#[derive(Debug, Clone)]
pub struct ReasoningRequest<'a> {
    /// Which stage is asking (adapters pick a model per stage).
    pub stage: Stage,
    /// Fixed instruction set for the stage.
    pub instructions: &'a str,
    /// Structured context rendered as text.
    pub prompt: String,
    /// Attached photo, for vision-capable requests.
    pub image: Option<&'a SampleImage>,
}

/// A vision-capable reasoning service that answers with free text.
pub trait ReasoningService: Send + Sync {
    fn complete(&self, request: &ReasoningRequest<'_>) -> impl Future<Output = Result<String>> + Send;
}

/// One categorized web query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub category: ResourceCategory,
}

/// A raw search result, in provider order. `link` is unvalidated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
}

/// A web search service.
pub trait SearchService: Send + Sync {
    fn search(&self, query: &SearchQuery) -> impl Future<Output = Result<Vec<SearchHit>>> + Send;
}
