//! External collaborators
//!
//! The generative model sits behind two traits: one describes the patterns
//! in a piece of content, the other rewrites a template for a new brief.
//! Both answer with loosely shaped JSON that the core normalizes itself.

pub mod llm;
pub mod prompts;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::template::{AdaptationRequest, ContentInput, SourceContent, Template};

pub use llm::{LlmClient, LlmContentAnalyzer, LlmTemplateAdapter};

/// Produces a template draft from raw content. Best effort: a failure only
/// degrades the extraction to a fallback template.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentAnalyzer: Send + Sync {
    async fn analyze(&self, input: &ContentInput, source: &SourceContent) -> Result<Value>;
}

/// Rewrites an existing template for a niche and platform.
/// A failure here is fatal to the adaptation request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemplateAdapter: Send + Sync {
    async fn adapt(&self, template: &Template, request: &AdaptationRequest) -> Result<Value>;
}
