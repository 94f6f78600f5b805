//! Viral Templates - template repository and adaptation engine
//!
//! Turns analysed social-media content into reusable templates and adapts
//! them to new niches and platforms:
//! - Flat-file template store with a lazily warmed in-memory cache
//! - Template builder with quality scoring and search tags
//! - Multi-criteria search with relevance ranking and pagination
//! - Adaptation engine with niche/platform performance prediction
//! - Running repository statistics
//!
//! # Example
//!
//! ```ignore
//! use viral_templates::{RepositoryOptions, SearchCriteria, TemplateRepository};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let repo = TemplateRepository::open(RepositoryOptions::new("./templates"), analyzer, adapter);
//!     let criteria = SearchCriteria {
//!         niche: Some("fitness".to_string()),
//!         ..Default::default()
//!     };
//!     for hit in repo.search(&criteria).await {
//!         println!("{} ({})", hit.template.name, hit.relevance_score);
//!     }
//!     Ok(())
//! }
//! ```

// Core modules (order matters for cross-module dependencies)
pub mod types;
pub mod error;
pub mod template;
pub mod store;
pub mod stats;
pub mod performance;
pub mod builder;
pub mod search;
pub mod adaptation;
pub mod collaborator;
pub mod repository;
pub mod config;
pub mod cli;

pub use error::{Result, TemplateError};

pub use template::{
    AdaptationRequest,
    AdaptedTemplate,
    ContentInput,
    EngagementMetrics,
    PartialTemplate,
    SourceContent,
    Template,
};

pub use collaborator::{ContentAnalyzer, TemplateAdapter};

pub use search::{RankedTemplate, SearchCriteria, SearchPage, SearchQuery, SortBy};

pub use stats::RepositoryStats;

pub use repository::{RepositoryOptions, TemplateRepository};

pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
