//! Template repository facade
//!
//! Wires the stores, builder, search index, adaptation engine and stats
//! together and exposes the operations the CLI and other callers use.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::adaptation::AdaptationEngine;
use crate::builder::TemplateBuilder;
use crate::collaborator::{ContentAnalyzer, TemplateAdapter};
use crate::error::{Result, TemplateError};
use crate::performance::PerformanceConfig;
use crate::search::{Ranked, RankedTemplate, SearchCriteria, SearchIndex, SearchPage, SearchQuery};
use crate::stats::{RepositoryStats, StatsEvent, StatsHandle};
use crate::store::{TemplateStore, DEFAULT_WARM_THRESHOLD};
use crate::template::{AdaptationRequest, AdaptedTemplate, ContentInput, SourceContent, Template};

/// Settings a repository is opened with
#[derive(Debug, Clone)]
pub struct RepositoryOptions {
    pub root: PathBuf,
    pub warm_threshold: usize,
    pub performance: PerformanceConfig,
}

impl RepositoryOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            warm_threshold: DEFAULT_WARM_THRESHOLD,
            performance: PerformanceConfig::default(),
        }
    }
}

pub struct TemplateRepository {
    root: PathBuf,
    templates: Arc<TemplateStore<Template>>,
    adaptations: Arc<TemplateStore<AdaptedTemplate>>,
    analyzer: Arc<dyn ContentAnalyzer>,
    builder: TemplateBuilder,
    engine: AdaptationEngine,
    template_index: SearchIndex<Template>,
    adaptation_index: SearchIndex<AdaptedTemplate>,
    stats: StatsHandle,
}

impl TemplateRepository {
    pub fn open(
        options: RepositoryOptions,
        analyzer: Arc<dyn ContentAnalyzer>,
        adapter: Arc<dyn TemplateAdapter>,
    ) -> Self {
        let templates = Arc::new(TemplateStore::new(&options.root, options.warm_threshold));
        let adaptations = Arc::new(TemplateStore::new(&options.root, options.warm_threshold));
        let stats = StatsHandle::new();

        let builder = TemplateBuilder::new(templates.clone(), stats.clone());
        let engine = AdaptationEngine::new(
            templates.clone(),
            adaptations.clone(),
            adapter,
            crate::performance::PerformancePredictor::new(options.performance),
            stats.clone(),
        );

        Self {
            root: options.root,
            template_index: SearchIndex::new(templates.clone()),
            adaptation_index: SearchIndex::new(adaptations.clone()),
            templates,
            adaptations,
            analyzer,
            builder,
            engine,
            stats,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Analyse content and persist the resulting template.
    /// Analysis failures degrade to a fallback template; only storage errors surface.
    pub async fn extract(&self, input: &ContentInput, source: &SourceContent) -> Result<Template> {
        let draft = match self.analyzer.analyze(input, source).await {
            Ok(draft) => Some(draft),
            Err(e) => {
                let err = TemplateError::upstream(&source.id, "extract", format!("{:#}", e));
                warn!("{}; using fallback template", err);
                None
            }
        };
        self.builder.build_and_persist(draft.as_ref(), source).await
    }

    pub async fn adapt(&self, template_id: &str, request: &AdaptationRequest) -> Result<AdaptedTemplate> {
        self.engine.adapt(template_id, request).await
    }

    pub async fn search(&self, criteria: &SearchCriteria) -> Vec<RankedTemplate> {
        self.template_index.search(criteria).await
    }

    pub async fn search_page(&self, query: &SearchQuery) -> SearchPage<Template> {
        self.template_index.query(query).await
    }

    pub async fn search_adaptations(&self, criteria: &SearchCriteria) -> Vec<Ranked<AdaptedTemplate>> {
        self.adaptation_index.search(criteria).await
    }

    pub async fn get_template(&self, id: &str) -> Option<Template> {
        self.templates.get(id).await
    }

    pub async fn get_adaptation(&self, id: &str) -> Option<AdaptedTemplate> {
        self.adaptations.get(id).await
    }

    /// Figures accumulated by writes made through this repository
    pub async fn get_stats(&self) -> RepositoryStats {
        self.stats.snapshot().await
    }

    /// Rebuild the statistics from every entity on disk
    pub async fn recount_stats(&self) -> RepositoryStats {
        let templates = self.templates.all().await;
        let adaptations = self.adaptations.all().await;

        let events = templates
            .iter()
            .map(|t| StatsEvent::TemplateCreated {
                viral_score: t.viral_score(),
                category: t.category(),
            })
            .chain(adaptations.iter().map(|_| StatsEvent::AdaptationCreated))
            .collect::<Vec<_>>();
        self.stats.rebuild(events).await;

        info!(
            "Recounted stats: {} templates, {} adaptations",
            templates.len(),
            adaptations.len()
        );
        self.stats.snapshot().await
    }

    /// Snapshot every template and adaptation into `<root>/backups/backup_<timestamp>`
    pub async fn backup(&self) -> Result<PathBuf> {
        let dest = self
            .root
            .join("backups")
            .join(format!("backup_{}", Utc::now().format("%Y%m%d_%H%M%S_%3f")));
        let templates = self.templates.backup_to(&dest).await?;
        let adaptations = self.adaptations.backup_to(&dest).await?;
        info!(
            "Backup written to {} ({} templates, {} adaptations)",
            dest.display(),
            templates,
            adaptations
        );
        Ok(dest)
    }
}
