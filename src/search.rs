//! Search / Ranking Index
//!
//! Predicate filtering over the store's cached entities followed by a
//! relevance ranking. Works the same for templates and adapted templates
//! through the [`Searchable`] view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::store::{StoredEntity, TemplateStore};
use crate::template::{AdaptedTemplate, Template};

/// Quality assumed for entities that carry none
pub const DEFAULT_QUALITY: u8 = 70;

/// Read-only view of the fields search and ranking look at
pub trait Searchable {
    fn content_type(&self) -> &str;
    fn platform(&self) -> &str;
    fn niche(&self) -> &str;
    fn viral_score(&self) -> u8;
    /// Zero when unknown
    fn quality_score(&self) -> u8;
    fn adaptability_score(&self) -> u8;
    fn tags(&self) -> Vec<String>;
    fn display_name(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}

impl Searchable for Template {
    fn content_type(&self) -> &str {
        Template::content_type(self)
    }

    fn platform(&self) -> &str {
        Template::platform(self)
    }

    fn niche(&self) -> &str {
        &self.source_metadata.niche
    }

    fn viral_score(&self) -> u8 {
        self.scores.viral_score
    }

    fn quality_score(&self) -> u8 {
        self.scores.quality_score
    }

    fn adaptability_score(&self) -> u8 {
        self.scores.adaptability_score
    }

    fn tags(&self) -> Vec<String> {
        self.search_tags.clone()
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Searchable for AdaptedTemplate {
    fn content_type(&self) -> &str {
        AdaptedTemplate::content_type(self)
    }

    fn platform(&self) -> &str {
        &self.adaptation_context.platform
    }

    fn niche(&self) -> &str {
        &self.adaptation_context.niche
    }

    fn viral_score(&self) -> u8 {
        self.expected_performance.predicted_viral_score
    }

    fn quality_score(&self) -> u8 {
        0
    }

    fn adaptability_score(&self) -> u8 {
        0
    }

    fn tags(&self) -> Vec<String> {
        self.search_tags()
    }

    fn display_name(&self) -> &str {
        &self.adapted_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.adapted_at
    }
}

/// Filters; every field that is set and non-blank must match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub niche: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_viral_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Any one of these must be among the entity's tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Free text looked up in the name, niche and tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

fn same(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Blank filters impose no constraint
fn present(filter: &Option<String>) -> Option<&str> {
    filter.as_deref().map(str::trim).filter(|f| !f.is_empty())
}

impl SearchCriteria {
    /// A tag matches the niche when it equals or contains it, ignoring case
    fn niche_matches<S: Searchable>(&self, entity: &S) -> bool {
        let Some(niche) = present(&self.niche) else {
            return false;
        };
        let niche = niche.to_lowercase();
        entity.tags().iter().any(|tag| tag.to_lowercase().contains(&niche))
    }

    fn tags_match<S: Searchable>(&self, entity: &S) -> bool {
        let wanted: Vec<String> = self
            .tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if wanted.is_empty() {
            return true;
        }
        entity
            .tags()
            .iter()
            .any(|tag| wanted.contains(&tag.to_lowercase()))
    }

    fn text_matches<S: Searchable>(&self, entity: &S, text: &str) -> bool {
        let needle = text.to_lowercase();
        let haystack = std::iter::once(entity.display_name().to_string())
            .chain(std::iter::once(entity.niche().to_string()))
            .chain(entity.tags())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        haystack.contains(&needle)
    }

    pub fn matches<S: Searchable>(&self, entity: &S) -> bool {
        if let Some(content_type) = present(&self.content_type) {
            if !same(content_type, entity.content_type()) {
                return false;
            }
        }
        if present(&self.niche).is_some() && !self.niche_matches(entity) {
            return false;
        }
        if let Some(min) = self.min_viral_score {
            if entity.viral_score() < min {
                return false;
            }
        }
        if let Some(platform) = present(&self.platform) {
            if !same(platform, entity.platform()) {
                return false;
            }
        }
        if !self.tags_match(entity) {
            return false;
        }
        if let Some(text) = present(&self.search) {
            if !self.text_matches(entity, text) {
                return false;
            }
        }
        true
    }

    pub fn relevance_score<S: Searchable>(&self, entity: &S) -> u32 {
        let quality = match entity.quality_score() {
            0 => DEFAULT_QUALITY,
            q => q,
        };
        let mut score = f64::from(entity.viral_score()) * 0.4 + f64::from(quality) * 0.3;
        if present(&self.content_type).is_some_and(|c| same(c, entity.content_type())) {
            score += 10.0;
        }
        if self.niche_matches(entity) {
            score += 15.0;
        }
        if present(&self.platform).is_some_and(|p| same(p, entity.platform())) {
            score += 5.0;
        }
        score.round() as u32
    }
}

/// An entity together with its relevance to the query that found it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranked<T> {
    #[serde(flatten)]
    pub template: T,
    pub relevance_score: u32,
}

pub type RankedTemplate = Ranked<Template>;

/// Filter and rank, highest relevance first; ties keep input order
pub fn rank<T: Searchable>(entities: Vec<T>, criteria: &SearchCriteria) -> Vec<Ranked<T>> {
    let mut ranked: Vec<Ranked<T>> = entities
        .into_iter()
        .filter(|e| criteria.matches(e))
        .map(|e| {
            let relevance_score = criteria.relevance_score(&e);
            Ranked {
                template: e,
                relevance_score,
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
    ranked
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Relevance,
    ViralScore,
    Adaptability,
    CreatedAt,
    Name,
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "relevance" => Ok(SortBy::Relevance),
            "viral_score" | "viralscore" | "viral" => Ok(SortBy::ViralScore),
            "adaptability" => Ok(SortBy::Adaptability),
            "created_at" | "createdat" | "newest" => Ok(SortBy::CreatedAt),
            "name" => Ok(SortBy::Name),
            other => Err(format!("unknown sort order '{}'", other)),
        }
    }
}

impl SortBy {
    /// Stable ordering; everything but name is descending
    fn compare<T: Searchable>(&self, a: &Ranked<T>, b: &Ranked<T>) -> Ordering {
        match self {
            SortBy::Relevance => b.relevance_score.cmp(&a.relevance_score),
            SortBy::ViralScore => b.template.viral_score().cmp(&a.template.viral_score()),
            SortBy::Adaptability => b
                .template
                .adaptability_score()
                .cmp(&a.template.adaptability_score()),
            SortBy::CreatedAt => b.template.created_at().cmp(&a.template.created_at()),
            SortBy::Name => a
                .template
                .display_name()
                .to_lowercase()
                .cmp(&b.template.display_name().to_lowercase()),
        }
    }
}

/// Criteria plus ordering and optional 1-based pagination
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(flatten)]
    pub criteria: SearchCriteria,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn new(criteria: SearchCriteria) -> Self {
        Self {
            criteria,
            ..Default::default()
        }
    }

    pub fn sorted_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    pub fn paginate(mut self, page: usize, limit: usize) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage<T> {
    pub results: Vec<Ranked<T>>,
    pub total_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,
}

/// Rank, re-order and cut one page out of `entities`
pub fn run_query<T: Searchable>(entities: Vec<T>, query: &SearchQuery) -> SearchPage<T> {
    let mut ranked = rank(entities, &query.criteria);
    if query.sort_by != SortBy::Relevance {
        ranked.sort_by(|a, b| query.sort_by.compare(a, b));
    }
    let total_count = ranked.len();

    match (query.page, query.limit) {
        (Some(page), Some(limit)) if limit > 0 => {
            let page = page.max(1);
            let results: Vec<Ranked<T>> = ranked
                .into_iter()
                .skip((page - 1).saturating_mul(limit))
                .take(limit)
                .collect();
            SearchPage {
                results,
                total_count,
                page: Some(page),
                limit: Some(limit),
                total_pages: Some(total_count.div_ceil(limit)),
            }
        }
        _ => SearchPage {
            results: ranked,
            total_count,
            page: None,
            limit: None,
            total_pages: None,
        },
    }
}

/// Search over one store, warming it from disk when needed
pub struct SearchIndex<T: StoredEntity + Searchable> {
    store: Arc<TemplateStore<T>>,
}

impl<T: StoredEntity + Searchable> SearchIndex<T> {
    pub fn new(store: Arc<TemplateStore<T>>) -> Self {
        Self { store }
    }

    pub async fn search(&self, criteria: &SearchCriteria) -> Vec<Ranked<T>> {
        let candidates = self.store.list(|e| criteria.matches(e)).await;
        debug!("Search matched {} {} entities", candidates.len(), T::KIND);
        rank(candidates, criteria)
    }

    pub async fn query(&self, query: &SearchQuery) -> SearchPage<T> {
        let candidates = self.store.list(|e| query.criteria.matches(e)).await;
        run_query(candidates, query)
    }
}
