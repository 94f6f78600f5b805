//! Template Builder
//!
//! Turns a collaborator draft plus the source content's metrics into a
//! canonical [`Template`]: scores, performance metrics, search tags and a
//! fresh id. A draft that cannot be used degrades to a fallback skeleton
//! instead of failing the extraction.

use chrono::Utc;
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;
use crate::stats::{StatsEvent, StatsHandle};
use crate::store::TemplateStore;
use crate::template::{
    EngagementMetrics, PartialTemplate, PerformanceMetrics, SourceContent, SourceMetadata,
    Template, TemplateScores, TEMPLATE_VERSION,
};
use crate::types::TemplateCategory;

/// Score used for every heuristic a fallback skeleton cannot know
pub const FALLBACK_SCORE: u8 = 50;

const BASE_QUALITY: u8 = 70;

/// `(likes + comments + shares) / audience * 100`, two decimals.
/// The audience is reach, else views, else impressions, and never below 1.
pub fn engagement_rate(metrics: &EngagementMetrics) -> f64 {
    let engagement = metrics.likes as f64 + metrics.comments as f64 + metrics.shares as f64;
    let audience = [metrics.reach, metrics.views, metrics.impressions]
        .into_iter()
        .find(|n| *n > 0)
        .unwrap_or(1);
    round_to(engagement / audience as f64 * 100.0, 2)
}

/// Share of interactions that spread the content, three decimals
pub fn viral_coefficient(metrics: &EngagementMetrics) -> f64 {
    let spreading = metrics.shares as f64 + metrics.saves as f64;
    let total = metrics.likes as f64 + spreading + metrics.comments as f64;
    if total == 0.0 {
        return 0.0;
    }
    round_to(spreading / total, 3)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Derived metrics, only when the source reported any engagement at all
pub fn performance_metrics(metrics: &EngagementMetrics) -> Option<PerformanceMetrics> {
    if metrics.is_empty() {
        return None;
    }
    Some(PerformanceMetrics {
        engagement_rate: engagement_rate(metrics),
        viral_coefficient: viral_coefficient(metrics),
        actual_shares: metrics.shares,
        actual_saves: metrics.saves,
        actual_comments: metrics.comments,
    })
}

/// What the quality heuristic looks at besides the viral score
#[derive(Debug, Clone, Copy, Default)]
pub struct QualitySignals {
    pub has_structure: bool,
    pub has_customization: bool,
    pub has_adaptation_rules: bool,
    pub has_metrics: bool,
}

/// Base 70 plus bonuses, capped at 100
pub fn quality_score(viral_score: u8, signals: QualitySignals) -> u8 {
    let mut score = BASE_QUALITY;
    score += match viral_score {
        91.. => 15,
        81..=90 => 10,
        71..=80 => 5,
        _ => 0,
    };
    if signals.has_structure {
        score += 10;
    }
    if signals.has_customization {
        score += 5;
    }
    if signals.has_adaptation_rules {
        score += 5;
    }
    if signals.has_metrics {
        score += 5;
    }
    score.min(100)
}

/// Inputs for [`search_tags`]
#[derive(Debug, Clone, Default)]
pub struct TagSource<'a> {
    pub content_type: &'a str,
    pub category: Option<TemplateCategory>,
    pub platform: &'a str,
    pub niche: Option<&'a str>,
    pub viral_score: u8,
    pub color_scheme: bool,
    pub customizable: bool,
}

/// Ordered, de-duplicated, lower-cased tags
pub fn search_tags(source: &TagSource<'_>) -> Vec<String> {
    let mut candidates: Vec<&str> = vec![source.content_type];
    if let Some(category) = source.category {
        candidates.push(category.as_str());
    }
    candidates.push(source.platform);
    if let Some(niche) = source.niche {
        candidates.push(niche);
    }
    if source.viral_score > 90 {
        candidates.push("high_viral");
    }
    if source.viral_score > 80 {
        candidates.push("viral");
    }
    if source.color_scheme {
        candidates.push("color_scheme_defined");
    }
    if source.customizable {
        candidates.push("customizable");
    }

    let mut tags: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let tag = candidate.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn prefix(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// `tmpl_<platform3>_<type3>_<millis>_<4 random alnum>`, lower-cased
pub fn generate_template_id(platform: &str, content_type: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(4)
        .map(char::from)
        .collect();
    format!(
        "tmpl_{}_{}_{}_{}",
        prefix(platform, 3),
        prefix(content_type, 3),
        Utc::now().timestamp_millis(),
        suffix
    )
    .to_lowercase()
}

/// `"Carousel Template for instagram"`
fn default_name(content_type: &str, platform: &str) -> String {
    let mut chars = content_type.chars();
    let kind = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => "Content".to_string(),
    };
    format!("{} Template for {}", kind, platform)
}

pub struct TemplateBuilder {
    store: Arc<TemplateStore<Template>>,
    stats: StatsHandle,
}

impl TemplateBuilder {
    pub fn new(store: Arc<TemplateStore<Template>>, stats: StatsHandle) -> Self {
        Self { store, stats }
    }

    /// Build a template from a draft; never fails
    pub fn build(&self, draft: Option<&Value>, source: &SourceContent) -> Template {
        match PartialTemplate::from_value(draft) {
            Some(partial) => Self::from_partial(partial, source),
            None => {
                warn!(
                    "Unusable draft for source content '{}', building fallback template",
                    source.id
                );
                Self::fallback(source)
            }
        }
    }

    /// Build, persist and account for a template
    pub async fn build_and_persist(&self, draft: Option<&Value>, source: &SourceContent) -> Result<Template> {
        let template = self.build(draft, source);
        self.store.put(template.clone()).await?;
        self.stats
            .apply(StatsEvent::TemplateCreated {
                viral_score: template.viral_score(),
                category: template.category(),
            })
            .await;
        info!(
            "Template created: {} (viral {}, quality {})",
            template.id, template.scores.viral_score, template.scores.quality_score
        );
        Ok(template)
    }

    fn source_metadata(source: &SourceContent, niche: String) -> SourceMetadata {
        SourceMetadata {
            source_platform: source.platform.clone(),
            source_content_id: source.id.clone(),
            niche,
            content_type: source.content_type.clone(),
        }
    }

    fn from_partial(partial: PartialTemplate, source: &SourceContent) -> Template {
        let viral_score = partial.viral_score().unwrap_or(FALLBACK_SCORE);
        let metrics = performance_metrics(&source.metrics);
        let customizable = partial.customization_variables.is_some();

        let adaptability_score = partial.adaptability_score().unwrap_or_else(|| {
            let mut score = 50;
            if customizable {
                score += 25;
            }
            if partial.adaptation_rules.is_some() {
                score += 25;
            }
            score
        });

        let quality_score = quality_score(
            viral_score,
            QualitySignals {
                has_structure: partial.structure().is_some(),
                has_customization: customizable,
                has_adaptation_rules: partial.adaptation_rules.is_some(),
                has_metrics: metrics.is_some(),
            },
        );

        let niche = source.niche.clone().or_else(|| partial.niche.clone());
        let name = partial
            .name
            .clone()
            .filter(|n| !n.trim().is_empty());
        // The draft's own content type labels the template when it names one
        let draft_content_type = partial
            .content_type
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let tags = search_tags(&TagSource {
            content_type: draft_content_type.unwrap_or(&source.content_type),
            category: name.as_deref().or(draft_content_type).map(TemplateCategory::infer),
            platform: &source.platform,
            niche: source.niche.as_deref(),
            viral_score,
            color_scheme: partial.has_color_scheme(),
            customizable,
        });

        Template {
            id: generate_template_id(&source.platform, &source.content_type),
            name: name.unwrap_or_else(|| default_name(&source.content_type, &source.platform)),
            created_at: Utc::now(),
            version: TEMPLATE_VERSION.to_string(),
            source_metadata: Self::source_metadata(source, niche.unwrap_or_else(|| "general".to_string())),
            scores: TemplateScores {
                viral_score,
                quality_score,
                adaptability_score,
                complexity_score: partial.complexity_score().unwrap_or(FALLBACK_SCORE),
            },
            visual_structure: partial.structure().cloned(),
            design_elements: partial.design_elements,
            content_formulas: partial.content_formulas,
            customization_variables: partial.customization_variables,
            adaptation_rules: partial.adaptation_rules,
            performance_metrics: metrics,
            search_tags: tags,
            fallback: false,
        }
    }

    fn fallback(source: &SourceContent) -> Template {
        let tags = search_tags(&TagSource {
            content_type: &source.content_type,
            platform: &source.platform,
            viral_score: FALLBACK_SCORE,
            ..Default::default()
        });

        Template {
            id: generate_template_id(&source.platform, &source.content_type),
            name: default_name(&source.content_type, &source.platform),
            created_at: Utc::now(),
            version: TEMPLATE_VERSION.to_string(),
            source_metadata: Self::source_metadata(
                source,
                source.niche.clone().unwrap_or_else(|| "general".to_string()),
            ),
            scores: TemplateScores {
                viral_score: FALLBACK_SCORE,
                quality_score: BASE_QUALITY,
                adaptability_score: FALLBACK_SCORE,
                complexity_score: FALLBACK_SCORE,
            },
            visual_structure: None,
            design_elements: None,
            content_formulas: None,
            customization_variables: None,
            adaptation_rules: None,
            performance_metrics: performance_metrics(&source.metrics),
            search_tags: tags,
            fallback: true,
        }
    }
}
