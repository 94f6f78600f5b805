//! Template data model
//!
//! Templates are extracted once from analysed content and never edited after
//! they are persisted. Adapted templates are derived variants that point back
//! at their original through a read-only snapshot.

pub mod draft;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{ContentCategory, TemplateCategory};

pub use draft::PartialTemplate;

/// Version stamped on every newly built template
pub const TEMPLATE_VERSION: &str = "1.0";

/// Where a template came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetadata {
    pub source_platform: String,
    pub source_content_id: String,
    pub niche: String,
    pub content_type: String,
}

/// Heuristic scores, all in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateScores {
    pub viral_score: u8,
    pub quality_score: u8,
    pub adaptability_score: u8,
    pub complexity_score: u8,
}

/// Engagement figures measured on the source content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Percentage, two decimals
    pub engagement_rate: f64,
    /// Share of engagement that spreads the content, three decimals
    pub viral_coefficient: f64,
    pub actual_shares: u64,
    pub actual_saves: u64,
    pub actual_comments: u64,
}

/// A persisted, reusable design pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub version: String,
    pub source_metadata: SourceMetadata,
    pub scores: TemplateScores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_structure: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_elements: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_formulas: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customization_variables: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adaptation_rules: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_metrics: Option<PerformanceMetrics>,
    #[serde(default)]
    pub search_tags: Vec<String>,
    /// Set when the record is the degraded skeleton built after an analysis failure
    #[serde(default)]
    pub fallback: bool,
}

impl Template {
    pub fn content_type(&self) -> &str {
        &self.source_metadata.content_type
    }

    pub fn platform(&self) -> &str {
        &self.source_metadata.source_platform
    }

    pub fn viral_score(&self) -> u8 {
        self.scores.viral_score
    }

    /// Category used for stats; falls back to the content type when the name says nothing
    pub fn category(&self) -> TemplateCategory {
        let from_name = TemplateCategory::infer(&self.name);
        if from_name == TemplateCategory::General {
            TemplateCategory::infer(self.content_type())
        } else {
            from_name
        }
    }

    pub fn storage_category(&self) -> ContentCategory {
        ContentCategory::from_content_type(self.content_type())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.search_tags.iter().any(|t| t == tag)
    }
}

/// Raw engagement counts reported for a piece of content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementMetrics {
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub shares: u64,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub saves: u64,
    #[serde(default)]
    pub reach: u64,
    #[serde(default)]
    pub impressions: u64,
}

impl EngagementMetrics {
    pub fn is_empty(&self) -> bool {
        *self == EngagementMetrics::default()
    }
}

/// Metadata of the content a template is extracted from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceContent {
    pub id: String,
    pub platform: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub niche: Option<String>,
    #[serde(default)]
    pub metrics: EngagementMetrics,
}

/// Raw content handed to the analysis collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

/// What a caller wants an existing template turned into
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptationRequest {
    #[serde(default)]
    pub objective: String,
    pub niche: String,
    #[serde(default)]
    pub target_audience: String,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_colors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

impl AdaptationRequest {
    pub fn new(niche: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            niche: niche.into(),
            platform: platform.into(),
            ..Default::default()
        }
    }

    pub fn with_objective(mut self, objective: impl Into<String>) -> Self {
        self.objective = objective.into();
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.target_audience = audience.into();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptationContext {
    pub objective: String,
    pub niche: String,
    pub target_audience: String,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<BrandProfile>,
}

impl From<&AdaptationRequest> for AdaptationContext {
    fn from(request: &AdaptationRequest) -> Self {
        let has_brand = request.brand_name.is_some()
            || request.brand_voice.is_some()
            || request.brand_colors.as_ref().is_some_and(|c| !c.is_empty());
        let brand = has_brand.then(|| BrandProfile {
            name: request.brand_name.clone(),
            colors: request.brand_colors.clone().unwrap_or_default(),
            voice: request.brand_voice.clone(),
        });
        Self {
            objective: request.objective.clone(),
            niche: request.niche.clone(),
            target_audience: request.target_audience.clone(),
            platform: request.platform.clone(),
            brand,
        }
    }
}

/// Snapshot of the original taken at adaptation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateReference {
    pub template_id: String,
    pub viral_score: u8,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_metrics: Option<PerformanceMetrics>,
}

impl From<&Template> for TemplateReference {
    fn from(template: &Template) -> Self {
        Self {
            template_id: template.id.clone(),
            viral_score: template.viral_score(),
            content_type: template.content_type().to_string(),
            performance_metrics: template.performance_metrics.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedPerformance {
    pub predicted_viral_score: u8,
    pub confidence_level: f64,
    pub factors_considered: Vec<String>,
}

/// A niche/platform-specific variant of a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptedTemplate {
    pub adapted_id: String,
    pub original_template_id: String,
    pub original_template_reference: TemplateReference,
    pub adaptation_context: AdaptationContext,
    pub adaptation_request: AdaptationRequest,
    #[serde(default)]
    pub adapted_structure: Value,
    #[serde(default)]
    pub customized_elements: Value,
    pub expected_performance: ExpectedPerformance,
    pub adaptation_confidence: f64,
    pub adapted_at: DateTime<Utc>,
}

impl AdaptedTemplate {
    pub fn content_type(&self) -> &str {
        &self.original_template_reference.content_type
    }

    pub fn storage_category(&self) -> ContentCategory {
        ContentCategory::from_content_type(self.content_type())
    }

    /// Tags derived from the adaptation context, used for niche matching
    pub fn search_tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        for tag in [
            self.content_type(),
            self.adaptation_context.niche.as_str(),
            self.adaptation_context.platform.as_str(),
        ] {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }
}
