//! Shared types used across modules
//!
//! Small enums for the vocabularies that drive storage layout, categorisation
//! and performance prediction. Free-form strings stay strings everywhere else.

use serde::{Deserialize, Serialize};

/// Platforms with a dedicated performance multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Tiktok,
    Linkedin,
    Youtube,
}

impl Platform {
    pub fn all() -> &'static [Platform] {
        &[Platform::Instagram, Platform::Tiktok, Platform::Linkedin, Platform::Youtube]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Linkedin => "linkedin",
            Platform::Youtube => "youtube",
        }
    }

    /// Parse a platform name, case-insensitively. Unknown platforms yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "instagram" => Some(Platform::Instagram),
            "tiktok" => Some(Platform::Tiktok),
            "linkedin" => Some(Platform::Linkedin),
            "youtube" => Some(Platform::Youtube),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Niches with a dedicated performance multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Niche {
    Fitness,
    Business,
    Lifestyle,
    Tech,
    Education,
}

impl Niche {
    pub fn all() -> &'static [Niche] {
        &[Niche::Fitness, Niche::Business, Niche::Lifestyle, Niche::Tech, Niche::Education]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Niche::Fitness => "fitness",
            Niche::Business => "business",
            Niche::Lifestyle => "lifestyle",
            Niche::Tech => "tech",
            Niche::Education => "education",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "fitness" => Some(Niche::Fitness),
            "business" => Some(Niche::Business),
            "lifestyle" => Some(Niche::Lifestyle),
            "tech" => Some(Niche::Tech),
            "education" => Some(Niche::Education),
            _ => None,
        }
    }
}

impl std::fmt::Display for Niche {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage directory a template lands in, derived from its content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentCategory {
    Carousels,
    Posts,
    Stories,
    Ads,
}

impl ContentCategory {
    pub fn all() -> &'static [ContentCategory] {
        &[
            ContentCategory::Carousels,
            ContentCategory::Posts,
            ContentCategory::Stories,
            ContentCategory::Ads,
        ]
    }

    /// Map a content type onto its directory; anything unrecognised is a post
    pub fn from_content_type(content_type: &str) -> Self {
        match content_type.trim().to_lowercase().as_str() {
            "carousel" | "carousels" => ContentCategory::Carousels,
            "story" | "stories" => ContentCategory::Stories,
            "ad" | "ads" => ContentCategory::Ads,
            _ => ContentCategory::Posts,
        }
    }

    pub fn dir_name(&self) -> &'static str {
        match self {
            ContentCategory::Carousels => "carousels",
            ContentCategory::Posts => "posts",
            ContentCategory::Stories => "stories",
            ContentCategory::Ads => "ads",
        }
    }
}

/// Thematic category inferred from a template name or content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateCategory {
    Transformation,
    Educational,
    BehindScenes,
    Testimonial,
    Comparison,
    List,
    Question,
    Controversial,
    Trending,
    General,
}

/// Keyword table, checked in order; the first hit wins
const CATEGORY_KEYWORDS: &[(TemplateCategory, &[&str])] = &[
    (TemplateCategory::Transformation, &["transformation", "before"]),
    (TemplateCategory::Educational, &["educational", "tips"]),
    (TemplateCategory::BehindScenes, &["behind", "process"]),
    (TemplateCategory::Testimonial, &["testimonial", "review"]),
    (TemplateCategory::Comparison, &["comparison", "vs"]),
    (TemplateCategory::List, &["list", "steps"]),
    (TemplateCategory::Question, &["question", "quiz"]),
    (TemplateCategory::Controversial, &["controversial", "debate"]),
    (TemplateCategory::Trending, &["trending", "viral"]),
];

impl TemplateCategory {
    pub fn infer(text: &str) -> Self {
        let lower = text.to_lowercase();
        CATEGORY_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(category, _)| *category)
            .unwrap_or(TemplateCategory::General)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateCategory::Transformation => "transformation",
            TemplateCategory::Educational => "educational",
            TemplateCategory::BehindScenes => "behind_scenes",
            TemplateCategory::Testimonial => "testimonial",
            TemplateCategory::Comparison => "comparison",
            TemplateCategory::List => "list",
            TemplateCategory::Question => "question",
            TemplateCategory::Controversial => "controversial",
            TemplateCategory::Trending => "trending",
            TemplateCategory::General => "general",
        }
    }
}

impl std::fmt::Display for TemplateCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
