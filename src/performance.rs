//! Performance prediction for adapted templates
//!
//! A deliberately simple model: the original viral score scaled by a niche
//! multiplier and a platform multiplier, each looked up in a configurable
//! table with a fallback for anything not listed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::template::ExpectedPerformance;
use crate::types::{Niche, Platform};

/// Confidence reported with every prediction
pub const PREDICTION_CONFIDENCE: f64 = 0.75;

/// Factors the prediction takes into account, in report order
pub const PREDICTION_FACTORS: &[&str] = &["niche_alignment", "platform_optimization", "historical_data"];

/// Multiplier tables, loaded from the `[performance]` config section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_niche_multipliers")]
    pub niche_multipliers: BTreeMap<Niche, f64>,
    /// Used for niches missing from the table
    #[serde(default = "default_fallback_multiplier")]
    pub default_niche_multiplier: f64,
    #[serde(default = "default_platform_multipliers")]
    pub platform_multipliers: BTreeMap<Platform, f64>,
    /// Used for platforms missing from the table
    #[serde(default = "default_fallback_multiplier")]
    pub default_platform_multiplier: f64,
}

fn default_niche_multipliers() -> BTreeMap<Niche, f64> {
    BTreeMap::from([
        (Niche::Fitness, 0.95),
        (Niche::Business, 0.90),
        (Niche::Lifestyle, 1.05),
        (Niche::Tech, 0.85),
        (Niche::Education, 0.80),
    ])
}

fn default_platform_multipliers() -> BTreeMap<Platform, f64> {
    BTreeMap::from([
        (Platform::Instagram, 1.0),
        (Platform::Tiktok, 1.1),
        (Platform::Linkedin, 0.85),
        (Platform::Youtube, 0.95),
    ])
}

fn default_fallback_multiplier() -> f64 {
    0.90
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            niche_multipliers: default_niche_multipliers(),
            default_niche_multiplier: default_fallback_multiplier(),
            platform_multipliers: default_platform_multipliers(),
            default_platform_multiplier: default_fallback_multiplier(),
        }
    }
}

/// Predicts how an adaptation will perform relative to its original
#[derive(Debug, Clone, Default)]
pub struct PerformancePredictor {
    config: PerformanceConfig,
}

impl PerformancePredictor {
    pub fn new(config: PerformanceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PerformanceConfig {
        &self.config
    }

    pub fn niche_multiplier(&self, niche: &str) -> f64 {
        Niche::parse(niche)
            .and_then(|n| self.config.niche_multipliers.get(&n).copied())
            .unwrap_or(self.config.default_niche_multiplier)
    }

    pub fn platform_multiplier(&self, platform: &str) -> f64 {
        Platform::parse(platform)
            .and_then(|p| self.config.platform_multipliers.get(&p).copied())
            .unwrap_or(self.config.default_platform_multiplier)
    }

    /// Score the adaptation is expected to reach, rounded and kept within [0, 100]
    pub fn predicted_score(&self, original_viral_score: u8, niche: &str, platform: &str) -> u8 {
        let expected = f64::from(original_viral_score)
            * self.niche_multiplier(niche)
            * self.platform_multiplier(platform);
        expected.round().clamp(0.0, 100.0) as u8
    }

    pub fn predict(&self, original_viral_score: u8, niche: &str, platform: &str) -> ExpectedPerformance {
        ExpectedPerformance {
            predicted_viral_score: self.predicted_score(original_viral_score, niche, platform),
            confidence_level: PREDICTION_CONFIDENCE,
            factors_considered: PREDICTION_FACTORS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tech_on_youtube() {
        let predictor = PerformancePredictor::default();
        // 80 * 0.85 * 0.95 = 64.6
        assert_eq!(predictor.predicted_score(80, "tech", "youtube"), 65);
    }

    #[test]
    fn test_unknown_niche_and_platform_use_defaults() {
        let predictor = PerformancePredictor::default();
        assert_eq!(predictor.niche_multiplier("gardening"), 0.90);
        assert_eq!(predictor.platform_multiplier("myspace"), 0.90);
        // 100 * 0.9 * 0.9 = 81
        assert_eq!(predictor.predicted_score(100, "gardening", "myspace"), 81);
    }

    #[test]
    fn test_prediction_is_clamped() {
        let predictor = PerformancePredictor::default();
        // 100 * 1.05 * 1.1 = 115.5
        assert_eq!(predictor.predicted_score(100, "lifestyle", "tiktok"), 100);
    }

    #[test]
    fn test_prediction_monotonic_in_original_score() {
        let predictor = PerformancePredictor::default();
        for niche in ["fitness", "business", "lifestyle", "tech", "education", "other"] {
            for platform in ["instagram", "tiktok", "linkedin", "youtube", "other"] {
                let mut previous = 0;
                for score in 0..=100u8 {
                    let predicted = predictor.predicted_score(score, niche, platform);
                    assert!(predicted >= previous, "{niche}/{platform} dropped at {score}");
                    previous = predicted;
                }
            }
        }
    }

    #[test]
    fn test_predict_reports_confidence_and_factors() {
        let expected = PerformancePredictor::default().predict(80, "fitness", "instagram");
        assert_eq!(expected.predicted_viral_score, 76);
        assert_eq!(expected.confidence_level, 0.75);
        assert_eq!(expected.factors_considered.len(), 3);
    }

    #[test]
    fn test_custom_table_from_toml() {
        let config: PerformanceConfig = toml::from_str(
            r#"
default_niche_multiplier = 1.0

[niche_multipliers]
tech = 1.2
"#,
        )
        .unwrap();
        let predictor = PerformancePredictor::new(config);
        assert_eq!(predictor.niche_multiplier("tech"), 1.2);
        assert_eq!(predictor.niche_multiplier("fitness"), 1.0);
        assert_eq!(predictor.platform_multiplier("tiktok"), 1.1);
    }
}
