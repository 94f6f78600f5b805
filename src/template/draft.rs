//! Partial templates produced by the analysis collaborator
//!
//! The model answers with loosely shaped JSON: camelCase or snake_case keys,
//! scores as integers, floats or strings, and any subset of the fields. This
//! module turns that into a typed draft and decides whether it is usable.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Scores nested under a `scores` object
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftScores {
    #[serde(default, alias = "viral_score", deserialize_with = "lenient_score")]
    pub viral_score: Option<u8>,
    #[serde(default, alias = "adaptability_score", deserialize_with = "lenient_score")]
    pub adaptability_score: Option<u8>,
    #[serde(default, alias = "complexity_score", deserialize_with = "lenient_score")]
    pub complexity_score: Option<u8>,
}

/// Untrusted template draft with every field optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialTemplate {
    #[serde(default, alias = "template_name", alias = "templateName")]
    pub name: Option<String>,
    #[serde(default, alias = "content_type")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub niche: Option<String>,
    #[serde(default, alias = "viral_score", deserialize_with = "lenient_score")]
    pub viral_score: Option<u8>,
    #[serde(default, alias = "adaptability_score", deserialize_with = "lenient_score")]
    pub adaptability_score: Option<u8>,
    #[serde(default, alias = "complexity_score", deserialize_with = "lenient_score")]
    pub complexity_score: Option<u8>,
    #[serde(default)]
    pub scores: Option<DraftScores>,
    #[serde(default, alias = "visual_structure")]
    pub visual_structure: Option<Value>,
    #[serde(default, alias = "script_structure")]
    pub script_structure: Option<Value>,
    #[serde(default, alias = "design_elements")]
    pub design_elements: Option<Value>,
    #[serde(default, alias = "content_formulas")]
    pub content_formulas: Option<Value>,
    #[serde(default, alias = "customization_variables")]
    pub customization_variables: Option<Value>,
    #[serde(default, alias = "adaptation_rules")]
    pub adaptation_rules: Option<Value>,
}

/// Accept a score as an integer, a float or a numeric string, clamped to [0, 100].
/// Anything else is treated as absent rather than rejecting the whole draft.
fn lenient_score<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|n| n.is_finite()).map(|n| n.round().clamp(0.0, 100.0) as u8))
}

impl PartialTemplate {
    /// Parse a collaborator response. Returns `None` when the draft is missing,
    /// not an object, malformed, or carries no recognised field.
    pub fn from_value(draft: Option<&Value>) -> Option<Self> {
        let value = match draft {
            Some(v @ Value::Object(_)) => v,
            Some(Value::String(s)) => {
                // Some models hand back the JSON document as a string
                let parsed: Value = serde_json::from_str(s).ok()?;
                return Self::from_value(Some(&parsed));
            }
            _ => return None,
        };

        match serde_json::from_value::<PartialTemplate>(value.clone()) {
            Ok(partial) if partial.is_usable() => Some(partial),
            Ok(_) => None,
            Err(e) => {
                warn!("Discarding malformed template draft: {}", e);
                None
            }
        }
    }

    pub fn is_usable(&self) -> bool {
        self.name.is_some()
            || self.viral_score().is_some()
            || self.structure().is_some()
            || self.design_elements.is_some()
            || self.content_formulas.is_some()
            || self.customization_variables.is_some()
            || self.adaptation_rules.is_some()
    }

    pub fn viral_score(&self) -> Option<u8> {
        self.viral_score
            .or_else(|| self.scores.as_ref().and_then(|s| s.viral_score))
    }

    pub fn adaptability_score(&self) -> Option<u8> {
        self.adaptability_score
            .or_else(|| self.scores.as_ref().and_then(|s| s.adaptability_score))
    }

    pub fn complexity_score(&self) -> Option<u8> {
        self.complexity_score
            .or_else(|| self.scores.as_ref().and_then(|s| s.complexity_score))
    }

    /// Visual structure for image templates, script structure for video ones
    pub fn structure(&self) -> Option<&Value> {
        self.visual_structure.as_ref().or(self.script_structure.as_ref())
    }

    pub fn has_color_scheme(&self) -> bool {
        let defines = |v: Option<&Value>| {
            v.is_some_and(|v| {
                !v.get("colorScheme").unwrap_or(&Value::Null).is_null()
                    || !v.get("color_scheme").unwrap_or(&Value::Null).is_null()
            })
        };
        defines(self.structure()) || defines(self.design_elements.as_ref())
    }
}
