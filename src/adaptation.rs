//! Adaptation Engine
//!
//! Produces a niche/platform-specific variant of a stored template. The
//! adaptation collaborator is called exactly once per request and nothing is
//! written unless it succeeds.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::collaborator::TemplateAdapter;
use crate::error::{Result, TemplateError};
use crate::performance::PerformancePredictor;
use crate::stats::{StatsEvent, StatsHandle};
use crate::store::TemplateStore;
use crate::template::{AdaptationContext, AdaptationRequest, AdaptedTemplate, Template, TemplateReference};

/// Placeholder confidence attached to every adaptation
pub const ADAPTATION_CONFIDENCE: f64 = 0.85;

const OPERATION: &str = "adapt";

/// `<originalId>_<niche3>_<platform2>_<last 6 digits of epoch millis>`
pub fn generate_adaptation_id(original_id: &str, niche: &str, platform: &str) -> String {
    let niche: String = niche.trim().chars().take(3).collect::<String>().to_lowercase();
    let platform: String = platform.trim().chars().take(2).collect::<String>().to_lowercase();
    let millis = Utc::now().timestamp_millis().rem_euclid(1_000_000);
    format!("{}_{}_{}_{:06}", original_id, niche, platform, millis)
}

/// Reject requests missing the fields the prediction and the id depend on
pub fn validate_request(template_id: &str, request: &AdaptationRequest) -> Result<()> {
    let mut missing = Vec::new();
    if request.niche.trim().is_empty() {
        missing.push("niche");
    }
    if request.platform.trim().is_empty() {
        missing.push("platform");
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(TemplateError::validation(
            template_id,
            OPERATION,
            format!("missing required field(s): {}", missing.join(", ")),
        ))
    }
}

/// First non-null key wins
fn pick<'a>(draft: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| draft.get(*k))
        .find(|v| !v.is_null())
}

pub struct AdaptationEngine {
    templates: Arc<TemplateStore<Template>>,
    adaptations: Arc<TemplateStore<AdaptedTemplate>>,
    adapter: Arc<dyn TemplateAdapter>,
    predictor: PerformancePredictor,
    stats: StatsHandle,
}

impl AdaptationEngine {
    pub fn new(
        templates: Arc<TemplateStore<Template>>,
        adaptations: Arc<TemplateStore<AdaptedTemplate>>,
        adapter: Arc<dyn TemplateAdapter>,
        predictor: PerformancePredictor,
        stats: StatsHandle,
    ) -> Self {
        Self {
            templates,
            adaptations,
            adapter,
            predictor,
            stats,
        }
    }

    pub fn predictor(&self) -> &PerformancePredictor {
        &self.predictor
    }

    pub async fn adapt(&self, template_id: &str, request: &AdaptationRequest) -> Result<AdaptedTemplate> {
        let original = self
            .templates
            .get(template_id)
            .await
            .ok_or_else(|| TemplateError::not_found(template_id, OPERATION))?;
        validate_request(template_id, request)?;

        let draft = match self.adapter.adapt(&original, request).await {
            Ok(draft) => draft,
            Err(e) => {
                warn!("Adaptation of {} failed upstream: {:#}", template_id, e);
                return Err(TemplateError::upstream(template_id, OPERATION, format!("{:#}", e)));
            }
        };

        let adapted = self.enrich(&original, request, draft)?;
        self.adaptations.put(adapted.clone()).await?;
        self.stats.apply(StatsEvent::AdaptationCreated).await;

        info!(
            "Template adapted: {} -> {} (predicted viral {})",
            template_id, adapted.adapted_id, adapted.expected_performance.predicted_viral_score
        );
        Ok(adapted)
    }

    fn enrich(&self, original: &Template, request: &AdaptationRequest, draft: Value) -> Result<AdaptedTemplate> {
        let Value::Object(fields) = draft else {
            return Err(TemplateError::upstream(
                &original.id,
                OPERATION,
                "adaptation draft is not a JSON object",
            ));
        };

        let adapted_structure = pick(&fields, &["adaptedStructure", "adapted_structure", "adapted_template"])
            .cloned()
            .unwrap_or_else(|| Value::Object(fields.clone()));
        let customized_elements = pick(&fields, &["customizedElements", "customized_elements"])
            .cloned()
            .unwrap_or(Value::Null);

        Ok(AdaptedTemplate {
            adapted_id: generate_adaptation_id(&original.id, &request.niche, &request.platform),
            original_template_id: original.id.clone(),
            original_template_reference: TemplateReference::from(original),
            adaptation_context: AdaptationContext::from(request),
            adaptation_request: request.clone(),
            adapted_structure,
            customized_elements,
            expected_performance: self.predictor.predict(
                original.viral_score(),
                &request.niche,
                &request.platform,
            ),
            adaptation_confidence: ADAPTATION_CONFIDENCE,
            adapted_at: Utc::now(),
        })
    }
}
