//! Prompt text for the model-backed collaborators

use crate::template::{AdaptationRequest, ContentInput, SourceContent, Template};

pub const ANALYSIS_SYSTEM_PROMPT: &str = "You analyse viral social media content and extract reusable design templates. \
Answer with a single JSON object and nothing else. Use these keys when you can fill them: \
templateName, contentType, niche, viralScore (0-100), adaptabilityScore (0-100), complexityScore (0-100), \
visualStructure (layout, colorScheme, typography, slides or frames), scriptStructure (for video: hook, body, call to action with timings), \
designElements, contentFormulas, customizationVariables (what a brand can swap), adaptationRules (what must be kept). \
Leave out keys you cannot support from the content.";

pub const ADAPTATION_SYSTEM_PROMPT: &str = "You adapt proven viral templates to a new niche, audience and platform \
while keeping what made the original work. Answer with a single JSON object with two keys: \
adaptedStructure (the full adapted template) and customizedElements (the concrete copy, colors and assets you changed).";

pub fn analysis_prompt(input: &ContentInput, source: &SourceContent) -> String {
    let mut prompt = format!(
        "Platform: {}\nContent type: {}\nNiche: {}\n",
        source.platform,
        source.content_type,
        source.niche.as_deref().unwrap_or("unknown")
    );

    let m = &source.metrics;
    prompt.push_str(&format!(
        "Engagement: {} likes, {} comments, {} shares, {} saves, {} views\n",
        m.likes, m.comments, m.shares, m.saves, m.views
    ));

    if let Some(text) = &input.text {
        prompt.push_str(&format!("\nCaption / text:\n{}\n", text));
    }
    if let Some(url) = &input.image_url {
        prompt.push_str(&format!("\nImage: {}\n", url));
    }
    if let Some(transcript) = &input.transcript {
        prompt.push_str(&format!("\nTranscript:\n{}\n", transcript));
    }

    prompt.push_str("\nExtract the template.");
    prompt
}

pub fn adaptation_prompt(template: &Template, request: &AdaptationRequest) -> String {
    let original = serde_json::to_string_pretty(template).unwrap_or_default();
    let mut prompt = format!(
        "Original template:\n{}\n\nAdapt it for:\n- Niche: {}\n- Platform: {}\n",
        original, request.niche, request.platform
    );

    if !request.objective.trim().is_empty() {
        prompt.push_str(&format!("- Objective: {}\n", request.objective));
    }
    if !request.target_audience.trim().is_empty() {
        prompt.push_str(&format!("- Target audience: {}\n", request.target_audience));
    }
    if let Some(name) = &request.brand_name {
        prompt.push_str(&format!("- Brand: {}\n", name));
    }
    if let Some(colors) = request.brand_colors.as_ref().filter(|c| !c.is_empty()) {
        prompt.push_str(&format!("- Brand colors: {}\n", colors.join(", ")));
    }
    if let Some(voice) = &request.brand_voice {
        prompt.push_str(&format!("- Brand voice: {}\n", voice));
    }
    if let Some(context) = &request.additional_context {
        prompt.push_str(&format!("- Additional context: {}\n", context));
    }

    prompt
}
