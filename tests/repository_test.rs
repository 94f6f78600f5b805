//! Integration tests for the template repository:
//! - Extraction with usable, empty and failing analysis
//! - Search and ranking over a cold store
//! - Adaptation, prediction and the failure paths
//! - Stats, recount and backup

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use viral_templates::{
    AdaptationRequest, ContentAnalyzer, ContentInput, EngagementMetrics, RepositoryOptions,
    SearchCriteria, SearchQuery, SortBy, SourceContent, Template, TemplateAdapter, TemplateError,
    TemplateRepository,
};

// =====================================================================
// STUB COLLABORATORS
// =====================================================================

/// Analyzer answering from a closure over the source metadata
struct FnAnalyzer<F>(F);

#[async_trait]
impl<F> ContentAnalyzer for FnAnalyzer<F>
where
    F: Fn(&SourceContent) -> anyhow::Result<Value> + Send + Sync,
{
    async fn analyze(&self, _input: &ContentInput, source: &SourceContent) -> anyhow::Result<Value> {
        (self.0)(source)
    }
}

/// Adapter that counts its calls
struct CountingAdapter {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingAdapter {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }
}

#[async_trait]
impl TemplateAdapter for CountingAdapter {
    async fn adapt(&self, template: &Template, request: &AdaptationRequest) -> anyhow::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("model timed out"));
        }
        Ok(json!({
            "adaptedStructure": {"basedOn": template.id, "niche": request.niche},
            "customizedElements": {"headline": format!("{} on {}", request.niche, request.platform)}
        }))
    }
}

fn static_analyzer(draft: Value) -> Arc<dyn ContentAnalyzer> {
    Arc::new(FnAnalyzer(move |_: &SourceContent| -> anyhow::Result<Value> { Ok(draft.clone()) }))
}

fn repo_with(root: &TempDir, analyzer: Arc<dyn ContentAnalyzer>, adapter: Arc<dyn TemplateAdapter>) -> TemplateRepository {
    TemplateRepository::open(RepositoryOptions::new(root.path()), analyzer, adapter)
}

fn source(content_type: &str, niche: Option<&str>) -> SourceContent {
    SourceContent {
        id: format!("src-{}", content_type),
        platform: "instagram".to_string(),
        content_type: content_type.to_string(),
        niche: niche.map(str::to_string),
        metrics: EngagementMetrics::default(),
    }
}

fn text(s: &str) -> ContentInput {
    ContentInput {
        text: Some(s.to_string()),
        ..Default::default()
    }
}

// =====================================================================
// EXTRACTION
// =====================================================================

#[tokio::test]
async fn test_empty_draft_produces_fallback_with_metrics() {
    let dir = tempdir().unwrap();
    let repo = repo_with(&dir, static_analyzer(json!({})), CountingAdapter::ok());

    let mut src = source("carousel", None);
    src.metrics = EngagementMetrics {
        likes: 100,
        comments: 10,
        shares: 5,
        views: 1000,
        ..Default::default()
    };

    let template = repo.extract(&text("anything"), &src).await.unwrap();
    assert!(template.fallback);
    assert_eq!(template.performance_metrics.as_ref().unwrap().engagement_rate, 11.5);
    assert_eq!(template.scores.quality_score, 70);
    assert_eq!(template.search_tags, vec!["carousel".to_string(), "instagram".to_string()]);
}

#[tokio::test]
async fn test_high_viral_draft_without_structure_scores_85() {
    let dir = tempdir().unwrap();
    let repo = repo_with(&dir, static_analyzer(json!({"viralScore": 95})), CountingAdapter::ok());

    let template = repo.extract(&text("x"), &source("post", None)).await.unwrap();
    assert!(!template.fallback);
    assert_eq!(template.scores.viral_score, 95);
    assert_eq!(template.scores.quality_score, 85);
}

#[tokio::test]
async fn test_analyzer_failure_degrades_to_fallback() {
    let dir = tempdir().unwrap();
    let analyzer: Arc<dyn ContentAnalyzer> =
        Arc::new(FnAnalyzer(|_: &SourceContent| -> anyhow::Result<Value> {
            Err(anyhow!("503 from provider"))
        }));
    let repo = repo_with(&dir, analyzer, CountingAdapter::ok());

    let template = repo.extract(&text("x"), &source("story", Some("tech"))).await.unwrap();
    assert!(template.fallback);
    assert_eq!(template.name, "Story Template for instagram");
    assert!(repo.get_template(&template.id).await.is_some());
    assert_eq!(repo.get_stats().await.total_templates, 1);
}

#[tokio::test]
async fn test_extracted_template_reads_back_equal_from_disk() {
    let dir = tempdir().unwrap();
    let draft = json!({
        "templateName": "Before/After Glow Up",
        "viralScore": "87",
        "visualStructure": {"layout": "split", "colorScheme": {"primary": "#FF6B6B"}},
        "adaptationRules": {"keep": ["split layout"]}
    });
    let repo = repo_with(&dir, static_analyzer(draft), CountingAdapter::ok());

    let mut src = source("carousel", Some("fitness"));
    src.metrics.likes = 250;
    src.metrics.reach = 5000;
    let template = repo.extract(&text("x"), &src).await.unwrap();

    let cold = repo_with(&dir, static_analyzer(json!({})), CountingAdapter::ok());
    assert_eq!(cold.get_template(&template.id).await, Some(template.clone()));
    assert!(template.search_tags.contains(&"transformation".to_string()));
    assert!(template.search_tags.contains(&"color_scheme_defined".to_string()));
}

// =====================================================================
// SEARCH
// =====================================================================

async fn seed_search_fixture(dir: &TempDir) {
    let draft = json!({
        "templateName": "Glow-up Carousel",
        "viralScore": 82,
        "customizationVariables": {"headline": "text"}
    });
    let repo = repo_with(dir, static_analyzer(draft), CountingAdapter::ok());
    let matching = repo.extract(&text("x"), &source("carousel", Some("fitness"))).await.unwrap();
    assert_eq!(matching.scores.quality_score, 85);
    repo.extract(&text("x"), &source("post", Some("fitness"))).await.unwrap();
}

#[tokio::test]
async fn test_search_ranks_carousel_fitness_match() {
    let dir = tempdir().unwrap();
    seed_search_fixture(&dir).await;

    // Fresh repository: search has to warm the cache from disk
    let repo = repo_with(&dir, static_analyzer(json!({})), CountingAdapter::ok());
    let results = repo
        .search(&SearchCriteria {
            content_type: Some("carousel".to_string()),
            niche: Some("fitness".to_string()),
            ..Default::default()
        })
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].template.content_type(), "carousel");
    assert_eq!(results[0].relevance_score, 83);
}

#[tokio::test]
async fn test_min_viral_score_is_respected() {
    let dir = tempdir().unwrap();
    let scores = [20u8, 55, 61, 80, 99];
    for score in scores {
        let repo = repo_with(&dir, static_analyzer(json!({"viralScore": score})), CountingAdapter::ok());
        repo.extract(&text("x"), &source("post", None)).await.unwrap();
    }

    let repo = repo_with(&dir, static_analyzer(json!({})), CountingAdapter::ok());
    let results = repo
        .search(&SearchCriteria {
            min_viral_score: Some(60),
            ..Default::default()
        })
        .await;
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.template.scores.viral_score >= 60));
}

#[tokio::test]
async fn test_search_page_sorted_by_viral_score() {
    let dir = tempdir().unwrap();
    for score in [40u8, 90, 70, 60] {
        let repo = repo_with(&dir, static_analyzer(json!({"viralScore": score})), CountingAdapter::ok());
        repo.extract(&text("x"), &source("post", None)).await.unwrap();
    }

    let repo = repo_with(&dir, static_analyzer(json!({})), CountingAdapter::ok());
    let page = repo
        .search_page(&SearchQuery::default().sorted_by(SortBy::ViralScore).paginate(1, 3))
        .await;

    assert_eq!(page.total_count, 4);
    assert_eq!(page.total_pages, Some(2));
    let scores: Vec<u8> = page.results.iter().map(|r| r.template.scores.viral_score).collect();
    assert_eq!(scores, vec![90, 70, 60]);
}

// =====================================================================
// ADAPTATION
// =====================================================================

#[tokio::test]
async fn test_adapt_tech_youtube_prediction() {
    let dir = tempdir().unwrap();
    let adapter = CountingAdapter::ok();
    let repo = repo_with(&dir, static_analyzer(json!({"viralScore": 80})), adapter.clone());
    let original = repo.extract(&text("x"), &source("carousel", Some("fitness"))).await.unwrap();

    let adapted = repo
        .adapt(&original.id, &AdaptationRequest::new("tech", "youtube"))
        .await
        .unwrap();

    assert_eq!(adapted.expected_performance.predicted_viral_score, 65);
    assert_eq!(adapted.expected_performance.confidence_level, 0.75);
    assert_eq!(adapted.original_template_id, original.id);
    assert!(adapted.adapted_id.starts_with(&format!("{}_tec_yo_", original.id)));
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);
    assert_eq!(repo.get_stats().await.total_adaptations, 1);

    let cold = repo_with(&dir, static_analyzer(json!({})), CountingAdapter::ok());
    assert_eq!(cold.get_adaptation(&adapted.adapted_id).await, Some(adapted.clone()));

    let found = cold
        .search_adaptations(&SearchCriteria {
            niche: Some("tech".to_string()),
            ..Default::default()
        })
        .await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].template.adapted_id, adapted.adapted_id);
}

#[tokio::test]
async fn test_adapt_missing_template_is_not_found() {
    let dir = tempdir().unwrap();
    let adapter = CountingAdapter::ok();
    let repo = repo_with(&dir, static_analyzer(json!({"viralScore": 80})), adapter.clone());
    repo.extract(&text("x"), &source("post", None)).await.unwrap();

    let err = repo
        .adapt("missing_id", &AdaptationRequest::new("tech", "youtube"))
        .await
        .unwrap_err();

    assert!(matches!(err, TemplateError::NotFound { .. }));
    assert_eq!(err.id(), "missing_id");
    assert_eq!(repo.get_stats().await.total_adaptations, 0);
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
    assert!(repo.search_adaptations(&SearchCriteria::default()).await.is_empty());
}

#[tokio::test]
async fn test_adapt_missing_template_with_empty_request_is_not_found() {
    let dir = tempdir().unwrap();
    let adapter = CountingAdapter::ok();
    let repo = repo_with(&dir, static_analyzer(json!({"viralScore": 80})), adapter.clone());

    let err = repo
        .adapt("missing_id", &AdaptationRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, TemplateError::NotFound { .. }));
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_adapt_rejects_blank_platform() {
    let dir = tempdir().unwrap();
    let adapter = CountingAdapter::ok();
    let repo = repo_with(&dir, static_analyzer(json!({"viralScore": 80})), adapter.clone());
    let original = repo.extract(&text("x"), &source("post", None)).await.unwrap();

    let err = repo
        .adapt(&original.id, &AdaptationRequest::new("tech", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, TemplateError::Validation { .. }));
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_adapter_failure_is_fatal_and_writes_nothing() {
    let dir = tempdir().unwrap();
    let adapter = CountingAdapter::failing();
    let repo = repo_with(&dir, static_analyzer(json!({"viralScore": 80})), adapter.clone());
    let original = repo.extract(&text("x"), &source("post", None)).await.unwrap();

    let err = repo
        .adapt(&original.id, &AdaptationRequest::new("business", "linkedin"))
        .await
        .unwrap_err();

    assert!(matches!(err, TemplateError::UpstreamAnalysis { .. }));
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);
    assert_eq!(repo.get_stats().await.total_adaptations, 0);
    assert!(!dir.path().join("adapted").exists());
}

// =====================================================================
// STATS AND BACKUP
// =====================================================================

#[tokio::test]
async fn test_average_viral_score_tracks_mean() {
    let dir = tempdir().unwrap();
    let analyzer: Arc<dyn ContentAnalyzer> = Arc::new(FnAnalyzer(|source: &SourceContent| -> anyhow::Result<Value> {
        let score: u8 = source.id.trim_start_matches("src-").parse()?;
        Ok(json!({"viralScore": score}))
    }));
    let repo = repo_with(&dir, analyzer, CountingAdapter::ok());

    let scores = [12u8, 77, 93, 40, 66, 81];
    for score in scores {
        let mut src = source("post", None);
        src.id = format!("src-{}", score);
        repo.extract(&text("x"), &src).await.unwrap();
    }

    let stats = repo.get_stats().await;
    let mean = scores.iter().map(|s| f64::from(*s)).sum::<f64>() / scores.len() as f64;
    assert_eq!(stats.total_templates, scores.len() as u64);
    assert!((stats.avg_viral_score - mean).abs() < 1e-9);
}

#[tokio::test]
async fn test_recount_rebuilds_from_disk() {
    let dir = tempdir().unwrap();
    let repo = repo_with(&dir, static_analyzer(json!({"name": "Trending sound", "viralScore": 90})), CountingAdapter::ok());
    let original = repo.extract(&text("x"), &source("post", None)).await.unwrap();
    repo.extract(&text("x"), &source("ad", None)).await.unwrap();
    repo.adapt(&original.id, &AdaptationRequest::new("lifestyle", "tiktok"))
        .await
        .unwrap();

    let fresh = repo_with(&dir, static_analyzer(json!({})), CountingAdapter::ok());
    assert_eq!(fresh.get_stats().await.total_templates, 0);

    let stats = fresh.recount_stats().await;
    assert_eq!(stats.total_templates, 2);
    assert_eq!(stats.total_adaptations, 1);
    assert_eq!(stats.avg_viral_score, 90.0);
    assert_eq!(stats.top_performing_categories[0].name, "trending");
    assert_eq!(stats.top_performing_categories[0].count, 2);
}

#[tokio::test]
async fn test_backup_snapshots_templates_and_adaptations() {
    let dir = tempdir().unwrap();
    let repo = repo_with(&dir, static_analyzer(json!({"viralScore": 75})), CountingAdapter::ok());
    let original = repo.extract(&text("x"), &source("carousel", None)).await.unwrap();
    let adapted = repo
        .adapt(&original.id, &AdaptationRequest::new("education", "youtube"))
        .await
        .unwrap();

    let dest = repo.backup().await.unwrap();
    assert!(dest.starts_with(dir.path().join("backups")));
    assert!(dest.join(format!("visual/carousels/{}.json", original.id)).exists());
    assert!(dest.join(format!("adapted/carousels/{}.json", adapted.adapted_id)).exists());
}
