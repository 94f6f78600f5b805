//! Repository statistics
//!
//! Running counts and averages, updated incrementally by the writers that
//! create templates and adaptations. Nothing here touches the disk.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::types::TemplateCategory;

/// Maximum number of categories kept in the leaderboard
pub const MAX_TOP_CATEGORIES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub name: String,
    pub count: u64,
    pub avg_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStats {
    pub total_templates: u64,
    pub total_adaptations: u64,
    pub avg_viral_score: f64,
    pub top_performing_categories: Vec<CategoryStats>,
}

/// A successful write the aggregator should account for
#[derive(Debug, Clone, PartialEq)]
pub enum StatsEvent {
    TemplateCreated {
        viral_score: u8,
        category: TemplateCategory,
    },
    AdaptationCreated,
}

/// Streaming mean after the `n`-th sample, `n` counted after the increment
fn streaming_mean(previous: f64, n: u64, sample: f64) -> f64 {
    if n <= 1 {
        return sample;
    }
    let n = n as f64;
    (previous * (n - 1.0) + sample) / n
}

/// Owns the running statistics and folds write events into them
#[derive(Debug, Clone, Default)]
pub struct StatsAggregator {
    stats: RepositoryStats,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &StatsEvent) {
        match event {
            StatsEvent::TemplateCreated { viral_score, category } => {
                let score = f64::from(*viral_score);
                self.stats.total_templates += 1;
                self.stats.avg_viral_score =
                    streaming_mean(self.stats.avg_viral_score, self.stats.total_templates, score);
                self.record_category(category.as_str(), score);
            }
            StatsEvent::AdaptationCreated => {
                self.stats.total_adaptations += 1;
            }
        }
    }

    fn record_category(&mut self, name: &str, score: f64) {
        let categories = &mut self.stats.top_performing_categories;
        match categories.iter_mut().find(|c| c.name == name) {
            Some(existing) => {
                existing.count += 1;
                existing.avg_score = streaming_mean(existing.avg_score, existing.count, score);
            }
            None => categories.push(CategoryStats {
                name: name.to_string(),
                count: 1,
                avg_score: score,
            }),
        }

        categories.sort_by(|a, b| {
            b.avg_score
                .partial_cmp(&a.avg_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        categories.truncate(MAX_TOP_CATEGORIES);
    }

    pub fn stats(&self) -> &RepositoryStats {
        &self.stats
    }

    pub fn reset(&mut self) {
        self.stats = RepositoryStats::default();
    }
}

/// Cloneable handle shared by the builder and the adaptation engine
#[derive(Debug, Clone, Default)]
pub struct StatsHandle {
    inner: Arc<RwLock<StatsAggregator>>,
}

impl StatsHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn apply(&self, event: StatsEvent) {
        let mut aggregator = self.inner.write().await;
        aggregator.apply(&event);
        debug!(
            "Stats updated: {} templates, {} adaptations",
            aggregator.stats().total_templates,
            aggregator.stats().total_adaptations
        );
    }

    pub async fn snapshot(&self) -> RepositoryStats {
        self.inner.read().await.stats().clone()
    }

    /// Replace the current figures with ones folded from `events`
    pub async fn rebuild<I>(&self, events: I)
    where
        I: IntoIterator<Item = StatsEvent>,
    {
        let mut aggregator = self.inner.write().await;
        aggregator.reset();
        for event in events {
            aggregator.apply(&event);
        }
    }
}
