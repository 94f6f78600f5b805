//! Template Store - flat-file persistence with an in-memory cache
//!
//! Each entity is one pretty-printed JSON file under
//! `<root>/<kind>/<category>/<id>.json`. There is no index file: the
//! directory listing is the index. Writes go through a temp file and a
//! rename, serialized per id. The cache is warmed lazily, the first time a
//! listing comes back thinner than the warm threshold.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{Result, TemplateError};
use crate::template::{AdaptedTemplate, Template};
use crate::types::ContentCategory;

/// Default number of cached matches below which a listing triggers a full scan
pub const DEFAULT_WARM_THRESHOLD: usize = 10;

/// Anything the store can persist
pub trait StoredEntity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Top-level directory for this kind of entity
    const KIND: &'static str;

    fn id(&self) -> &str;

    fn storage_category(&self) -> ContentCategory;
}

impl StoredEntity for Template {
    const KIND: &'static str = "visual";

    fn id(&self) -> &str {
        &self.id
    }

    fn storage_category(&self) -> ContentCategory {
        Template::storage_category(self)
    }
}

impl StoredEntity for AdaptedTemplate {
    const KIND: &'static str = "adapted";

    fn id(&self) -> &str {
        &self.adapted_id
    }

    fn storage_category(&self) -> ContentCategory {
        AdaptedTemplate::storage_category(self)
    }
}

/// Cached entities in the order they entered the store
struct Cache<T> {
    entries: HashMap<String, T>,
    order: Vec<String>,
}

impl<T: StoredEntity> Cache<T> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn insert(&mut self, entity: T) {
        let id = entity.id().to_string();
        if self.entries.insert(id.clone(), entity).is_none() {
            self.order.push(id);
        }
    }

    /// Keep whatever is already cached; a disk read must not clobber a newer put
    fn insert_if_absent(&mut self, entity: T) -> &T {
        match self.entries.entry(entity.id().to_string()) {
            Entry::Occupied(cached) => cached.into_mut(),
            Entry::Vacant(slot) => {
                self.order.push(slot.key().clone());
                slot.insert(entity)
            }
        }
    }

    fn ordered(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }
}

/// Ids become file names, so anything that could escape the category directory is refused
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\'])
        && !id.contains('\0')
}

pub struct TemplateStore<T: StoredEntity> {
    base_dir: PathBuf,
    warm_threshold: usize,
    cache: RwLock<Cache<T>>,
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    scanned: AtomicBool,
}

impl<T: StoredEntity> TemplateStore<T> {
    /// Create a store rooted at `root`; entities live under `root/<KIND>`
    pub fn new(root: impl AsRef<Path>, warm_threshold: usize) -> Self {
        Self {
            base_dir: root.as_ref().join(T::KIND),
            warm_threshold,
            cache: RwLock::new(Cache::new()),
            write_locks: Mutex::new(HashMap::new()),
            scanned: AtomicBool::new(false),
        }
    }

    /// Directory holding this store's category folders
    pub fn root(&self) -> &Path {
        &self.base_dir
    }

    fn category_dir(&self, category: ContentCategory) -> PathBuf {
        self.base_dir.join(category.dir_name())
    }

    fn entity_path(&self, category: ContentCategory, id: &str) -> PathBuf {
        self.category_dir(category).join(format!("{}.json", id))
    }

    async fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock().await;
        locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the id's lock once no other writer holds or awaits it
    async fn release_lock(&self, id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.write_locks.lock().await;
        // One reference in the map, one here. Dropped under the map lock so
        // the next writer to finish sees an accurate count.
        let last = Arc::strong_count(&lock) == 2;
        drop(lock);
        if last {
            locks.remove(id);
        }
    }

    /// Persist an entity and cache it
    pub async fn put(&self, entity: T) -> Result<()> {
        let id = entity.id().to_string();
        if !is_valid_id(&id) {
            return Err(TemplateError::validation(id, "put", "id is not usable as a file name"));
        }

        let lock = self.lock_for(&id).await;
        let result = {
            let _guard = lock.lock().await;
            self.write(&id, entity).await
        };
        self.release_lock(&id, lock).await;
        result
    }

    async fn write(&self, id: &str, entity: T) -> Result<()> {
        let id = id.to_string();
        let dir = self.category_dir(entity.storage_category());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| TemplateError::persistence(&id, "put", e))?;

        let json = serde_json::to_string_pretty(&entity)
            .map_err(|e| TemplateError::persistence(&id, "put", e))?;

        let path = dir.join(format!("{}.json", id));
        let tmp_path = dir.join(format!("{}.json.tmp", id));
        if let Err(e) = tokio::fs::write(&tmp_path, json).await {
            warn!("Failed to write {}: {}", tmp_path.display(), e);
            return Err(TemplateError::persistence(&id, "put", e));
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            warn!("Failed to move {} into place: {}", path.display(), e);
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(TemplateError::persistence(&id, "put", e));
        }

        self.cache.write().await.insert(entity);
        debug!("Stored {} {}", T::KIND, id);
        Ok(())
    }

    /// Look an entity up, from memory first and then from disk.
    /// Unreadable or corrupt files are logged and reported as absent.
    pub async fn get(&self, id: &str) -> Option<T> {
        if let Some(entity) = self.cache.read().await.entries.get(id) {
            return Some(entity.clone());
        }
        if !is_valid_id(id) {
            return None;
        }

        for category in ContentCategory::all() {
            let path = self.entity_path(*category, id);
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!("get: failed to read {} '{}': {}", T::KIND, id, e);
                    return None;
                }
            };

            return match serde_json::from_str::<T>(&content) {
                Ok(entity) => {
                    debug!("Loaded {} {} from disk", T::KIND, id);
                    let mut cache = self.cache.write().await;
                    Some(cache.insert_if_absent(entity).clone())
                }
                Err(e) => {
                    warn!("get: corrupt {} file {}: {}", T::KIND, path.display(), e);
                    None
                }
            };
        }

        None
    }

    /// Entities matching `predicate`, in store order.
    ///
    /// When fewer than the warm threshold match in memory and the directory
    /// has never been scanned, every category folder is read first.
    pub async fn list<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let matches = self.filter_cached(&predicate).await;
        if matches.len() >= self.warm_threshold || self.scanned.load(Ordering::Acquire) {
            return matches;
        }

        self.scan().await;
        self.filter_cached(&predicate).await
    }

    /// Every entity on disk or in memory, forcing a scan if none happened yet
    pub async fn all(&self) -> Vec<T> {
        if !self.scanned.load(Ordering::Acquire) {
            self.scan().await;
        }
        self.filter_cached(&|_: &T| true).await
    }

    async fn filter_cached<F>(&self, predicate: &F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.cache
            .read()
            .await
            .ordered()
            .filter(|e| predicate(*e))
            .cloned()
            .collect()
    }

    async fn scan(&self) {
        let scans = ContentCategory::all()
            .iter()
            .map(|category| Self::scan_dir(self.category_dir(*category)));
        let found: Vec<T> = futures::future::join_all(scans)
            .await
            .into_iter()
            .flatten()
            .collect();

        let mut cache = self.cache.write().await;
        let before = cache.order.len();
        for entity in found {
            cache.insert_if_absent(entity);
        }
        self.scanned.store(true, Ordering::Release);
        debug!(
            "Scanned {}: {} new entities, {} cached",
            self.base_dir.display(),
            cache.order.len() - before,
            cache.order.len()
        );
    }

    async fn scan_dir(dir: PathBuf) -> Vec<T> {
        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to list {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let mut paths = Vec::new();
        loop {
            match reader.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if path.extension().and_then(|e| e.to_str()) == Some("json") {
                        paths.push(path);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to list {}: {}", dir.display(), e);
                    break;
                }
            }
        }
        paths.sort();

        let mut entities = Vec::with_capacity(paths.len());
        for path in paths {
            let parsed = match tokio::fs::read_to_string(&path).await {
                Ok(content) => serde_json::from_str::<T>(&content).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match parsed {
                Ok(entity) => entities.push(entity),
                Err(e) => warn!("Skipping unreadable {}: {}", path.display(), e),
            }
        }
        entities
    }

    /// Number of entities currently cached
    pub async fn len(&self) -> usize {
        self.cache.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.cache.read().await.entries.contains_key(id)
    }

    /// Copy every entity into `dest/<KIND>/<category>/`, returning how many were written
    pub async fn backup_to(&self, dest: &Path) -> Result<usize> {
        let entities = self.all().await;
        let target = dest.join(T::KIND);

        for entity in &entities {
            let dir = target.join(entity.storage_category().dir_name());
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| TemplateError::persistence(entity.id(), "backup", e))?;
            let json = serde_json::to_string_pretty(entity)
                .map_err(|e| TemplateError::persistence(entity.id(), "backup", e))?;
            tokio::fs::write(dir.join(format!("{}.json", entity.id())), json)
                .await
                .map_err(|e| TemplateError::persistence(entity.id(), "backup", e))?;
        }

        info!("Backed up {} {} entities to {}", entities.len(), T::KIND, target.display());
        Ok(entities.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{SourceMetadata, TemplateScores, TEMPLATE_VERSION};
    use chrono::Utc;
    use tempfile::tempdir;

    fn sample(id: &str, content_type: &str, viral: u8) -> Template {
        Template {
            id: id.to_string(),
            name: format!("{} template", content_type),
            created_at: Utc::now(),
            version: TEMPLATE_VERSION.to_string(),
            source_metadata: SourceMetadata {
                source_platform: "instagram".to_string(),
                source_content_id: format!("src-{}", id),
                niche: "fitness".to_string(),
                content_type: content_type.to_string(),
            },
            scores: TemplateScores {
                viral_score: viral,
                quality_score: 70,
                adaptability_score: 50,
                complexity_score: 50,
            },
            visual_structure: None,
            design_elements: None,
            content_formulas: None,
            customization_variables: None,
            adaptation_rules: None,
            performance_metrics: None,
            search_tags: vec![content_type.to_string(), "instagram".to_string()],
            fallback: false,
        }
    }

    #[tokio::test]
    async fn test_put_then_get_returns_equal_value() {
        let dir = tempdir().unwrap();
        let store = TemplateStore::<Template>::new(dir.path(), DEFAULT_WARM_THRESHOLD);
        let template = sample("tmpl_a", "carousel", 82);

        store.put(template.clone()).await.unwrap();
        assert_eq!(store.get("tmpl_a").await, Some(template));

        let path = dir.path().join("visual/carousels/tmpl_a.json");
        assert!(path.exists());
        assert!(!dir.path().join("visual/carousels/tmpl_a.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_get_reads_from_disk_on_cold_cache() {
        let dir = tempdir().unwrap();
        let template = sample("tmpl_story", "story", 60);
        TemplateStore::<Template>::new(dir.path(), 10)
            .put(template.clone())
            .await
            .unwrap();

        let cold = TemplateStore::<Template>::new(dir.path(), 10);
        assert!(!cold.contains("tmpl_story").await);
        assert_eq!(cold.get("tmpl_story").await, Some(template));
        assert!(cold.contains("tmpl_story").await);
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_missing() {
        let dir = tempdir().unwrap();
        let posts = dir.path().join("visual/posts");
        std::fs::create_dir_all(&posts).unwrap();
        std::fs::write(posts.join("tmpl_bad.json"), "{ not json").unwrap();

        let store = TemplateStore::<Template>::new(dir.path(), 10);
        assert!(store.get("tmpl_bad").await.is_none());
        assert!(store.list(|_| true).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_content_type_lands_in_posts() {
        let dir = tempdir().unwrap();
        let store = TemplateStore::<Template>::new(dir.path(), 10);
        store.put(sample("tmpl_reel", "reel", 70)).await.unwrap();
        assert!(dir.path().join("visual/posts/tmpl_reel.json").exists());
    }

    #[tokio::test]
    async fn test_list_warms_cache_from_disk() {
        let dir = tempdir().unwrap();
        let writer = TemplateStore::<Template>::new(dir.path(), 10);
        writer.put(sample("tmpl_1", "carousel", 90)).await.unwrap();
        writer.put(sample("tmpl_2", "post", 40)).await.unwrap();
        writer.put(sample("tmpl_3", "ad", 75)).await.unwrap();

        let reader = TemplateStore::<Template>::new(dir.path(), 10);
        assert_eq!(reader.len().await, 0);

        let high = reader.list(|t| t.viral_score() >= 70).await;
        assert_eq!(high.len(), 2);
        assert_eq!(reader.len().await, 3);

        // Served from memory from now on, even for entities written behind our back
        writer.put(sample("tmpl_4", "post", 99)).await.unwrap();
        assert_eq!(reader.list(|_| true).await.len(), 3);
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order() {
        let dir = tempdir().unwrap();
        let store = TemplateStore::<Template>::new(dir.path(), 1);
        for id in ["tmpl_c", "tmpl_a", "tmpl_b"] {
            store.put(sample(id, "post", 50)).await.unwrap();
        }
        let ids: Vec<String> = store.list(|_| true).await.into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["tmpl_c", "tmpl_a", "tmpl_b"]);
    }

    #[tokio::test]
    async fn test_concurrent_puts_same_id() {
        let dir = tempdir().unwrap();
        let store = Arc::new(TemplateStore::<Template>::new(dir.path(), 10));

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.put(sample("tmpl_same", "post", 50 + i)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.len().await, 1);
        let cold = TemplateStore::<Template>::new(dir.path(), 10);
        assert!(cold.get("tmpl_same").await.is_some());
    }

    #[tokio::test]
    async fn test_write_locks_are_released() {
        let dir = tempdir().unwrap();
        let store = Arc::new(TemplateStore::<Template>::new(dir.path(), 10));

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let store = store.clone();
                let id = format!("tmpl_{}", i % 3);
                tokio::spawn(async move { store.put(sample(&id, "post", 50 + i)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.len().await, 3);
        assert!(store.write_locks.lock().await.is_empty());
    }

    #[test]
    fn test_disk_copy_never_replaces_cached_entity() {
        let mut cache = Cache::new();
        let newer = sample("tmpl_race", "post", 90);
        cache.insert(newer.clone());

        let stale = sample("tmpl_race", "post", 10);
        assert_eq!(cache.insert_if_absent(stale), &newer);
        assert_eq!(cache.order.len(), 1);

        let fresh = sample("tmpl_other", "post", 40);
        assert_eq!(cache.insert_if_absent(fresh.clone()), &fresh);
        assert_eq!(cache.order, vec!["tmpl_race", "tmpl_other"]);
    }

    #[tokio::test]
    async fn test_get_racing_put_returns_latest() {
        let dir = tempdir().unwrap();
        TemplateStore::<Template>::new(dir.path(), 10)
            .put(sample("tmpl_live", "post", 10))
            .await
            .unwrap();

        let store = Arc::new(TemplateStore::<Template>::new(dir.path(), 10));
        let reader = {
            let store = store.clone();
            tokio::spawn(async move { store.get("tmpl_live").await })
        };
        store.put(sample("tmpl_live", "post", 90)).await.unwrap();
        assert!(reader.await.unwrap().is_some());

        let latest = store.get("tmpl_live").await.unwrap();
        assert_eq!(latest.scores.viral_score, 90);
    }

    #[tokio::test]
    async fn test_path_like_ids_are_refused() {
        let dir = tempdir().unwrap();
        let store = TemplateStore::<Template>::new(dir.path(), 10);
        let err = store.put(sample("../escape", "post", 50)).await.unwrap_err();
        assert_eq!(err.operation(), "put");
        assert!(store.get("../escape").await.is_none());
    }

    #[tokio::test]
    async fn test_backup_copies_everything() {
        let dir = tempdir().unwrap();
        let store = TemplateStore::<Template>::new(dir.path().join("live"), 10);
        store.put(sample("tmpl_1", "carousel", 90)).await.unwrap();
        store.put(sample("tmpl_2", "story", 40)).await.unwrap();

        let backup = dir.path().join("backup");
        assert_eq!(store.backup_to(&backup).await.unwrap(), 2);
        assert!(backup.join("visual/carousels/tmpl_1.json").exists());
        assert!(backup.join("visual/stories/tmpl_2.json").exists());
    }
}
