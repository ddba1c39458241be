//! Rendered page caching
//!
//! [`PageCache`] keeps rendered HTML in memory for the server and serves it
//! stale-while-revalidate: an expired page is still returned while exactly
//! one caller regenerates it. [`CacheDb`] is the on-disk manifest used by
//! `generate` to skip routes that are younger than their revalidation
//! interval.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Manifest directory, relative to the site base directory
pub const CACHE_DIR: &str = ".spacetraveling-cache";

/// Manifest file, relative to the site base directory
const MANIFEST_FILE: &str = ".spacetraveling-cache/manifest.json";

/// Result of a page cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Cached and younger than the max age
    Fresh(String),
    /// Cached but expired; `refresh` is true for the one caller that should
    /// regenerate the page
    Stale { html: String, refresh: bool },
    Miss,
}

#[derive(Debug)]
struct CachedPage {
    html: String,
    rendered_at: Instant,
    refreshing: bool,
}

/// In-memory cache of rendered pages keyed by route
#[derive(Debug, Default)]
pub struct PageCache {
    pages: Mutex<HashMap<String, CachedPage>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a page, claiming the refresh if it is stale and unclaimed
    pub fn lookup(&self, key: &str, max_age: Duration) -> Lookup {
        let mut pages = self.lock();
        let Some(page) = pages.get_mut(key) else {
            return Lookup::Miss;
        };

        if page.rendered_at.elapsed() < max_age {
            return Lookup::Fresh(page.html.clone());
        }

        let refresh = !page.refreshing;
        page.refreshing = true;
        Lookup::Stale {
            html: page.html.clone(),
            refresh,
        }
    }

    /// Store a freshly rendered page
    pub fn insert(&self, key: &str, html: String) {
        self.lock().insert(
            key.to_string(),
            CachedPage {
                html,
                rendered_at: Instant::now(),
                refreshing: false,
            },
        );
    }

    /// Give up a claimed refresh so a later request can retry
    pub fn release(&self, key: &str) {
        if let Some(page) = self.lock().get_mut(key) {
            page.refreshing = false;
        }
    }

    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CachedPage>> {
        self.pages.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Generation record for one route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Hash of the rendered HTML
    pub content_hash: u64,
    pub generated_at: DateTime<Utc>,
}

/// Generation manifest, persisted between `generate` runs
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheDb {
    /// Version of the manifest format
    pub version: u32,
    /// Entries keyed by route (`/`, `/post/<uid>`)
    pub routes: BTreeMap<String, ManifestEntry>,
}

impl CacheDb {
    /// Current manifest format version
    const VERSION: u32 = 1;

    /// Create a new manifest with version set
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    /// Load the manifest from disk, or create a new empty one
    pub fn load(base_dir: &Path) -> Self {
        let path = base_dir.join(MANIFEST_FILE);
        if let Ok(content) = fs::read_to_string(&path) {
            match serde_json::from_str::<CacheDb>(&content) {
                Ok(db) if db.version == Self::VERSION => return db,
                Ok(_) => tracing::info!("Manifest version mismatch, regenerating all pages"),
                Err(e) => tracing::warn!("Ignoring unreadable manifest {:?}: {}", path, e),
            }
        }
        Self::new()
    }

    /// Save the manifest to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        fs::create_dir_all(base_dir.join(CACHE_DIR))?;

        let content = serde_json::to_string_pretty(self)?;
        fs::write(base_dir.join(MANIFEST_FILE), content)?;
        Ok(())
    }

    /// Whether `route` was generated less than `max_age` before `now`
    pub fn is_fresh(&self, route: &str, max_age: Duration, now: DateTime<Utc>) -> bool {
        let Some(entry) = self.routes.get(route) else {
            return false;
        };
        match chrono::Duration::from_std(max_age) {
            Ok(max_age) => now.signed_duration_since(entry.generated_at) < max_age,
            Err(_) => true,
        }
    }

    /// Record a generated route
    pub fn record(&mut self, route: &str, html: &str, now: DateTime<Utc>) {
        self.routes.insert(
            route.to_string(),
            ManifestEntry {
                content_hash: hash_content(html),
                generated_at: now,
            },
        );
    }

    /// Whether the stored hash matches `html`
    pub fn is_unchanged(&self, route: &str, html: &str) -> bool {
        self.routes
            .get(route)
            .is_some_and(|entry| entry.content_hash == hash_content(html))
    }

    /// Forget routes that are no longer generated
    pub fn retain_routes(&mut self, routes: &[String]) -> Vec<String> {
        let removed: Vec<String> = self
            .routes
            .keys()
            .filter(|route| !routes.contains(*route))
            .cloned()
            .collect();
        for route in &removed {
            self.routes.remove(route);
        }
        removed
    }
}

/// Calculate a hash for content
pub fn hash_content(content: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    #[test]
    fn test_page_cache_fresh_and_miss() {
        let cache = PageCache::new();
        assert_eq!(cache.lookup("/", HOUR), Lookup::Miss);

        cache.insert("/", "<html>home</html>".to_string());
        assert_eq!(
            cache.lookup("/", HOUR),
            Lookup::Fresh("<html>home</html>".to_string())
        );
        assert!(!cache.is_empty());
    }

    #[test]
    fn test_stale_entry_hands_out_one_refresh() {
        let cache = PageCache::new();
        cache.insert("/post/hooks", "old".to_string());

        assert_eq!(
            cache.lookup("/post/hooks", Duration::ZERO),
            Lookup::Stale {
                html: "old".to_string(),
                refresh: true
            }
        );
        assert_eq!(
            cache.lookup("/post/hooks", Duration::ZERO),
            Lookup::Stale {
                html: "old".to_string(),
                refresh: false
            }
        );

        cache.insert("/post/hooks", "new".to_string());
        assert_eq!(
            cache.lookup("/post/hooks", HOUR),
            Lookup::Fresh("new".to_string())
        );
    }

    #[test]
    fn test_released_refresh_can_be_claimed_again() {
        let cache = PageCache::new();
        cache.insert("/", "old".to_string());

        assert!(matches!(
            cache.lookup("/", Duration::ZERO),
            Lookup::Stale { refresh: true, .. }
        ));
        cache.release("/");
        assert!(matches!(
            cache.lookup("/", Duration::ZERO),
            Lookup::Stale { refresh: true, .. }
        ));
    }

    #[test]
    fn test_manifest_freshness() {
        let generated = Utc.with_ymd_and_hms(2021, 3, 15, 12, 0, 0).unwrap();
        let mut db = CacheDb::new();
        db.record("/post/hooks", "<html></html>", generated);

        let half_hour = Duration::from_secs(30 * 60);
        assert!(db.is_fresh("/post/hooks", half_hour, generated + chrono::Duration::minutes(10)));
        assert!(!db.is_fresh("/post/hooks", half_hour, generated + chrono::Duration::minutes(31)));
        assert!(!db.is_fresh("/", half_hour, generated));

        assert!(db.is_unchanged("/post/hooks", "<html></html>"));
        assert!(!db.is_unchanged("/post/hooks", "<html>v2</html>"));
    }

    #[test]
    fn test_manifest_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2021, 3, 15, 12, 0, 0).unwrap();

        let mut db = CacheDb::new();
        db.record("/", "home", now);
        db.save(dir.path()).unwrap();

        assert!(dir.path().join(MANIFEST_FILE).exists());
        let loaded = CacheDb::load(dir.path());
        assert_eq!(loaded.version, CacheDb::VERSION);
        assert_eq!(loaded.routes, db.routes);
    }

    #[test]
    fn test_manifest_ignores_garbage() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(CACHE_DIR)).unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "not json").unwrap();

        assert!(CacheDb::load(dir.path()).routes.is_empty());
    }

    #[test]
    fn test_retain_routes() {
        let now = Utc::now();
        let mut db = CacheDb::new();
        db.record("/", "home", now);
        db.record("/post/gone", "gone", now);

        let removed = db.retain_routes(&["/".to_string()]);
        assert_eq!(removed, vec!["/post/gone".to_string()]);
        assert_eq!(db.routes.len(), 1);
    }
}
