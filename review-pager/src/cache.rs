use insight_core::{category_key, FeedbackKind, SortOrder};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Composite cache key. Field values fully determine equality and hashing, so two
/// keys built from the same semantic inputs always collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: FeedbackKind,
    pub category: Option<String>,
    pub page: u32,
    pub sort: SortOrder,
}

impl CacheKey {
    pub fn new(kind: FeedbackKind, category: Option<&str>, page: u32, sort: SortOrder) -> Self {
        Self {
            kind,
            category: normalize_filter(category),
            page,
            sort,
        }
    }
}

fn normalize_filter(category: Option<&str>) -> Option<String> {
    category.map(category_key).filter(|key| !key.is_empty())
}

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub items: Vec<T>,
    pub timestamp: Instant,
    pub has_more: bool,
}

impl<T> CacheEntry<T> {
    pub fn new(items: Vec<T>, has_more: bool) -> Self {
        Self {
            items,
            timestamp: Instant::now(),
            has_more,
        }
    }
}

/// Page cache with lazy expiry. Stale entries stay in the map and read as misses
/// until the next bulk [`clear`](PagedCache::clear).
#[derive(Debug)]
pub struct PagedCache<T> {
    entries: HashMap<CacheKey, CacheEntry<T>>,
    ttl: Duration,
    scope: Option<(FeedbackKind, Option<String>)>,
}

pub type SharedCache<T> = Arc<Mutex<PagedCache<T>>>;

impl<T: Clone> PagedCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            scope: None,
        }
    }

    pub fn shared(ttl: Duration) -> SharedCache<T> {
        Arc::new(Mutex::new(Self::new(ttl)))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Raw entry, fresh or not.
    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry<T>> {
        self.entries.get(key)
    }

    pub fn put(&mut self, key: CacheKey, entry: CacheEntry<T>) {
        debug!(
            "Caching {} items for {} page {} ({})",
            entry.items.len(),
            key.kind,
            key.page,
            key.sort
        );
        self.entries.insert(key, entry);
    }

    pub fn is_valid(&self, entry: &CacheEntry<T>) -> bool {
        entry.timestamp.elapsed() < self.ttl
    }

    /// Fresh entry only; a stale one is reported as a miss and left in place.
    pub fn lookup(&self, key: &CacheKey) -> Option<&CacheEntry<T>> {
        match self.entries.get(key) {
            Some(entry) if self.is_valid(entry) => {
                debug!("Cache hit for {} page {} ({})", key.kind, key.page, key.sort);
                Some(entry)
            }
            Some(_) => {
                debug!("Stale cache entry for {} page {} ({})", key.kind, key.page, key.sort);
                None
            }
            None => {
                debug!("Cache miss for {} page {} ({})", key.kind, key.page, key.sort);
                None
            }
        }
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            debug!("Clearing {} cached pages", self.entries.len());
        }
        self.entries.clear();
    }

    /// Points the cache at a (kind, category) partition. Page and sort keys mean
    /// nothing under a different filter, so a change of scope drops everything.
    /// Returns true when entries were discarded.
    pub fn retarget(&mut self, kind: FeedbackKind, category: Option<&str>) -> bool {
        let scope = (kind, normalize_filter(category));
        if self.scope.as_ref() == Some(&scope) {
            return false;
        }

        let had_entries = !self.entries.is_empty();
        self.clear();
        self.scope = Some(scope);
        had_entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub(crate) fn lock<T>(cache: &SharedCache<T>) -> MutexGuard<'_, PagedCache<T>> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}
