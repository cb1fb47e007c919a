/*!
 * Research context caching.
 *
 * Research results are cached per normalized title for the lifetime of the
 * store. Each key owns a `OnceCell`, so concurrent jobs for the same title
 * share a single lookup; a failed lookup leaves the cell empty and a later
 * job may try again.
 */

use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::OnceCell;

use crate::translation::research::ResearchData;

type Slot = Arc<OnceCell<ResearchData>>;

/// Process-wide store of research results, shared by cloning
#[derive(Default)]
pub struct ResearchCache {
    /// Internal cache storage
    entries: Arc<RwLock<HashMap<String, Slot>>>,

    /// Cache hit counter
    hits: Arc<AtomicUsize>,

    /// Cache miss counter
    misses: Arc<AtomicUsize>,
}

impl ResearchCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Slot {
        if let Some(slot) = self.entries.read().get(key) {
            return slot.clone();
        }
        self.entries
            .write()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Get a finished research result
    pub fn get(&self, key: &str) -> Option<ResearchData> {
        self.entries.read().get(key).and_then(|slot| slot.get().cloned())
    }

    /// Return the cached result for `key`, or run `init` once to produce it.
    ///
    /// Concurrent callers for the same key wait for the first initializer.
    /// Errors are returned to the caller and not cached.
    pub async fn get_or_try_init<F, Fut, E>(&self, key: &str, init: F) -> Result<ResearchData, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResearchData, E>>,
    {
        let slot = self.slot(key);

        if let Some(data) = slot.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Research cache hit for '{}'", truncate_text(key, 40));
            return Ok(data.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Research cache miss for '{}'", truncate_text(key, 40));

        slot.get_or_try_init(init).await.cloned()
    }

    /// Store a research result directly
    pub fn store(&self, key: &str, data: ResearchData) {
        let slot = Arc::new(OnceCell::new_with(Some(data)));
        self.entries.write().insert(key.to_string(), slot);
        debug!("Cached research for '{}'", truncate_text(key, 40));
    }

    /// Get cache statistics
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        let hit_rate = if total > 0 { hits as f64 / total as f64 } else { 0.0 };

        (hits, misses, hit_rate)
    }

    /// Number of titles with a finished result
    pub fn len(&self) -> usize {
        self.entries.read().values().filter(|slot| slot.initialized()).count()
    }

    /// Check if the cache holds no finished result
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Research cache cleared");
    }
}

impl fmt::Debug for ResearchCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hits, misses, _) = self.stats();
        f.debug_struct("ResearchCache")
            .field("entries", &self.len())
            .field("hits", &hits)
            .field("misses", &misses)
            .finish()
    }
}

impl Clone for ResearchCache {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            hits: self.hits.clone(),
            misses: self.misses.clone(),
        }
    }
}

/// Truncate text to a maximum number of characters with ellipsis
pub(crate) fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}
