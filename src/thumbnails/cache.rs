//! In-memory thumbnail cache with LRU eviction.
//!
//! Keyed by source file path. Bounded by both a byte budget and an entry
//! cap, so browsing large albums for a long session stays within budget.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::Thumbnail;
use crate::config::{DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_MAX_MB};

/// Minimum memory cache size in megabytes.
const MIN_MEMORY_MB: usize = 16;

/// Maximum memory cache size in megabytes.
const MAX_MEMORY_MB: usize = 1024;

struct CacheState {
    entries: LruCache<PathBuf, Thumbnail>,
    memory_bytes: usize,
}

/// Thumbnail cache shared between the loader and its workers.
///
/// Clones share the same storage.
#[derive(Clone)]
pub struct ThumbnailCache {
    state: Arc<Mutex<CacheState>>,
    max_memory_bytes: usize,
}

impl ThumbnailCache {
    /// Create a cache limited to `max_memory_mb` (clamped) and `max_entries`.
    pub fn new(max_memory_mb: usize, max_entries: usize) -> Self {
        let max_memory_mb = max_memory_mb.clamp(MIN_MEMORY_MB, MAX_MEMORY_MB);
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);

        debug!(max_memory_mb, max_entries = capacity.get(), "Initialized thumbnail cache");

        Self::with_byte_budget(max_memory_mb * 1024 * 1024, capacity)
    }

    fn with_byte_budget(max_memory_bytes: usize, capacity: NonZeroUsize) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                memory_bytes: 0,
            })),
            max_memory_bytes,
        }
    }

    /// Look up a thumbnail, marking it most recently used.
    pub fn get(&self, path: &Path) -> Option<Thumbnail> {
        let hit = self.state.lock().entries.get(path).cloned();
        if hit.is_some() {
            trace!(?path, "Memory cache hit");
        }
        hit
    }

    /// Check presence without touching recency.
    pub fn contains(&self, path: &Path) -> bool {
        self.state.lock().entries.contains(path)
    }

    /// Insert a thumbnail, evicting least recently used entries until it fits.
    ///
    /// Returns false when the thumbnail alone exceeds the whole budget; such
    /// entries are not cached.
    pub fn insert(&self, path: PathBuf, thumbnail: Thumbnail) -> bool {
        let new_size = thumbnail.memory_bytes();
        if new_size > self.max_memory_bytes {
            debug!(?path, new_size, "Thumbnail larger than cache budget, not caching");
            return false;
        }

        let mut state = self.state.lock();

        if let Some(old) = state.entries.pop(&path) {
            state.memory_bytes = state.memory_bytes.saturating_sub(old.memory_bytes());
        }

        while state.memory_bytes + new_size > self.max_memory_bytes {
            match state.entries.pop_lru() {
                Some((evicted_path, evicted)) => {
                    state.memory_bytes = state.memory_bytes.saturating_sub(evicted.memory_bytes());
                    trace!(
                        ?evicted_path,
                        evicted_bytes = evicted.memory_bytes(),
                        current_bytes = state.memory_bytes,
                        "Evicted thumbnail from memory cache"
                    );
                }
                None => break,
            }
        }

        // The entry cap evicts on its own; keep the byte count in step.
        if let Some((evicted_path, evicted)) = state.entries.push(path, thumbnail) {
            state.memory_bytes = state.memory_bytes.saturating_sub(evicted.memory_bytes());
            trace!(?evicted_path, "Evicted thumbnail at entry cap");
        }
        state.memory_bytes += new_size;

        true
    }

    /// Clear the memory cache.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.memory_bytes = 0;
        debug!("Cleared memory cache");
    }

    /// Get the current memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.state.lock().memory_bytes
    }

    /// Get the number of entries in the memory cache.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the maximum memory limit in bytes.
    pub fn max_memory(&self) -> usize {
        self.max_memory_bytes
    }
}

impl Default for ThumbnailCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_MAX_MB, DEFAULT_CACHE_MAX_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn thumb(width: u32, height: u32) -> Thumbnail {
        Thumbnail {
            width,
            height,
            pixels: Arc::from(vec![0u8; (width * height * 4) as usize]),
        }
    }

    fn small_cache(max_bytes: usize, entries: usize) -> ThumbnailCache {
        ThumbnailCache::with_byte_budget(max_bytes, NonZeroUsize::new(entries).unwrap())
    }

    #[test]
    fn test_memory_limit_clamping() {
        let cache = ThumbnailCache::new(1, 10);
        assert_eq!(cache.max_memory(), MIN_MEMORY_MB * 1024 * 1024);

        let cache = ThumbnailCache::new(100_000, 10);
        assert_eq!(cache.max_memory(), MAX_MEMORY_MB * 1024 * 1024);

        let cache = ThumbnailCache::new(200, 10);
        assert_eq!(cache.max_memory(), 200 * 1024 * 1024);
    }

    #[test]
    fn test_insert_and_get() {
        let cache = ThumbnailCache::default();
        let path = PathBuf::from("/albums/cars/a.png");

        assert!(cache.get(&path).is_none());
        assert!(cache.insert(path.clone(), thumb(10, 10)));

        let hit = cache.get(&path).unwrap();
        assert_eq!((hit.width, hit.height), (10, 10));
        assert_eq!(cache.memory_usage(), 400);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evicts_least_recently_used_over_budget() {
        // Room for exactly two 10x10 thumbnails.
        let cache = small_cache(800, 100);
        let a = PathBuf::from("a.png");
        let b = PathBuf::from("b.png");
        let c = PathBuf::from("c.png");

        cache.insert(a.clone(), thumb(10, 10));
        cache.insert(b.clone(), thumb(10, 10));
        // Touch `a` so `b` becomes the eviction candidate.
        assert!(cache.get(&a).is_some());
        cache.insert(c.clone(), thumb(10, 10));

        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
        assert!(cache.contains(&c));
        assert_eq!(cache.memory_usage(), 800);
    }

    #[test]
    fn test_entry_cap_keeps_byte_count() {
        let cache = small_cache(1_000_000, 2);
        cache.insert("a.png".into(), thumb(10, 10));
        cache.insert("b.png".into(), thumb(10, 10));
        cache.insert("c.png".into(), thumb(10, 10));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.memory_usage(), 800);
        assert!(!cache.contains(Path::new("a.png")));
    }

    #[test]
    fn test_replacing_entry_updates_usage() {
        let cache = small_cache(1_000_000, 10);
        cache.insert("a.png".into(), thumb(10, 10));
        cache.insert("a.png".into(), thumb(5, 5));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.memory_usage(), 100);
    }

    #[test]
    fn test_oversized_entry_is_not_cached() {
        let cache = small_cache(100, 10);
        cache.insert("small.png".into(), thumb(2, 2));
        assert!(!cache.insert("huge.png".into(), thumb(10, 10)));
        assert!(cache.contains(Path::new("small.png")));
        assert_eq!(cache.memory_usage(), 16);
    }

    #[test]
    fn test_clones_share_storage() {
        let cache = ThumbnailCache::default();
        let clone = cache.clone();
        clone.insert("shared.png".into(), thumb(1, 1));
        assert!(cache.contains(Path::new("shared.png")));

        cache.clear();
        assert!(clone.is_empty());
        assert_eq!(clone.memory_usage(), 0);
    }
}
