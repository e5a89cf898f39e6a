//! Memoization of chunk merges.
//!
//! By default each encode call owns a private map that is dropped when the call
//! returns. A tokenizer can instead keep a bounded LRU cache for its whole
//! lifetime; that cache is shared by every call and guarded by a mutex.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use rustc_hash::FxHashMap;

/// Instance-lifetime cache of chunk -> merged symbol string.
pub(crate) type SharedCache = Mutex<LruCache<String, String>>;

pub(crate) fn shared_cache(capacity: NonZeroUsize) -> SharedCache {
    Mutex::new(LruCache::new(capacity))
}

/// Merge cache used for one encode call.
pub(crate) enum TokenCache<'a> {
    Scoped(FxHashMap<String, String>),
    Shared(&'a SharedCache),
}

impl<'a> TokenCache<'a> {
    pub(crate) fn scoped() -> Self {
        TokenCache::Scoped(FxHashMap::default())
    }

    pub(crate) fn shared(cache: &'a SharedCache) -> Self {
        TokenCache::Shared(cache)
    }

    /// Look up the merged form of `chunk`, computing it with `merge` on a miss,
    /// and hand it to `f`.
    pub(crate) fn with_merged<R>(
        &mut self,
        chunk: &str,
        merge: impl FnOnce(&str) -> String,
        f: impl FnOnce(&str) -> R,
    ) -> R {
        match self {
            TokenCache::Scoped(map) => {
                if let Some(merged) = map.get(chunk) {
                    return f(merged);
                }
                let merged = map.entry(chunk.to_string()).or_insert_with(|| merge(chunk));
                f(merged)
            }
            TokenCache::Shared(cache) => {
                // A poisoned lock only costs the memoization, not the result.
                let hit = cache
                    .lock()
                    .ok()
                    .and_then(|mut cache| cache.get(chunk).cloned());
                if let Some(merged) = hit {
                    return f(&merged);
                }
                let merged = merge(chunk);
                let result = f(&merged);
                if let Ok(mut cache) = cache.lock() {
                    cache.put(chunk.to_string(), merged);
                }
                result
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        match self {
            TokenCache::Scoped(map) => map.len(),
            TokenCache::Shared(cache) => cache.lock().map(|c| c.len()).unwrap_or(0),
        }
    }
}
