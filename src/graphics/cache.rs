//! In-memory asset cache.
//!
//! Fonts and static images are cached by source URL. The policy is chosen by
//! the caller: `Unbounded` keeps every entry for the process lifetime,
//! `Lru { capacity }` evicts the least recently used entry once full.
//!
//! Concurrent misses on the same key both fetch; the last insert wins. Values
//! are deterministic per key, so the race is harmless.

use lru::LruCache;
use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;
use std::{future::Future, num::NonZeroUsize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Unbounded,
    Lru { capacity: usize },
}

impl CachePolicy {
    /// `Lru` when a capacity is given, `Unbounded` otherwise.
    pub fn from_capacity(capacity: Option<usize>) -> Self {
        match capacity {
            Some(capacity) => Self::Lru {
                capacity: capacity.max(1),
            },
            None => Self::Unbounded,
        }
    }
}

pub struct AssetCache<V> {
    entries: Mutex<LruCache<String, V, FxBuildHasher>>,
}

impl<V: Clone> AssetCache<V> {
    pub fn new(policy: CachePolicy) -> Self {
        let entries = match policy {
            CachePolicy::Lru { capacity } => {
                let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
                LruCache::with_hasher(capacity, FxBuildHasher)
            }
            CachePolicy::Unbounded => LruCache::unbounded_with_hasher(FxBuildHasher),
        };
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.lock().get(key).cloned()
    }

    pub fn insert(&self, key: String, value: V) {
        self.entries.lock().put(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached value for `key`, or run `fetch` and cache its
    /// result. Errors are returned as-is and never cached.
    pub async fn get_or_try_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = fetch().await?;
        self.insert(key.to_owned(), value.clone());
        Ok(value)
    }
}
