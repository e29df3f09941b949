//! Response cache with per-entry expiry.

use crate::types::ApiResponse;
use lru::LruCache;
use reqwest::Method;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// A cached value and the instant it stops being served.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Key/value store with per-entry TTL and an LRU capacity bound.
///
/// Entries are replaced wholesale on `set` and dropped lazily when a lookup
/// finds them expired. The lock is never held across an await point.
pub struct CacheStore<V = ApiResponse> {
    entries: Mutex<LruCache<String, CacheEntry<V>>>,
}

impl<V: Clone> CacheStore<V> {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up an unexpired value. Expired entries are evicted.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.lock();
        let now = Instant::now();

        let entry = entries.get(key)?;
        if !entry.is_expired(now) {
            return Some(entry.value.clone());
        }

        entries.pop(key);
        trace!(key = %key, "Evicted expired cache entry");
        None
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let entry = CacheEntry {
            key: key.clone(),
            value,
            expires_at: Instant::now() + ttl,
        };
        self.lock().put(key, entry);
    }

    /// Remove one entry. Returns whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.lock().pop(key).is_some()
    }

    /// Remove every entry whose key contains `fragment`.
    ///
    /// Returns the number of entries removed.
    pub fn remove_matching(&self, fragment: &str) -> usize {
        let mut entries = self.lock();
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.contains(fragment))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        doomed.len()
    }

    /// Drop everything (e.g. on sign-out).
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, expired ones included until looked up.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collapse duplicate slashes and strip the trailing one.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Cache key from method, normalized path and sorted query parameters.
///
/// Parameter order never changes the key.
pub fn cache_key(method: &Method, path: &str, query: &[(String, String)]) -> String {
    let mut params: Vec<&(String, String)> = query.iter().collect();
    params.sort();

    let mut key = format!("{} {}", method, normalize_path(path));
    if !params.is_empty() {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish();
        key.push('?');
        key.push_str(&encoded);
    }
    key
}
