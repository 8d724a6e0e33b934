//! Single-use material store with timer-driven eviction

use crate::error::{CacheError, Result};
use crate::types::{CacheEntry, CacheStats, NewMaterial};
use chrono::Utc;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// How long an unclaimed entry stays retrievable
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Id prefix used by [`MaterialCache::put`]
pub const DEFAULT_TAG: &str = "material";

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

struct StoredEntry {
    entry: CacheEntry,
    expires_at: Instant,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, StoredEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// In-memory material cache.
///
/// Cloning yields another handle to the same store. Every entry leaves the
/// store exactly once: through [`take`](Self::take) or through its eviction
/// timer. Both paths remove under the same lock, so a racing take and
/// eviction never both see the entry.
#[derive(Clone)]
pub struct MaterialCache {
    inner: Arc<Mutex<Inner>>,
    ttl: Duration,
}

impl MaterialCache {
    /// Create a cache with the default five minute TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a cache with a custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store a material under a fresh `material_` id
    pub async fn put(&self, material: NewMaterial) -> String {
        self.put_tagged(DEFAULT_TAG, material).await
    }

    /// Store a material under a fresh id of the form `{tag}_{millis}_{suffix}`
    /// and schedule its eviction.
    pub async fn put_tagged(&self, tag: &str, material: NewMaterial) -> String {
        let expires_at = Instant::now() + self.ttl;
        let size = material.bytes.len();

        let id = {
            let mut inner = self.inner.lock().await;
            let mut id = generate_id(tag);
            while inner.entries.contains_key(&id) {
                id = generate_id(tag);
            }
            let entry = CacheEntry::new(id.clone(), material);
            inner
                .entries
                .insert(id.clone(), StoredEntry { entry, expires_at });
            id
        };

        self.schedule_eviction(id.clone(), expires_at);
        debug!(id = %id, size, ttl_secs = self.ttl.as_secs(), "Cached material");
        id
    }

    /// Remove and return the entry for `id`.
    ///
    /// Fails with [`CacheError::NotFound`] when the id was never stored,
    /// was already taken, or has reached its expiry.
    pub async fn take(&self, id: &str) -> Result<CacheEntry> {
        let mut inner = self.inner.lock().await;
        match inner.entries.remove(id) {
            Some(stored) if stored.expires_at > Instant::now() => {
                inner.hits += 1;
                debug!(id, "Took cached material");
                Ok(stored.entry)
            }
            Some(_) => {
                // Expired but the timer has not run yet
                inner.evictions += 1;
                inner.misses += 1;
                Err(CacheError::NotFound(id.to_string()))
            }
            None => {
                inner.misses += 1;
                Err(CacheError::NotFound(id.to_string()))
            }
        }
    }

    /// Whether a live entry exists for `id`, without consuming it
    pub async fn contains(&self, id: &str) -> bool {
        let inner = self.inner.lock().await;
        inner
            .entries
            .get(id)
            .is_some_and(|stored| stored.expires_at > Instant::now())
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().await;
        CacheStats {
            entries: inner.entries.len(),
            total_size: inner
                .entries
                .values()
                .map(|stored| stored.entry.size_bytes)
                .sum(),
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
        }
    }

    fn schedule_eviction(&self, id: String, expires_at: Instant) {
        let inner: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep_until(expires_at).await;
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let mut inner = inner.lock().await;
            if inner.entries.remove(&id).is_some() {
                inner.evictions += 1;
                debug!(id = %id, "Evicted expired material");
            }
        });
    }
}

impl Default for MaterialCache {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_id(tag: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}_{}_{}", tag, Utc::now().timestamp_millis(), suffix)
}
