use jiff::Timestamp;
use parking_lot::RwLock;
use pinhole_core::{ShortCode, UrlCache};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

/// TTL used when the configured one is zero.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Timestamp,
}

impl CacheEntry {
    fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug)]
struct Store {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl Store {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        // The sweeper may not have run yet.
        if entry.is_expired(Timestamp::now()) {
            return None;
        }
        Some(entry.value.clone())
    }

    fn insert(&self, key: String, entry: CacheEntry) {
        self.entries.write().insert(key, entry);
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn sweep(&self) -> usize {
        let now = Timestamp::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

/// A concurrent key/value cache with a per-entry time-to-live.
///
/// Reads take a shared lock and run concurrently; writes replace whole
/// entries under an exclusive lock. Expired entries are never returned and
/// are removed in bulk by a background sweeper every `ttl / 2`.
///
/// The sweeper task belongs to the cache: it is aborted when the cache is
/// dropped and only holds a weak reference to the entries in the meantime.
#[derive(Debug)]
pub struct ExpiringCache {
    store: Arc<Store>,
    sweeper: Option<JoinHandle<()>>,
}

impl ExpiringCache {
    /// Creates a cache and starts its sweeper on the current Tokio runtime.
    ///
    /// A zero `ttl` falls back to [`DEFAULT_TTL`].
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn new(ttl: Duration) -> Self {
        let mut cache = Self::without_sweeper(ttl);
        cache.sweeper = Some(spawn_sweeper(
            Arc::downgrade(&cache.store),
            cache.sweep_interval(),
        ));
        cache
    }

    /// Creates a cache whose expired entries are only removed by explicit
    /// [`sweep`](Self::sweep) calls.
    pub fn without_sweeper(ttl: Duration) -> Self {
        let ttl = if ttl.is_zero() { DEFAULT_TTL } else { ttl };
        Self {
            store: Arc::new(Store {
                entries: RwLock::new(HashMap::new()),
                ttl,
            }),
            sweeper: None,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.store.ttl
    }

    /// Period of the background sweep: half the TTL.
    pub fn sweep_interval(&self) -> Duration {
        (self.store.ttl / 2).max(MIN_SWEEP_INTERVAL)
    }

    /// Returns the value for `key` if present and unexpired.
    pub fn get(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }

    /// Inserts or overwrites `key`, expiring `ttl` from now.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let expires_at = Timestamp::now()
            .checked_add(self.store.ttl)
            .unwrap_or(Timestamp::MAX);
        self.store.insert(
            key.into(),
            CacheEntry {
                value: value.into(),
                expires_at,
            },
        );
    }

    /// Removes `key`. Absent keys are ignored.
    pub fn delete(&self, key: &str) {
        self.store.remove(key);
    }

    /// Number of entries, including expired ones the sweeper has not removed yet.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every expired entry and returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.store.sweep()
    }

    #[cfg(test)]
    fn insert_with_expiry(&self, key: &str, value: &str, expires_at: Timestamp) {
        self.store.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at,
            },
        );
    }
}

impl Drop for ExpiringCache {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

fn spawn_sweeper(store: Weak<Store>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let Some(store) = store.upgrade() else {
                break;
            };

            let removed = store.sweep();
            if removed > 0 {
                debug!(removed, remaining = store.len(), "swept expired cache entries");
            } else {
                trace!("cache sweep found no expired entries");
            }
        }
    })
}

impl UrlCache for ExpiringCache {
    fn get_url(&self, code: &ShortCode) -> Option<String> {
        let value = self.get(code.as_str());
        if value.is_some() {
            debug!(code = %code, "cache hit");
        } else {
            trace!(code = %code, "cache miss");
        }
        value
    }

    fn set_url(&self, code: &ShortCode, long_url: &str) {
        trace!(code = %code, "caching url mapping");
        self.set(code.as_str(), long_url);
    }

    fn del(&self, code: &ShortCode) {
        self.delete(code.as_str());
    }

    fn len(&self) -> usize {
        ExpiringCache::len(self)
    }
}
