//! The bounded LRU store behind the cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CacheError, Result};

/// Cache limits and behavior.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of live entries.
    pub max_entries: usize,
    /// Maximum total serialized size of live entries.
    pub max_size_bytes: usize,
    /// How long an entry stays valid after insertion.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            max_size_bytes: 32 * 1024 * 1024,
            ttl: Duration::hours(24),
        }
    }
}

/// Counters for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct CacheEntry {
    value: Value,
    size_bytes: usize,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    /// Monotonic access counter breaking ties between equal instants.
    touch_seq: u64,
}

/// On-disk shape of one entry.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiskEntry {
    key: String,
    value: Value,
    size_bytes: usize,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    total_bytes: usize,
    seq: u64,
    stats: CacheStats,
}

/// A byte- and count-bounded LRU cache of JSON artifacts.
pub struct ResponseCache {
    inner: Mutex<CacheInner>,
    config: CacheConfig,
    disk_dir: Option<PathBuf>,
}

impl ResponseCache {
    /// An in-memory cache with the given limits.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                total_bytes: 0,
                seq: 0,
                stats: CacheStats::default(),
            }),
            config,
            disk_dir: None,
        }
    }

    /// Attach a spill directory, loading any unexpired entries found there.
    ///
    /// Spill is best-effort: write and delete failures are logged and
    /// otherwise ignored.
    pub fn with_disk(config: CacheConfig, dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let mut cache = Self::new(config);
        cache.disk_dir = Some(dir.clone());
        cache.load_disk(&dir);
        Ok(cache)
    }

    /// Look up a key, refreshing its recency on hit.
    ///
    /// Expired entries are dropped lazily here and count as misses.
    pub fn get(&self, key: &str) -> Option<Value> {
        #[derive(PartialEq)]
        enum Lookup {
            Missing,
            Expired,
            Live,
        }

        let now = Utc::now();
        let mut inner = self.inner.lock();
        let lookup = match inner.entries.get(key) {
            None => Lookup::Missing,
            Some(entry) if entry.expires_at <= now => Lookup::Expired,
            Some(_) => Lookup::Live,
        };
        match lookup {
            Lookup::Missing => {
                inner.stats.misses += 1;
                None
            }
            Lookup::Expired => {
                if let Some(entry) = inner.entries.remove(key) {
                    inner.total_bytes -= entry.size_bytes;
                }
                inner.stats.misses += 1;
                drop(inner);
                self.remove_disk(key);
                None
            }
            Lookup::Live => {
                inner.seq += 1;
                let seq = inner.seq;
                inner.stats.hits += 1;
                inner.entries.get_mut(key).map(|entry| {
                    entry.last_accessed_at = now;
                    entry.touch_seq = seq;
                    entry.value.clone()
                })
            }
        }
    }

    /// Insert a value under a key with the default TTL.
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        self.set_with_ttl(key, value, self.config.ttl)
    }

    /// Insert a value under a key with an explicit TTL.
    ///
    /// An entry whose own size exceeds the byte budget is refused; otherwise
    /// LRU entries are evicted until both caps hold.
    pub fn set_with_ttl(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let size_bytes = serde_json::to_string(&value)?.len();
        if size_bytes > self.config.max_size_bytes {
            return Err(CacheError::EntryTooLarge {
                size: size_bytes,
                max: self.config.max_size_bytes,
            });
        }

        let now = Utc::now();
        let mut evicted_keys = Vec::new();
        {
            let mut inner = self.inner.lock();
            if let Some(old) = inner.entries.remove(key) {
                inner.total_bytes -= old.size_bytes;
            }
            inner.seq += 1;
            let seq = inner.seq;
            inner.entries.insert(
                key.to_string(),
                CacheEntry {
                    value: value.clone(),
                    size_bytes,
                    created_at: now,
                    last_accessed_at: now,
                    expires_at: now + ttl,
                    touch_seq: seq,
                },
            );
            inner.total_bytes += size_bytes;

            while inner.entries.len() > self.config.max_entries
                || inner.total_bytes > self.config.max_size_bytes
            {
                let Some(victim) = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| (e.last_accessed_at, e.touch_seq))
                    .map(|(k, _)| k.clone())
                else {
                    break;
                };
                if let Some(entry) = inner.entries.remove(&victim) {
                    inner.total_bytes -= entry.size_bytes;
                }
                inner.stats.evictions += 1;
                debug!(key = %victim, "evicted lru cache entry");
                evicted_keys.push(victim);
            }
        }

        for victim in &evicted_keys {
            self.remove_disk(victim);
        }
        self.write_disk(key, &value, size_bytes, now, now + ttl);
        Ok(())
    }

    /// Drop every expired entry.
    pub fn prune(&self) -> usize {
        let now = Utc::now();
        let mut dropped = Vec::new();
        {
            let mut inner = self.inner.lock();
            let expired: Vec<String> = inner
                .entries
                .iter()
                .filter(|(_, e)| e.expires_at <= now)
                .map(|(k, _)| k.clone())
                .collect();
            for key in expired {
                if let Some(entry) = inner.entries.remove(&key) {
                    inner.total_bytes -= entry.size_bytes;
                }
                dropped.push(key);
            }
        }
        for key in &dropped {
            self.remove_disk(key);
        }
        dropped.len()
    }

    /// Remove everything.
    pub fn clear(&self) {
        let keys: Vec<String> = {
            let mut inner = self.inner.lock();
            let keys = inner.entries.keys().cloned().collect();
            inner.entries.clear();
            inner.total_bytes = 0;
            keys
        };
        for key in &keys {
            self.remove_disk(key);
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total serialized size of live entries.
    pub fn total_bytes(&self) -> usize {
        self.inner.lock().total_bytes
    }

    /// Hit/miss/eviction counters.
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats
    }

    fn load_disk(&mut self, dir: &Path) {
        let Ok(listing) = std::fs::read_dir(dir) else {
            return;
        };
        let now = Utc::now();
        let mut inner = self.inner.lock();
        for file in listing.flatten() {
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(raw) = std::fs::read_to_string(&path) else {
                continue;
            };
            let Ok(entry) = serde_json::from_str::<DiskEntry>(&raw) else {
                warn!(path = %path.display(), "skipping unreadable cache file");
                continue;
            };
            if entry.expires_at <= now {
                let _ = std::fs::remove_file(&path);
                continue;
            }
            if inner.entries.len() >= self.config.max_entries
                || inner.total_bytes + entry.size_bytes > self.config.max_size_bytes
            {
                break;
            }
            inner.seq += 1;
            let seq = inner.seq;
            inner.total_bytes += entry.size_bytes;
            inner.entries.insert(
                entry.key.clone(),
                CacheEntry {
                    value: entry.value,
                    size_bytes: entry.size_bytes,
                    created_at: entry.created_at,
                    last_accessed_at: entry.last_accessed_at,
                    expires_at: entry.expires_at,
                    touch_seq: seq,
                },
            );
        }
        debug!(entries = inner.entries.len(), "loaded cache spill directory");
    }

    fn write_disk(
        &self,
        key: &str,
        value: &Value,
        size_bytes: usize,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) {
        let Some(dir) = &self.disk_dir else {
            return;
        };
        let entry = DiskEntry {
            key: key.to_string(),
            value: value.clone(),
            size_bytes,
            created_at,
            last_accessed_at: created_at,
            expires_at,
        };
        let path = dir.join(format!("{key}.json"));
        match serde_json::to_string(&entry) {
            Ok(encoded) => {
                if let Err(err) = std::fs::write(&path, encoded) {
                    warn!(path = %path.display(), error = %err, "cache spill write failed");
                }
            }
            Err(err) => warn!(key, error = %err, "cache spill encode failed"),
        }
    }

    fn remove_disk(&self, key: &str) {
        if let Some(dir) = &self.disk_dir {
            let _ = std::fs::remove_file(dir.join(format!("{key}.json")));
        }
    }
}
