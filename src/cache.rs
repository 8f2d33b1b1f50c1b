//! Bounded in-memory TTL cache guarding repeated identical tool calls.
//!
//! Expiry is lazy: entries are only checked when read. When the store is full,
//! the entry closest to expiring is evicted before a new one is inserted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::Mutex;

/// Cache handle shared by every fan-out task and every request.
pub type SharedCache = Arc<Mutex<TtlCache<Value>>>;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    /// `None` when `now + ttl` overflows; such entries never expire
    expires_at: Option<Instant>,
    /// Insertion sequence, breaks `expires_at` ties in favour of the older entry
    seq: u64,
}

#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    max_items: usize,
    next_seq: u64,
    store: HashMap<String, CacheEntry<V>>,
}

impl<V: Clone> TtlCache<V> {
    /// Zero or negative `ttl_seconds` makes every entry stale on its next read.
    pub fn new(ttl_seconds: i64, max_items: usize) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_seconds.max(0) as u64),
            max_items: max_items.max(1),
            next_seq: 0,
            store: HashMap::new(),
        }
    }

    pub fn shared(ttl_seconds: i64, max_items: usize) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::new(ttl_seconds, max_items)))
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = Instant::now();
        let entry = self.store.get(key)?;
        if entry.expires_at.is_some_and(|at| at <= now) {
            self.store.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let ttl = self.ttl;
        self.set_with_ttl(key, value, ttl);
    }

    /// Insert with a TTL that differs from the cache-wide default.
    pub fn set_with_ttl(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        if self.store.len() >= self.max_items {
            self.evict_soonest_expiring();
        }
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.store.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now().checked_add(ttl),
                seq,
            },
        );
    }

    fn evict_soonest_expiring(&mut self) {
        let victim = self
            .store
            .iter()
            .min_by_key(|(_, entry)| {
                (entry.expires_at.is_none(), entry.expires_at, entry.seq)
            })
            .map(|(key, _)| key.clone());
        if let Some(key) = victim {
            tracing::debug!("Evicting cache entry {}", key);
            self.store.remove(&key);
        }
    }

    /// Number of stored entries, stale ones included until they are read.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }
}
