//! In-memory key-value store with expiration
//!
//! Backs [`MockCacheClient::with_memory_store`](crate::MockCacheClient::with_memory_store)
//! so cache-dependent code can be exercised end to end without Redis.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Redis-like in-memory store
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, StoreEntry>>>,
}

#[derive(Debug)]
struct StoreEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl StoreEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| now <= expires_at)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// SETEX; a zero TTL stores without expiration
    pub fn setex(&self, key: &str, ttl_secs: u64, value: impl Into<String>) {
        let expires_at = (ttl_secs > 0).then(|| Instant::now() + Duration::from_secs(ttl_secs));
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key.to_string(),
            StoreEntry {
                value: value.into(),
                expires_at,
            },
        );
    }

    /// SET without expiration
    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.setex(key, 0, value);
    }

    /// `None` if the key is missing or expired
    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    /// `true` if a live key was deleted
    pub fn del(&self, key: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries
            .remove(key)
            .is_some_and(|entry| entry.is_live(Instant::now()))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remaining TTL in seconds; `Some(-1)` for keys without expiration
    pub fn ttl(&self, key: &str) -> Option<i64> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let entry = entries.get(key).filter(|entry| entry.is_live(now))?;
        Some(match entry.expires_at {
            Some(expires_at) => i64::try_from((expires_at - now).as_secs()).unwrap_or(i64::MAX),
            None => -1,
        })
    }

    /// Live keys containing `pattern` with `*` wildcards removed
    pub fn keys(&self, pattern: &str) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let needle = pattern.replace('*', "");
        let now = Instant::now();
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| key.contains(&needle) && entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn flush_all(&self) {
        self.entries.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Number of stored keys, including expired ones not yet overwritten
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
