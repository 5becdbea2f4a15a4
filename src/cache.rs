// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Bounded cache of parsed phase tables
//!
//! Entries are keyed by a hash of the (nodes, edges) location pair. The cache
//! evicts the least recently used entry once it holds `capacity` entries, and
//! a capacity of zero disables caching entirely.

use crate::loader::Source;
use crate::types::PhaseTables;
use chrono::{DateTime, Utc};
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

/// Generate the cache key for a location pair
#[must_use]
pub fn key_for(nodes: &Source, edges: &Source) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nodes.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(edges.to_string().as_bytes());
    let hash = hex::encode(hasher.finalize());
    format!("tables:{}", &hash[..16])
}

/// A cached table pair
#[derive(Debug, Clone)]
struct CacheEntry {
    tables: Arc<PhaseTables>,
    loaded_at: DateTime<Utc>,
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that fell through
    pub misses: u64,
    /// Entries dropped to stay under capacity
    pub evictions: u64,
}

/// LRU cache of parsed phase tables
#[derive(Debug)]
pub struct TableCache {
    /// `None` when the capacity is zero
    inner: Option<LruCache<String, CacheEntry>>,
    stats: CacheStats,
}

impl TableCache {
    /// Create a cache holding at most `capacity` table pairs
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(LruCache::new),
            stats: CacheStats::default(),
        }
    }

    /// Look up a table pair, marking it as most recently used
    pub fn get(&mut self, key: &str) -> Option<Arc<PhaseTables>> {
        let tables = self
            .inner
            .as_mut()
            .and_then(|inner| inner.get(key))
            .map(|entry| Arc::clone(&entry.tables));

        if tables.is_some() {
            self.stats.hits += 1;
            debug!("Cache hit for {}", key);
        } else {
            self.stats.misses += 1;
        }
        tables
    }

    /// Insert a table pair, evicting the least recently used entry when full
    pub fn insert(&mut self, key: String, tables: Arc<PhaseTables>) {
        let Some(inner) = self.inner.as_mut() else {
            return;
        };

        let entry = CacheEntry {
            tables,
            loaded_at: Utc::now(),
        };
        // `push` hands back either the replaced entry (same key) or the evicted one
        if let Some((dropped, _)) = inner.push(key.clone(), entry) {
            if dropped != key {
                self.stats.evictions += 1;
                debug!("Evicted {}", dropped);
            }
        }
    }

    /// Drop one entry; returns whether it was present
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.inner
            .as_mut()
            .is_some_and(|inner| inner.pop(key).is_some())
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        if let Some(inner) = self.inner.as_mut() {
            inner.clear();
        }
    }

    /// When a cached pair was loaded, without touching recency or counters
    #[must_use]
    pub fn loaded_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.inner
            .as_ref()
            .and_then(|inner| inner.peek(key))
            .map(|entry| entry.loaded_at)
    }

    /// Check whether a key is cached
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.as_ref().is_some_and(|inner| inner.contains(key))
    }

    /// Number of cached table pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, LruCache::len)
    }

    /// Check if the cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| inner.cap().get())
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
