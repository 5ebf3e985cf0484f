//! Bounded in-memory tile cache.
//!
//! Stores encoded PNG tiles keyed by tile address plus digests of the
//! normalized palette and filter. The cache is bounded by total value
//! bytes; when an insert pushes it over capacity, entries are evicted in
//! insertion order (FIFO) until the budget holds again.
//!
//! The cache itself is not synchronized: the service owns one behind a
//! mutex and keeps its critical sections short. Values are `Arc`ed so a
//! hit hands out a shared buffer without copying under the lock.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use log::warn;
use serde::Serialize;

use crate::gradient::Palette;
use crate::mercator::TileCoord;
use crate::provider::ActivityFilter;

/// Default cache capacity in bytes.
pub const DEFAULT_CACHE_CAPACITY: usize = 100 * 1024 * 1024;

/// Cache key: tile address plus palette and filter digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub coord: TileCoord,
    pub palette: u64,
    pub filter: u64,
}

impl TileKey {
    pub fn new(coord: TileCoord, palette: &Palette, filter: &ActivityFilter) -> Self {
        Self {
            coord,
            palette: stable_digest(palette),
            filter: stable_digest(filter),
        }
    }
}

/// Digest of a normalized option object. `DefaultHasher::new()` uses fixed
/// keys, so equal values digest equally for the lifetime of the process,
/// which is all a memory-only cache needs.
fn stable_digest<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Counters exposed alongside the cache.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: usize,
    pub capacity_bytes: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Byte-bounded keyed store of encoded tiles with FIFO eviction.
#[derive(Debug)]
pub struct TileCache {
    capacity: usize,
    entries: HashMap<TileKey, Arc<Vec<u8>>>,
    order: VecDeque<TileKey>,
    total_bytes: usize,
    hits: u64,
    misses: u64,
}

impl TileCache {
    /// Create a cache bounded to `capacity` bytes of tile data.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
            total_bytes: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a tile, recording a hit or miss.
    pub fn get(&mut self, key: &TileKey) -> Option<Arc<Vec<u8>>> {
        match self.entries.get(key) {
            Some(bytes) => {
                self.hits += 1;
                Some(Arc::clone(bytes))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert a tile, evicting oldest entries until the byte budget holds.
    ///
    /// A value larger than the whole capacity is not stored; the render
    /// that produced it still succeeds.
    pub fn put(&mut self, key: TileKey, bytes: Arc<Vec<u8>>) {
        if bytes.len() > self.capacity {
            warn!(
                "tile of {} bytes exceeds cache capacity {}, not caching",
                bytes.len(),
                self.capacity
            );
            return;
        }

        // Replacing a live key refreshes its insertion position.
        if let Some(old) = self.entries.remove(&key) {
            self.total_bytes -= old.len();
            self.order.retain(|k| k != &key);
        }

        self.total_bytes += bytes.len();
        self.entries.insert(key, bytes);
        self.order.push_back(key);

        while self.total_bytes > self.capacity {
            self.evict_oldest();
        }
    }

    /// Empty the store, reporting how many entries were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.order.clear();
        self.total_bytes = 0;
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Sum of stored value lengths.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            total_bytes: self.total_bytes,
            capacity_bytes: self.capacity,
            hits: self.hits,
            misses: self.misses,
        }
    }

    fn evict_oldest(&mut self) {
        while let Some(key) = self.order.pop_front() {
            if let Some(bytes) = self.entries.remove(&key) {
                self.total_bytes -= bytes.len();
                return;
            }
        }
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

// ============================================================================
// Tests
// ============================================================================
