//! Bounded in-memory tile cache.
//!
//! Entries are either a decoded tile or a negative marker recording that no
//! source had data for the address. The cache never touches disk and lives as
//! long as its owning [`TileFetcher`](crate::TileFetcher).

use crate::tile::{TileAddress, TileBuffer};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use terraslope_metrics::metric_defs;

/// Default maximum number of cached entries.
/// Each 256x256 RGB tile is ~192 KiB, so 512 tiles stay under 100 MiB.
pub const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Which entry is evicted once the cache is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Evict the oldest inserted entry; lookups do not refresh entries.
    #[default]
    InsertionOrder,
    /// Evict the least recently looked-up entry.
    LeastRecentlyUsed,
}

/// A cached lookup result for one tile address.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    /// A tile accepted from some source.
    Tile(Arc<TileBuffer>),
    /// No source had data at this address.
    NoData,
}

impl CacheEntry {
    /// The tile, if this is a positive entry.
    pub fn tile(&self) -> Option<&Arc<TileBuffer>> {
        match self {
            CacheEntry::Tile(tile) => Some(tile),
            CacheEntry::NoData => None,
        }
    }
}

/// Capacity-bounded tile cache.
#[derive(Debug)]
pub struct TileCache {
    /// Entries indexed by address.
    entries: HashMap<TileAddress, CacheEntry>,
    /// Eviction order (next victim at the front).
    order: VecDeque<TileAddress>,
    /// Maximum number of entries.
    capacity: usize,
    policy: EvictionPolicy,
}

impl TileCache {
    /// Create an empty cache. A capacity of zero is raised to one.
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            policy,
        }
    }

    /// Look up an address.
    ///
    /// Under [`EvictionPolicy::LeastRecentlyUsed`] a hit moves the entry to the
    /// back of the eviction order.
    pub fn get(&mut self, address: &TileAddress) -> Option<CacheEntry> {
        let entry = self.entries.get(address)?.clone();
        if self.policy == EvictionPolicy::LeastRecentlyUsed {
            self.touch(address);
        }
        Some(entry)
    }

    /// Check for an entry without affecting eviction order.
    pub fn contains(&self, address: &TileAddress) -> bool {
        self.entries.contains_key(address)
    }

    /// Insert or replace an entry, evicting from the front when full.
    pub fn insert(&mut self, address: TileAddress, entry: CacheEntry) {
        if let Some(existing) = self.entries.get_mut(&address) {
            *existing = entry;
            if self.policy == EvictionPolicy::LeastRecentlyUsed {
                self.touch(&address);
            }
            return;
        }

        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            metrics::counter!(metric_defs::CACHE_EVICTIONS.name).increment(1);
        }

        self.entries.insert(address, entry);
        self.order.push_back(address);
    }

    fn touch(&mut self, address: &TileAddress) {
        if let Some(pos) = self.order.iter().position(|k| k == address) {
            if let Some(key) = self.order.remove(pos) {
                self.order.push_back(key);
            }
        }
    }

    /// Number of cached entries, positive and negative.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of negative entries.
    pub fn negative_len(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e, CacheEntry::NoData))
            .count()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The configured eviction policy.
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
