use crate::analysis::neighborhood::{LabelSet, NeighborhoodQuery};
use std::collections::VecDeque;
use std::sync::Arc;

/// Compact neighborhoods of every cell, grouped per region
pub type Background = Arc<Vec<Vec<LabelSet>>>;

/// Bytes held by a background, counting every label set
pub fn footprint(background: &[Vec<LabelSet>]) -> usize {
    background
        .iter()
        .map(|region| {
            size_of::<Vec<LabelSet>>() + region.iter().map(LabelSet::footprint).sum::<usize>()
        })
        .sum()
}

/// Key for caching background neighborhood extraction
///
/// Identifies a neighborhood rule exactly; distances are keyed by their bit
/// pattern so equal requests always hit.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct NeighborhoodKey {
    radius_mode: bool,
    size: usize,
    max_dist_bits: Option<u64>,
    max_ns: Option<usize>,
}

impl From<&NeighborhoodQuery> for NeighborhoodKey {
    fn from(query: &NeighborhoodQuery) -> Self {
        match *query {
            NeighborhoodQuery::Knn { k, max_dist } => Self {
                radius_mode: false,
                size: k,
                max_dist_bits: max_dist.map(f64::to_bits),
                max_ns: None,
            },
            NeighborhoodQuery::Radius {
                max_dist,
                min_size,
                max_ns,
            } => Self {
                radius_mode: true,
                size: min_size,
                max_dist_bits: Some(max_dist.to_bits()),
                max_ns,
            },
        }
    }
}

/// Bounded memoization cache for all-cell neighborhood extraction
///
/// Enrichment tests need the neighborhood of every cell as background, which
/// is identical across center types for a given rule. Both the entry count
/// and the total [`footprint`] are bounded; entries are evicted oldest first
/// until a new one fits. A background larger than the whole budget is not
/// stored.
#[derive(Debug)]
pub struct NeighborhoodCache {
    entries: VecDeque<(NeighborhoodKey, Background, usize)>,
    capacity: usize,
    budget: usize,
    bytes: usize,

    /// Cache performance statistics
    pub stats: CacheStats,
}

/// Performance metrics for cache effectiveness
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: usize,
    /// Number of cache misses
    pub misses: usize,
}

impl NeighborhoodCache {
    /// Create an empty cache of at most `capacity` entries and `budget` bytes
    pub fn new(capacity: usize, budget: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            budget,
            bytes: 0,
            stats: CacheStats::default(),
        }
    }

    /// Look up a cached extraction, recording a hit or miss
    pub fn get(&mut self, key: &NeighborhoodKey) -> Option<Background> {
        let found = self
            .entries
            .iter()
            .find(|(stored, _, _)| stored == key)
            .map(|(_, value, _)| Arc::clone(value));

        if found.is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        found
    }

    /// Store an extraction, replacing any entry with the same key
    ///
    /// Returns whether the value was kept.
    pub fn insert(&mut self, key: NeighborhoodKey, value: Background) -> bool {
        let size = footprint(&value);
        if self.capacity == 0 || size > self.budget {
            return false;
        }

        let replaced = self
            .entries
            .iter()
            .position(|(stored, _, _)| *stored == key)
            .and_then(|position| self.entries.remove(position));
        if let Some((_, _, freed)) = replaced {
            self.bytes -= freed;
        }
        while self.entries.len() >= self.capacity
            || self.bytes.saturating_add(size) > self.budget
        {
            let Some((_, _, freed)) = self.entries.pop_front() else {
                break;
            };
            self.bytes -= freed;
        }

        self.bytes += size;
        self.entries.push_back((key, value, size));
        true
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total footprint of the cached entries
    pub const fn bytes(&self) -> usize {
        self.bytes
    }

    /// Drop every entry; statistics are kept
    pub fn clear(&mut self) {
        self.entries.clear();
        self.bytes = 0;
    }
}
