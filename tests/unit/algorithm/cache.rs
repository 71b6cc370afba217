//! Tests for the background neighborhood cache and its statistics

#[cfg(test)]
mod tests {
    use spatialmotif::algorithm::cache::{
        Background, CacheStats, NeighborhoodCache, NeighborhoodKey, footprint,
    };
    use spatialmotif::analysis::neighborhood::{LabelSet, NeighborhoodQuery};
    use std::sync::Arc;

    const UNBOUNDED: usize = usize::MAX;

    fn knn(k: usize) -> NeighborhoodKey {
        NeighborhoodKey::from(&NeighborhoodQuery::Knn { k, max_dist: None })
    }

    fn entry(center: usize) -> Background {
        sized(center, 1)
    }

    // One region of `cells` label sets, each holding labels 0 and 1
    fn sized(center: usize, cells: usize) -> Background {
        let sets = (0..cells)
            .filter_map(|offset| LabelSet::new(center + offset, false, &[0, 1]).ok())
            .collect();
        Arc::new(vec![sets])
    }

    // Tests that keys distinguish every neighborhood parameter
    // Verified by leaving max_dist out of the key
    #[test]
    fn test_key_identity() {
        let radius = |max_dist: f64, max_ns: Option<usize>| {
            NeighborhoodKey::from(&NeighborhoodQuery::Radius {
                max_dist,
                min_size: 0,
                max_ns,
            })
        };
        let capped = |max_dist: f64| {
            NeighborhoodKey::from(&NeighborhoodQuery::Knn {
                k: 5,
                max_dist: Some(max_dist),
            })
        };

        assert_eq!(knn(5), knn(5));
        assert_ne!(knn(5), knn(6));
        assert_ne!(knn(5), capped(10.0));
        assert_ne!(capped(10.0), capped(20.0));
        assert_eq!(radius(10.0, None), radius(10.0, None));
        assert_ne!(radius(10.0, None), radius(10.0, Some(3)));
        assert_ne!(radius(5.0, None), knn(5));
    }

    // Tests hit and miss accounting
    // Verified by counting hits as misses
    #[test]
    fn test_hit_and_miss_statistics() {
        let mut cache = NeighborhoodCache::new(4, UNBOUNDED);
        assert!(cache.get(&knn(3)).is_none());
        cache.insert(knn(3), entry(7));

        let cached = cache.get(&knn(3));
        assert_eq!(
            cached.and_then(|value| value.first().and_then(|r| r.first()).map(|n| n.center)),
            Some(7)
        );
        assert_eq!(cache.stats, CacheStats { hits: 1, misses: 1 });
    }

    // Tests that the oldest entry is evicted at capacity
    // Verified by evicting the newest entry instead
    #[test]
    fn test_oldest_first_eviction() {
        let mut cache = NeighborhoodCache::new(2, UNBOUNDED);
        cache.insert(knn(1), entry(1));
        cache.insert(knn(2), entry(2));
        cache.insert(knn(3), entry(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&knn(1)).is_none());
        assert!(cache.get(&knn(2)).is_some());
        assert!(cache.get(&knn(3)).is_some());
    }

    // Tests that re-inserting a key replaces its value without growing
    // Verified by appending duplicates
    #[test]
    fn test_replace_existing_key() {
        let mut cache = NeighborhoodCache::new(3, UNBOUNDED);
        cache.insert(knn(1), entry(1));
        cache.insert(knn(1), entry(9));

        assert_eq!(cache.len(), 1);
        let center = cache
            .get(&knn(1))
            .and_then(|value| value.first().and_then(|r| r.first()).map(|n| n.center));
        assert_eq!(center, Some(9));
    }

    // Tests that a zero-capacity cache stores nothing and clear empties
    // Verified by skipping the capacity check on insert
    #[test]
    fn test_zero_capacity_and_clear() {
        let mut disabled = NeighborhoodCache::new(0, UNBOUNDED);
        disabled.insert(knn(1), entry(1));
        assert!(disabled.is_empty());

        let mut cache = NeighborhoodCache::new(2, UNBOUNDED);
        cache.insert(knn(1), entry(1));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.bytes(), 0);
    }

    // Tests that the footprint counts every label set of every region
    // Verified by counting only the first region
    #[test]
    fn test_footprint_grows_with_cells() {
        let small = sized(0, 10);
        let large = sized(0, 20);
        let split = Arc::new(vec![small.concat(), small.concat()]);

        assert!(footprint(&large) > footprint(&small));
        assert!(footprint(&split) > footprint(&small));
        assert_eq!(
            footprint(&small) - footprint(&[Vec::new()]),
            small.concat().iter().map(LabelSet::footprint).sum::<usize>()
        );
    }

    // Tests that entries are evicted oldest first to stay within the byte budget
    // Verified by bounding the cache by entry count alone
    #[test]
    fn test_eviction_under_byte_budget() {
        let size = footprint(&sized(0, 100));
        let mut cache = NeighborhoodCache::new(8, size * 2 + size / 2);

        assert!(cache.insert(knn(1), sized(0, 100)));
        assert!(cache.insert(knn(2), sized(0, 100)));
        assert_eq!(cache.bytes(), size * 2);
        assert!(cache.insert(knn(3), sized(0, 100)));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.bytes(), size * 2);
        assert!(cache.get(&knn(1)).is_none());
        assert!(cache.get(&knn(2)).is_some());
        assert!(cache.get(&knn(3)).is_some());
    }

    // Tests that a background larger than the whole budget is not stored
    // Verified by evicting everything and storing the oversized entry anyway
    #[test]
    fn test_oversized_entry_skipped() {
        let size = footprint(&sized(0, 10));
        let mut cache = NeighborhoodCache::new(8, size);

        assert!(cache.insert(knn(1), sized(0, 10)));
        assert!(!cache.insert(knn(2), sized(0, 1000)));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.bytes(), size);
        assert!(cache.get(&knn(1)).is_some());
    }

    // Tests that replacing a key releases the old entry's bytes
    // Verified by keeping the replaced entry's size in the running total
    #[test]
    fn test_replace_releases_bytes() {
        let mut cache = NeighborhoodCache::new(8, UNBOUNDED);
        cache.insert(knn(1), sized(0, 50));
        cache.insert(knn(1), sized(0, 5));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.bytes(), footprint(&sized(0, 5)));
    }
}
