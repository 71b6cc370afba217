//! Tests for default parameters and engine constants

#[cfg(test)]
mod tests {
    use spatialmotif::io::configuration::{
        CANCELLATION_CHECK_INTERVAL, DEFAULT_ALPHA, DEFAULT_DATASET_NAME,
        DEFAULT_DIST_ENRICH_MAX_DIST, DEFAULT_FP_MAX_DIST, DEFAULT_K,
        DEFAULT_KNN_ENRICH_MAX_DIST, DEFAULT_LEAF_SIZE, DEFAULT_MAX_NS, DEFAULT_MAX_RADIUS,
        DEFAULT_MIN_SIZE, DEFAULT_MIN_SUPPORT, DEFAULT_REGION, NEIGHBORHOOD_CACHE_CAPACITY,
        PROGRESS_BAR_WIDTH,
    };

    // Tests the query defaults
    // Verified by changing the default neighbor count
    #[test]
    fn test_query_defaults() {
        assert_eq!(DEFAULT_K, 30);
        assert!((DEFAULT_MIN_SUPPORT - 0.5).abs() < f64::EPSILON);
        assert_eq!(DEFAULT_MIN_SIZE, 0);
        assert_eq!(DEFAULT_MAX_NS, 100);
        assert!((DEFAULT_ALPHA - 0.05).abs() < f64::EPSILON);
    }

    // Tests that default distances stay within the clamp radius
    // Verified by raising a default distance above the maximum radius
    #[test]
    fn test_distances_within_max_radius() {
        for distance in [
            DEFAULT_FP_MAX_DIST,
            DEFAULT_KNN_ENRICH_MAX_DIST,
            DEFAULT_DIST_ENRICH_MAX_DIST,
        ] {
            assert!(distance > 0.0);
            assert!(distance <= DEFAULT_MAX_RADIUS);
        }
    }

    // Tests index and runtime settings
    // Verified by setting a zero leaf size
    #[test]
    fn test_runtime_settings() {
        assert_eq!(DEFAULT_LEAF_SIZE, 10);
        assert!(NEIGHBORHOOD_CACHE_CAPACITY > 0);
        assert!(CANCELLATION_CHECK_INTERVAL > 0);
        assert_eq!(PROGRESS_BAR_WIDTH, 40);
        assert_eq!(DEFAULT_DATASET_NAME, "ST");
        assert_eq!(DEFAULT_REGION, "default");
    }
}
