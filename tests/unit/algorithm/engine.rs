//! Tests for engine construction, frequent pattern requests and enrichment requests

#[cfg(test)]
mod tests {
    use spatialmotif::algorithm::cache::CacheStats;
    use spatialmotif::{
        CancellationToken, CellRecord, EnrichmentOptions, ErrorKind, Motif, MotifEngine,
        PatternSupport, SpatialParams,
    };

    fn record(id: &str, x: f64, y: f64, label: &str) -> CellRecord {
        CellRecord {
            id: Some(id.to_string()),
            coordinates: Some(vec![x, y]),
            label: Some(label.to_string()),
            region: None,
        }
    }

    fn records() -> Vec<CellRecord> {
        vec![
            record("a1", 0.0, 0.0, "A"),
            record("a2", 20.0, 0.0, "A"),
            record("b1", 1.0, 0.0, "B"),
            record("b2", 21.0, 0.0, "B"),
            record("c1", 0.0, 2.0, "C"),
            record("c2", 40.0, 40.0, "C"),
        ]
    }

    fn engine_with(params: SpatialParams) -> MotifEngine {
        let Ok(engine) = MotifEngine::create_engine(records(), None, params) else {
            unreachable!("records are valid");
        };
        engine
    }

    fn engine() -> MotifEngine {
        engine_with(SpatialParams::default())
    }

    fn support(pattern: &[&str], support: f64) -> PatternSupport {
        PatternSupport {
            pattern: pattern.iter().map(|label| (*label).to_string()).collect(),
            support,
        }
    }

    fn motif(labels: &[&str]) -> Motif {
        let Ok(motif) = Motif::new(labels.iter().copied()) else {
            unreachable!("motif labels are not blank");
        };
        motif
    }

    // Tests engine construction with the default dataset name
    // Verified by naming datasets after their first region
    #[test]
    fn test_create_engine() {
        let built = engine();
        assert_eq!(built.dataset().name(), "ST");
        assert_eq!(built.dataset().len(), 6);
        assert_eq!(built.cache_stats(), CacheStats::default());

        let Ok(named) = MotifEngine::create_named("lymph", records(), None, SpatialParams::default())
        else {
            unreachable!("records are valid");
        };
        assert_eq!(named.dataset().name(), "lymph");
        assert!(
            MotifEngine::create_engine(Vec::new(), None, SpatialParams::default())
                .is_err_and(|error| error.kind() == ErrorKind::InvalidInput)
        );
    }

    // Tests KNN patterns with the documented result order
    // Verified by sorting ties by pattern labels before pattern size
    #[test]
    fn test_find_patterns_knn() {
        let built = engine();
        let Ok(single) = built.find_patterns_knn("A", 1, 0.5) else {
            unreachable!("parameters are valid");
        };
        assert_eq!(single, vec![support(&["B"], 1.0)]);

        let Ok(pairs) = built.find_patterns_knn("A", 2, 0.5) else {
            unreachable!("parameters are valid");
        };
        assert_eq!(
            pairs,
            vec![
                support(&["B"], 1.0),
                support(&["C"], 0.5),
                support(&["B", "C"], 0.5),
            ]
        );
    }

    // Tests radius patterns and discarding of small neighborhoods
    // Verified by keeping neighborhoods below min_size as empty transactions
    #[test]
    fn test_find_patterns_radius() {
        let built = engine();
        let Ok(found) = built.find_patterns_radius("A", 1.5, 1, 0.5) else {
            unreachable!("parameters are valid");
        };
        assert_eq!(found, vec![support(&["B"], 1.0)]);

        let Ok(none) = built.find_patterns_radius("A", 1.5, 2, 0.5) else {
            unreachable!("parameters are valid");
        };
        assert!(none.is_empty());
    }

    // Tests that distances above max_radius are clamped
    // Verified by skipping the clamp before extraction
    #[test]
    fn test_radius_clamped_to_max_radius() {
        let built = engine_with(SpatialParams {
            leaf_size: 2,
            max_radius: 1.5,
        });
        let Ok(found) = built.find_patterns_radius("A", 100.0, 0, 0.5) else {
            unreachable!("parameters are valid");
        };
        assert_eq!(found, vec![support(&["B"], 1.0)]);
    }

    // Tests that argument errors are reported before center type lookup
    // Verified by resolving the center type first
    #[test]
    fn test_argument_errors() {
        let built = engine();
        let kind = |result: spatialmotif::Result<Vec<PatternSupport>>| result.err().map(|e| e.kind());

        assert_eq!(kind(built.find_patterns_knn("Z", 0, 0.5)), Some(ErrorKind::InvalidArgument));
        assert_eq!(kind(built.find_patterns_knn("A", 3, 0.0)), Some(ErrorKind::InvalidArgument));
        assert_eq!(kind(built.find_patterns_knn("A", 3, 1.5)), Some(ErrorKind::InvalidArgument));
        assert_eq!(
            kind(built.find_patterns_radius("A", -1.0, 0, 0.5)),
            Some(ErrorKind::InvalidArgument)
        );
        assert_eq!(kind(built.find_patterns_knn(" ", 3, 0.5)), Some(ErrorKind::InvalidArgument));
        assert_eq!(kind(built.find_patterns_knn("Z", 3, 0.5)), Some(ErrorKind::NotFound));
    }

    // Tests a targeted enrichment against a hand-computed hypergeometric tail
    // Verified by using the center count as the population
    #[test]
    fn test_enrich_knn_targeted() {
        let built = engine();
        let motifs = [motif(&["B"])];
        let Ok(records) =
            built.enrich_knn("A", Some(motifs.as_slice()), 1, 0.5, None, &EnrichmentOptions::default())
        else {
            unreachable!("parameters are valid");
        };

        assert_eq!(records.len(), 1);
        let Some(record) = records.first() else {
            unreachable!("one record expected");
        };
        assert_eq!(record.pattern, vec!["B".to_string()]);
        assert_eq!(
            (record.observed, record.n_center, record.n_motif, record.population),
            (2, 2, 3, 6)
        );
        assert!((record.expected - 1.0).abs() < 1e-12);
        assert!((record.p_value - 0.2).abs() < 1e-9);
        assert!((record.corrected_p_value - record.p_value).abs() < 1e-15);
        assert!(!record.significant);
        assert!(record.cell_ids.is_none());
    }

    // Tests that duplicate motifs are tested once and unknown labels fail
    // Verified by testing every supplied motif
    #[test]
    fn test_enrich_motif_handling() {
        let built = engine();
        let options = EnrichmentOptions::default();
        let duplicated = [motif(&["B"]), motif(&["B"])];
        let Ok(records) = built.enrich_knn("A", Some(duplicated.as_slice()), 1, 0.5, None, &options) else {
            unreachable!("parameters are valid");
        };
        assert_eq!(records.len(), 1);

        let Ok(empty) = built.enrich_knn("A", Some([].as_slice()), 1, 0.5, None, &options) else {
            unreachable!("parameters are valid");
        };
        assert!(empty.is_empty());

        let unknown = [motif(&["B", "Q"])];
        assert!(
            built
                .enrich_knn("A", Some(unknown.as_slice()), 1, 0.5, None, &options)
                .is_err_and(|error| error.kind() == ErrorKind::NotFound)
        );
    }

    // Tests that repeated enrichment reuses the background neighborhoods
    // Verified by never inserting into the cache
    #[test]
    fn test_background_cache_reused() {
        let built = engine();
        let options = EnrichmentOptions::default();
        let first = built.enrich_radius("A", None, 5.0, 0, 0.5, 10, &options);
        let second = built.enrich_radius("B", None, 5.0, 0, 0.5, 10, &options);

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(built.cache_stats(), CacheStats { hits: 1, misses: 1 });
    }

    // Tests that identifiers are still reported when the background comes from cache
    // Verified by reading neighbor rows from the cached background
    #[test]
    fn test_cell_ids_after_cache_hit() {
        let built = engine();
        let motifs = [motif(&["B"])];
        let plain = EnrichmentOptions::default();
        let with_ids = EnrichmentOptions {
            return_cell_ids: true,
            ..plain
        };

        assert!(built.enrich_knn("A", Some(motifs.as_slice()), 1, 0.5, None, &plain).is_ok());
        let Ok(records) = built.enrich_knn("A", Some(motifs.as_slice()), 1, 0.5, None, &with_ids)
        else {
            unreachable!("parameters are valid");
        };

        assert_eq!(built.cache_stats(), CacheStats { hits: 1, misses: 1 });
        let Some(record) = records.first() else {
            unreachable!("one record expected");
        };
        assert_eq!(record.cell_ids, Some(vec!["a1".to_string(), "a2".to_string()]));
        assert_eq!(record.neighbor_ids, Some(vec!["b1".to_string(), "b2".to_string()]));
    }

    // Tests that a cancelled call fails and leaves the engine usable
    // Verified by caching partial results before the cancellation check
    #[test]
    fn test_cancelled_call_leaves_engine_intact() {
        let built = engine();
        let token = CancellationToken::new();
        token.cancel();
        let options = EnrichmentOptions::default();

        assert!(
            built
                .enrich_knn_with("A", None, 1, 0.5, None, &options, &token)
                .is_err_and(|error| error.kind() == ErrorKind::Cancelled)
        );
        assert!(
            built
                .find_patterns_knn_with("A", 1, 0.5, &token)
                .is_err_and(|error| error.kind() == ErrorKind::Cancelled)
        );

        assert!(built.enrich_knn("A", None, 1, 0.5, None, &options).is_ok());
        assert_eq!(built.cache_stats(), CacheStats { hits: 0, misses: 2 });
        assert_eq!(
            built.find_patterns_knn("A", 1, 0.5).ok(),
            Some(vec![support(&["B"], 1.0)])
        );
    }
}
