//! Tests for region construction and local-to-dataset index mapping

#[cfg(test)]
mod tests {
    use ndarray::array;
    use spatialmotif::spatial::Region;

    // Tests that members are sorted and local indices map back to dataset rows
    // Verified by skipping the member sort in build
    #[test]
    fn test_local_indices_follow_dataset_order() {
        let coordinates = array![[0.0, 0.0], [5.0, 5.0], [1.0, 0.0], [6.0, 5.0]];
        let Ok(region) = Region::build("fov".to_string(), vec![3, 1], &coordinates, 4) else {
            unreachable!("rows are valid");
        };

        assert_eq!(region.name(), "fov");
        assert_eq!(region.cells(), [1, 3]);
        assert_eq!(region.global_index(0), Some(1));
        assert_eq!(region.global_index(1), Some(3));
        assert_eq!(region.global_index(2), None);
        assert_eq!(region.len(), 2);
        assert!(!region.is_empty());
    }

    // Tests that the index only contains the region's own cells
    // Verified by building the index over the full coordinate matrix
    #[test]
    fn test_index_restricted_to_members() {
        let coordinates = array![[0.0, 0.0], [5.0, 5.0], [1.0, 0.0], [6.0, 5.0]];
        let Ok(region) = Region::build("fov".to_string(), vec![1, 3], &coordinates, 4) else {
            unreachable!("rows are valid");
        };

        assert_eq!(region.index().len(), 2);
        assert_eq!(region.index().coordinates(0), Some([5.0, 5.0].as_slice()));
        let Ok(nearest) = region.index().query_knn(&[0.0, 0.0], 1) else {
            unreachable!("query is valid");
        };
        assert_eq!(nearest.neighbors.first().map(|n| n.index), Some(0));
    }

    // Tests that an empty region cannot be indexed
    // Verified by allowing an empty kd-tree
    #[test]
    fn test_empty_region_rejected() {
        let coordinates = array![[0.0, 0.0]];
        assert!(Region::build("fov".to_string(), Vec::new(), &coordinates, 4).is_err());
    }
}
