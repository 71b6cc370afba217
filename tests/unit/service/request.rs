//! Tests for request parsing, motif normalization and the service handlers

#[cfg(test)]
mod tests {
    use serde_json::json;
    use spatialmotif::service::registry::InMemoryRegistry;
    use spatialmotif::service::request::{
        EnrichDistRequest, EnrichKnnRequest, FpDistRequest, FpKnnRequest, LoadRequest,
        MotifInput, MotifService, RemoveRequest, ServiceError,
    };
    use spatialmotif::{Alternative, CorrectionMethod, ErrorKind};

    fn cells() -> serde_json::Value {
        json!([
            {"id": "a1", "coordinates": [0, 0], "label": "A"},
            {"id": "a2", "coordinates": [20, 0], "label": "A"},
            {"id": "b1", "coordinates": [1, 0], "label": "B"},
            {"id": "b2", "coordinates": [21, 0], "label": "B"},
            {"id": "c1", "coordinates": [0, 2], "label": "C"},
            {"id": "c2", "coordinates": [40, 40], "label": "C"}
        ])
    }

    fn request<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
        let Ok(parsed) = serde_json::from_value(value) else {
            unreachable!("request is well formed");
        };
        parsed
    }

    fn loaded() -> MotifService<InMemoryRegistry> {
        let service = MotifService::new(InMemoryRegistry::new());
        let load = request::<LoadRequest>(json!({ "dataset_id": "ST", "cells": cells() }));
        assert!(service.load(load).is_ok());
        service
    }

    // Tests the accepted motif spellings
    // Verified by treating a comma string as several motifs
    #[test]
    fn test_motif_input_normalize() {
        let text = request::<MotifInput>(json!("B, C"));
        let Ok(Some(motifs)) = text.normalize() else {
            unreachable!("text names labels");
        };
        assert_eq!(motifs.len(), 1);
        assert_eq!(motifs.first().map(ToString::to_string), Some("B,C".to_string()));

        let sets = request::<MotifInput>(json!([["B"], ["B", "C"]]));
        assert!(sets.normalize().is_ok_and(|motifs| motifs.map(|m| m.len()) == Some(2)));

        let labels = request::<MotifInput>(json!(["B", "C"]));
        assert!(labels.normalize().is_ok_and(|motifs| motifs.map(|m| m.len()) == Some(1)));

        for blank in [json!(""), json!("  "), json!([])] {
            assert!(request::<MotifInput>(blank).normalize().is_ok_and(|m| m.is_none()));
        }
        assert!(
            request::<MotifInput>(json!([["B"], []]))
                .normalize()
                .is_err_and(|error| error.kind() == ErrorKind::InvalidArgument)
        );
    }

    // Tests request defaults and the wire name of the cell id flag
    // Verified by changing the default enrichment distance
    #[test]
    fn test_request_defaults() {
        let fp = request::<FpKnnRequest>(json!({ "ct": "A" }));
        assert_eq!(fp.k, 30);
        assert!((fp.min_support - 0.5).abs() < f64::EPSILON);
        assert_eq!(fp.dataset_id, None);

        let dist = request::<FpDistRequest>(json!({}));
        assert!((dist.max_dist - 100.0).abs() < f64::EPSILON);
        assert_eq!(dist.min_size, 0);

        let knn = request::<EnrichKnnRequest>(json!({
            "ct": "A",
            "return_cellID": true,
            "alternative": "less",
            "correction": "bonferroni"
        }));
        assert!((knn.max_dist - 200.0).abs() < f64::EPSILON);
        assert!(knn.policy.return_cell_ids);
        assert_eq!(knn.policy.alternative, Alternative::Less);
        assert_eq!(knn.policy.correction, CorrectionMethod::Bonferroni);
        assert!((knn.policy.alpha - 0.05).abs() < f64::EPSILON);

        let radius = request::<EnrichDistRequest>(json!({ "return_cell_ids": true }));
        assert_eq!(radius.max_ns, 100);
        assert!(radius.policy.return_cell_ids);

        let load = request::<LoadRequest>(json!({}));
        assert_eq!(load.dataset, "ST");
        assert_eq!(load.leaf_size, 10);
    }

    // Tests loading, skipping a taken id and listing
    // Verified by overwriting an existing dataset on upload
    #[test]
    fn test_load_and_list() {
        let service = loaded();
        let again = request::<LoadRequest>(json!({ "dataset_id": "ST", "cells": cells() }));
        let Ok(response) = service.load(again) else {
            unreachable!("duplicate upload is skipped, not rejected");
        };
        assert!(response.skipped);
        assert_eq!(response.message, "Dataset 'ST' already exists. Skipping upload.");

        let other = request::<LoadRequest>(json!({ "dataset_id": "lung", "cells": cells() }));
        let Ok(response) = service.load(other) else {
            unreachable!("new id loads");
        };
        assert!(!response.skipped);
        assert_eq!(response.message, "Spatial data loaded successfully");
        assert_eq!(response.available_datasets, vec!["ST".to_string(), "lung".to_string()]);
        assert_eq!(service.list().count, 2);
    }

    // Tests load validation failures
    // Verified by accepting an upload without cells
    #[test]
    fn test_load_rejected() {
        let service = MotifService::new(InMemoryRegistry::new());
        let no_id = request::<LoadRequest>(json!({ "cells": cells() }));
        let no_cells = request::<LoadRequest>(json!({ "dataset_id": "ST" }));
        let bad_cells =
            request::<LoadRequest>(json!({ "dataset_id": "ST", "cells": [{ "id": "a" }] }));

        for invalid in [no_id, no_cells, bad_cells] {
            assert!(service.load(invalid).is_err_and(|error| error.status == 400));
        }
        assert_eq!(service.list().count, 0);
    }

    // Tests removal and the not found status
    // Verified by reporting success for unknown ids
    #[test]
    fn test_remove() {
        let service = loaded();
        let remove = || request::<RemoveRequest>(json!({ "dataset_id": "ST" }));

        assert!(service.remove(remove()).is_ok_and(|r| r.available_datasets.is_empty()));
        assert_eq!(
            service.remove(remove()),
            Err(ServiceError::not_found("Dataset 'ST' not found"))
        );
    }

    // Tests the frequent pattern handlers
    // Verified by ignoring the requested neighbor count
    #[test]
    fn test_find_patterns() {
        let service = loaded();
        let knn = request::<FpKnnRequest>(json!({ "dataset_id": "ST", "ct": "A", "k": 1 }));
        let Ok(response) = service.find_fp_knn(knn) else {
            unreachable!("request is valid");
        };
        assert_eq!(response.frequent_patterns.len(), 1);

        let dist = request::<FpDistRequest>(json!({
            "dataset_id": "ST",
            "ct": "A",
            "max_dist": 1.5,
            "min_size": 2
        }));
        assert!(service.find_fp_dist(dist).is_ok_and(|r| r.frequent_patterns.is_empty()));
    }

    // Tests missing parameters and unknown datasets
    // Verified by falling back to the first dataset for unknown ids
    #[test]
    fn test_missing_parameters() {
        let service = loaded();

        let no_ct = request::<FpKnnRequest>(json!({ "dataset_id": "ST" }));
        assert_eq!(
            service.find_fp_knn(no_ct),
            Err(ServiceError::bad_request("Missing 'ct' parameter"))
        );

        let unknown = request::<FpKnnRequest>(json!({ "dataset_id": "nope", "ct": "A" }));
        assert_eq!(
            service.find_fp_knn(unknown),
            Err(ServiceError::bad_request(
                "Invalid or missing 'dataset_id' parameter"
            ))
        );

        let bad_k = request::<FpKnnRequest>(json!({ "dataset_id": "ST", "ct": "A", "k": 0 }));
        assert!(service.find_fp_knn(bad_k).is_err_and(|error| error.status == 400));
    }

    // Tests the enrichment handlers with explicit motifs and cell ids
    // Verified by dropping the cell id policy between request and engine
    #[test]
    fn test_enrichment_handlers() {
        let service = loaded();
        let knn = request::<EnrichKnnRequest>(json!({
            "dataset_id": "ST",
            "ct": "A",
            "motifs": "B",
            "k": 1,
            "return_cellID": true
        }));
        let Ok(response) = service.motif_enrichment_knn(knn) else {
            unreachable!("request is valid");
        };
        let Some(record) = response.enrichment_results.first() else {
            unreachable!("one motif tested");
        };
        assert_eq!(record.observed, 2);
        assert_eq!(record.cell_ids, Some(vec!["a1".to_string(), "a2".to_string()]));

        let dist = request::<EnrichDistRequest>(json!({
            "dataset_id": "ST",
            "ct": "A",
            "motifs": [["B"], ["C"]],
            "max_dist": 2.5
        }));
        assert!(
            service
                .motif_enrichment_dist(dist)
                .is_ok_and(|r| r.enrichment_results.len() == 2)
        );

        let unknown_label = request::<EnrichDistRequest>(json!({
            "dataset_id": "ST",
            "ct": "A",
            "motifs": "Z"
        }));
        assert!(
            service
                .motif_enrichment_dist(unknown_label)
                .is_err_and(|error| error.status == 400 && error.message.contains('Z'))
        );
    }

    // Tests error serialization and conversion
    // Verified by serializing the status code
    #[test]
    fn test_service_error() {
        let error = ServiceError::not_found("Dataset 'x' not found");
        let Ok(value) = serde_json::to_value(&error) else {
            unreachable!("errors serialize");
        };
        assert_eq!(value, json!({ "error": "Dataset 'x' not found" }));
        assert_eq!(error.to_string(), "Dataset 'x' not found (404)");

        let converted = ServiceError::from(spatialmotif::io::error::not_found("cell type", &"Z"));
        assert_eq!(converted.status, 400);
    }
}
