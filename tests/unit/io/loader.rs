//! Tests for reading dataset files in both supported layouts

#[cfg(test)]
mod tests {
    use spatialmotif::io::loader::{DatasetFile, load_engine};
    use spatialmotif::{ErrorKind, SpatialParams};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const RECORDS: &str = r#"[
        {"id": "a", "coordinates": [0, 0], "label": "A"},
        {"id": "b", "coordinates": [1, 0], "label": "B"}
    ]"#;

    const DOCUMENT: &str = r#"{
        "dataset": "lung",
        "cells": [
            {"cell_id": "a", "coords": [0, 0], "cell_type": "A"},
            {"cell_id": "b", "coords": [1, 0], "cell_type": "B"},
            {"cell_id": "c", "coords": [2, 0], "cell_type": "A"}
        ],
        "regions": ["r1", "r1", "r2"]
    }"#;

    // Tests that a bare record array parses and builds the default dataset
    // Verified by naming bare arrays after the file
    #[test]
    fn test_records_layout() {
        let Ok(file) = DatasetFile::from_json(RECORDS, Path::new("cells.json")) else {
            unreachable!("records are valid JSON");
        };
        assert_eq!(file.len(), 2);
        assert!(!file.is_empty());

        let Ok(engine) = file.into_engine(SpatialParams::default()) else {
            unreachable!("records are valid");
        };
        assert_eq!(engine.dataset().name(), "ST");
        assert_eq!(engine.dataset().regions().len(), 1);
    }

    // Tests the document layout with a name and region override
    // Verified by ignoring the document regions
    #[test]
    fn test_document_layout() {
        let Ok(file) = DatasetFile::from_json(DOCUMENT, Path::new("lung.json")) else {
            unreachable!("document is valid JSON");
        };
        let Ok(engine) = file.into_engine(SpatialParams::default()) else {
            unreachable!("document is valid");
        };

        let names: Vec<&str> = engine.dataset().regions().iter().map(|r| r.name()).collect();
        assert_eq!(engine.dataset().name(), "lung");
        assert_eq!(names, vec!["r1", "r2"]);
    }

    // Tests that malformed JSON reports a parse error with the path
    // Verified by discarding the path in the parse error
    #[test]
    fn test_parse_error() {
        let result = DatasetFile::from_json("{\"cells\": 3}", Path::new("broken.json"));
        let Err(error) = result else {
            unreachable!("cells must be an array");
        };
        assert_eq!(error.kind(), ErrorKind::Io);
        assert!(error.to_string().contains("broken.json"));
    }

    // Tests loading from disk and the missing file error
    // Verified by reading the wrong path
    #[test]
    fn test_load_engine_from_disk() {
        let Ok(temp_dir) = TempDir::new() else {
            unreachable!("temp dir is available");
        };
        let path = temp_dir.path().join("cells.json");
        assert!(fs::write(&path, RECORDS).is_ok());

        let Ok(engine) = load_engine(&path, SpatialParams::default()) else {
            unreachable!("file holds valid records");
        };
        assert_eq!(engine.dataset().len(), 2);

        let missing = temp_dir.path().join("missing.json");
        assert!(
            load_engine(&missing, SpatialParams::default())
                .is_err_and(|error| error.kind() == ErrorKind::Io)
        );
    }

    // Tests that schema errors surface from engine construction
    // Verified by skipping record validation on load
    #[test]
    fn test_invalid_records_rejected() {
        let text = r#"[{"id": "a", "coordinates": [0, 0]}]"#;
        let Ok(file) = DatasetFile::from_json(text, Path::new("cells.json")) else {
            unreachable!("text is valid JSON");
        };
        assert!(
            file.into_engine(SpatialParams::default())
                .is_err_and(|error| error.kind() == ErrorKind::InvalidInput)
        );
    }
}
