//! Dataset files on disk
//!
//! A dataset file is JSON, either a bare array of cell records or a document
//! `{ "dataset": "...", "cells": [...], "regions": [...] }` where `dataset` and
//! `regions` are optional.

use crate::algorithm::engine::MotifEngine;
use crate::io::configuration::DEFAULT_DATASET_NAME;
use crate::io::error::{MotifError, Result};
use crate::spatial::{CellRecord, SpatialParams};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Parsed dataset file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DatasetFile {
    /// `[ { "id": ..., "coordinates": [...], "label": ... }, ... ]`
    Records(Vec<CellRecord>),
    /// Named document with optional region override
    Document {
        /// Dataset name
        #[serde(default)]
        dataset: Option<String>,
        /// Cell records
        cells: Vec<CellRecord>,
        /// Per-cell region override
        #[serde(default)]
        regions: Option<Vec<String>>,
    },
}

impl DatasetFile {
    /// Parse a dataset from JSON text; `path` is used for error reporting
    ///
    /// # Errors
    ///
    /// Returns a parse error if the text matches neither layout
    pub fn from_json(text: &str, path: &Path) -> Result<Self> {
        serde_json::from_str(text).map_err(|source| MotifError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read and parse a dataset file
    ///
    /// # Errors
    ///
    /// Returns a file system error if the file cannot be read and a parse
    /// error if it is not a valid dataset
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| MotifError::FileSystem {
            path: path.to_path_buf(),
            operation: "read dataset",
            source,
        })?;
        let parsed = Self::from_json(&text, path)?;
        debug!(path = %path.display(), cells = parsed.len(), "dataset file parsed");
        Ok(parsed)
    }

    /// Number of records in the file
    pub fn len(&self) -> usize {
        match self {
            Self::Records(cells) | Self::Document { cells, .. } => cells.len(),
        }
    }

    /// Whether the file holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate the records and build an engine
    ///
    /// # Errors
    ///
    /// Propagates [`MotifEngine::create_named`] errors
    pub fn into_engine(self, params: SpatialParams) -> Result<MotifEngine> {
        match self {
            Self::Records(cells) => {
                MotifEngine::create_named(DEFAULT_DATASET_NAME, cells, None, params)
            }
            Self::Document {
                dataset,
                cells,
                regions,
            } => MotifEngine::create_named(
                dataset.as_deref().unwrap_or(DEFAULT_DATASET_NAME),
                cells,
                regions,
                params,
            ),
        }
    }
}

/// Read a dataset file and build its engine
///
/// # Errors
///
/// Returns file system, parse or dataset validation errors
pub fn load_engine(path: &Path, params: SpatialParams) -> Result<MotifEngine> {
    DatasetFile::read(path)?.into_engine(params)
}
