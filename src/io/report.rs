//! JSON reports of batch runs

use crate::algorithm::engine::PatternSupport;
use crate::analysis::enrichment::EnrichmentRecord;
use crate::io::error::{MotifError, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Results for one center cell type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CenterResults {
    /// Output of a frequent pattern run
    FrequentPatterns {
        /// Patterns with their support
        frequent_patterns: Vec<PatternSupport>,
    },
    /// Output of an enrichment run
    Enrichment {
        /// One record per tested pattern
        enrichment_results: Vec<EnrichmentRecord>,
    },
}

/// Results of one analysis for a center cell type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CenterReport {
    /// Center cell type
    pub ct: String,
    /// Results for that center
    #[serde(flatten)]
    pub results: CenterResults,
}

/// Report of a CLI run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Dataset name
    pub dataset: String,
    /// Operation that was run
    pub operation: String,
    /// Parameters as given
    pub parameters: serde_json::Value,
    /// One entry per center type, in request order
    pub centers: Vec<CenterReport>,
}

impl Report {
    /// Serialize as pretty JSON into `writer`
    ///
    /// # Errors
    ///
    /// Returns a file system error if writing fails
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = writer;
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(std::io::Error::from)
            .and_then(|()| writer.write_all(b"\n"))
            .and_then(|()| writer.flush())
            .map_err(|source| MotifError::FileSystem {
                path: "<report>".into(),
                operation: "write report",
                source,
            })
    }

    /// Write the report to a file, replacing it
    ///
    /// # Errors
    ///
    /// Returns a file system error if the file cannot be created or written
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|source| MotifError::FileSystem {
            path: path.to_path_buf(),
            operation: "create report",
            source,
        })?;
        self.write_to(BufWriter::new(file))
    }
}
