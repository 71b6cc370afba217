//! Spatial neighborhood motif mining for single-cell datasets
//!
//! Cells carry 2D/3D coordinates, a cell-type label and a region. For a
//! center cell type the engine collects neighborhoods (k nearest neighbors or
//! a radius), mines cell-type sets that occur frequently around the centers,
//! and tests candidate motifs for enrichment with a hypergeometric test.

#![forbid(unsafe_code)]

/// Engine, transaction bitsets, caching and cancellation
pub mod algorithm;
/// Neighborhood extraction, pattern mining and enrichment testing
pub mod analysis;
/// Input/output operations and error handling
pub mod io;
/// Hypergeometric law and multiple-testing correction
pub mod math;
/// Dataset registry and request handling for service layers
pub mod service;
/// Datasets, regions and the kd-tree spatial index
pub mod spatial;

pub use algorithm::cancellation::CancellationToken;
pub use algorithm::engine::{MotifEngine, PatternSupport};
pub use analysis::enrichment::{Alternative, EnrichmentOptions, EnrichmentRecord};
pub use analysis::patterns::Motif;
pub use io::error::{ErrorKind, MotifError, Result};
pub use math::correction::CorrectionMethod;
pub use spatial::{CellRecord, SpatialParams};
