//! Spatial data structures: validated datasets, regions and nearest-neighbor indices
//!
//! This module contains:
//! - Dataset schema validation and label interning
//! - Region partitioning (no neighbor leaks across regions)
//! - The kd-tree answering k-nearest and radius queries

/// Validated datasets and raw cell records
pub mod dataset;
/// Static kd-tree for neighbor queries
pub mod kdtree;
/// Independently indexed regions of a dataset
pub mod region;

pub use dataset::{Cell, CellRecord, Dataset, LabelId, SpatialParams};
pub use kdtree::{KdTree, KnnResult, Neighbor, RadiusOrder};
pub use region::Region;
