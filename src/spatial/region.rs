//! Regions (fields of view) that are indexed and queried independently

use crate::io::error::Result;
use crate::spatial::kdtree::KdTree;
use ndarray::{Array2, Axis};

/// A spatially contiguous subset of a dataset with its own spatial index
///
/// Member cells are stored as dataset rows in ascending order, so the local
/// index used by the kd-tree preserves dataset order.
#[derive(Debug, Clone)]
pub struct Region {
    name: String,
    cells: Vec<usize>,
    index: KdTree,
}

impl Region {
    /// Build the spatial index for the given dataset rows
    ///
    /// # Errors
    ///
    /// Returns an error if the region is empty or the index cannot be built
    pub fn build(
        name: String,
        mut cells: Vec<usize>,
        coordinates: &Array2<f64>,
        leaf_size: usize,
    ) -> Result<Self> {
        cells.sort_unstable();
        let points = coordinates.select(Axis(0), &cells);
        let index = KdTree::build(points, leaf_size)?;

        Ok(Self { name, cells, index })
    }

    /// Region identifier
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dataset rows belonging to this region, ascending
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    /// Number of cells in the region
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the region has no cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Spatial index over the region's cells (local indices)
    pub const fn index(&self) -> &KdTree {
        &self.index
    }

    /// Map a local index back to its dataset row
    pub fn global_index(&self, local: usize) -> Option<usize> {
        self.cells.get(local).copied()
    }
}
