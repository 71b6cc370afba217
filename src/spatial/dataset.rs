//! Validated cell datasets partitioned into independently indexed regions
//!
//! Raw records arrive with every field optional. `Dataset::from_records`
//! is the single schema-validation step: anything missing or ambiguous is
//! rejected here, before any index is built.

use crate::io::configuration::{
    DEFAULT_LEAF_SIZE, DEFAULT_MAX_RADIUS, DEFAULT_REGION, MAX_CELL_TYPES,
};
use crate::io::error::{Result, invalid_argument, invalid_input};
use crate::spatial::region::Region;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Interned cell-type label; ids follow lexicographic label order
pub type LabelId = usize;

/// Unvalidated cell as supplied by a caller or file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    /// Stable cell identifier
    #[serde(default, alias = "cell_id")]
    pub id: Option<String>,
    /// Spatial coordinates (2 or 3 components)
    #[serde(default, alias = "coords", alias = "spatial")]
    pub coordinates: Option<Vec<f64>>,
    /// Cell-type label
    #[serde(default, alias = "cell_type", alias = "predicted_label")]
    pub label: Option<String>,
    /// Region / field-of-view identifier
    #[serde(default, alias = "fov")]
    pub region: Option<String>,
}

/// A validated cell
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Stable cell identifier
    pub id: String,
    /// Spatial coordinates (2 or 3 components)
    pub coordinates: Vec<f64>,
    /// Cell-type label
    pub label: String,
    /// Region the cell belongs to
    pub region: String,
}

/// Spatial index construction parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialParams {
    /// Maximum number of points per kd-tree leaf
    pub leaf_size: usize,
    /// Largest query radius; larger requests are clamped to it
    pub max_radius: f64,
}

impl Default for SpatialParams {
    fn default() -> Self {
        Self {
            leaf_size: DEFAULT_LEAF_SIZE,
            max_radius: DEFAULT_MAX_RADIUS,
        }
    }
}

impl SpatialParams {
    /// Check parameters are within their domains
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error for a zero leaf size or a
    /// non-positive or non-finite maximum radius
    pub fn validate(&self) -> Result<()> {
        if self.leaf_size == 0 {
            return Err(invalid_argument(
                "leaf_size",
                &self.leaf_size,
                &"must be at least 1",
            ));
        }
        if !self.max_radius.is_finite() || self.max_radius <= 0.0 {
            return Err(invalid_argument(
                "max_radius",
                &self.max_radius,
                &"must be a finite positive distance",
            ));
        }
        Ok(())
    }
}

/// Ordered cell collection with per-region spatial indices
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    ids: Vec<String>,
    labels: Vec<LabelId>,
    coordinates: Array2<f64>,
    vocabulary: Vec<String>,
    regions: Vec<Region>,
    region_of: Vec<usize>,
    params: SpatialParams,
}

impl Dataset {
    /// Validate raw records and build the dataset
    ///
    /// When `regions` is given it assigns one region per record and overrides
    /// any region carried by the records themselves.
    ///
    /// # Errors
    ///
    /// Returns an invalid input error when a record is missing its id, label
    /// or coordinates, when region assignment is ambiguous, or when the
    /// validated cells fail [`Dataset::from_cells`]
    pub fn from_records(
        name: &str,
        records: Vec<CellRecord>,
        regions: Option<Vec<String>>,
        params: SpatialParams,
    ) -> Result<Self> {
        if let Some(assigned) = &regions {
            if assigned.len() != records.len() {
                return Err(invalid_input(&format!(
                    "region list has {} entries for {} cells",
                    assigned.len(),
                    records.len()
                )));
            }
        }

        let with_region = records.iter().filter(|r| r.region.is_some()).count();
        if regions.is_none() && with_region != 0 && with_region != records.len() {
            return Err(invalid_input(&format!(
                "{with_region} of {} cells carry a region; either all or none must",
                records.len()
            )));
        }

        let mut overrides = regions.map(Vec::into_iter);
        let mut cells = Vec::with_capacity(records.len());

        for (row, record) in records.into_iter().enumerate() {
            let id = required_text(record.id, "id", row)?;
            let label = required_text(record.label, "label", row)?;
            let coordinates = record
                .coordinates
                .ok_or_else(|| invalid_input(&format!("cell at row {row} has no coordinates")))?;

            let region = match overrides.as_mut().and_then(|assigned| assigned.next()) {
                Some(assigned) => assigned,
                None => record.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            };
            if region.trim().is_empty() {
                return Err(invalid_input(&format!("cell at row {row} has a blank region")));
            }

            cells.push(Cell {
                id,
                coordinates,
                label,
                region,
            });
        }

        Self::from_cells(name, cells, params)
    }

    /// Build the dataset from validated cells
    ///
    /// # Errors
    ///
    /// Returns an invalid input error for an empty cell list, inconsistent or
    /// unsupported dimensionality, non-finite coordinates or duplicate ids, and
    /// an invalid argument error for out-of-domain spatial parameters
    pub fn from_cells(name: &str, cells: Vec<Cell>, params: SpatialParams) -> Result<Self> {
        params.validate()?;

        let Some(first) = cells.first() else {
            return Err(invalid_input(&"dataset contains no cells"));
        };
        let dims = first.coordinates.len();
        if dims != 2 && dims != 3 {
            return Err(invalid_input(&format!(
                "coordinates must have 2 or 3 components, got {dims}"
            )));
        }

        let mut seen_ids = HashSet::with_capacity(cells.len());
        for (row, cell) in cells.iter().enumerate() {
            if cell.id.trim().is_empty() || cell.label.trim().is_empty() {
                return Err(invalid_input(&format!(
                    "cell at row {row} has a blank id or label"
                )));
            }
            if cell.coordinates.len() != dims {
                return Err(invalid_input(&format!(
                    "cell '{}' at row {row} has {} coordinates, expected {dims}",
                    cell.id,
                    cell.coordinates.len()
                )));
            }
            if cell.coordinates.iter().any(|value| !value.is_finite()) {
                return Err(invalid_input(&format!(
                    "cell '{}' at row {row} has non-finite coordinates",
                    cell.id
                )));
            }
            if !seen_ids.insert(cell.id.as_str()) {
                return Err(invalid_input(&format!("duplicate cell id '{}'", cell.id)));
            }
        }

        // Sorted vocabulary makes label id order equal lexicographic order
        let vocabulary: Vec<String> = cells
            .iter()
            .map(|cell| cell.label.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if vocabulary.len() > MAX_CELL_TYPES {
            return Err(invalid_input(&format!(
                "{} distinct cell types exceed the limit of {MAX_CELL_TYPES}",
                vocabulary.len()
            )));
        }
        let label_lookup: HashMap<&str, LabelId> = vocabulary
            .iter()
            .enumerate()
            .map(|(id, label)| (label.as_str(), id))
            .collect();

        let mut region_names: Vec<String> = Vec::new();
        let mut region_lookup: HashMap<String, usize> = HashMap::new();
        let mut members: Vec<Vec<usize>> = Vec::new();
        let mut region_of = Vec::with_capacity(cells.len());
        let mut labels = Vec::with_capacity(cells.len());
        let mut flat = Vec::with_capacity(cells.len() * dims);
        let mut ids = Vec::with_capacity(cells.len());

        for (row, cell) in cells.into_iter().enumerate() {
            let region = if let Some(&existing) = region_lookup.get(&cell.region) {
                existing
            } else {
                let created = region_names.len();
                region_lookup.insert(cell.region.clone(), created);
                region_names.push(cell.region.clone());
                members.push(Vec::new());
                created
            };
            if let Some(list) = members.get_mut(region) {
                list.push(row);
            }
            region_of.push(region);

            let label = label_lookup
                .get(cell.label.as_str())
                .copied()
                .ok_or_else(|| invalid_input(&format!("unknown label '{}'", cell.label)))?;
            labels.push(label);

            flat.extend_from_slice(&cell.coordinates);
            ids.push(cell.id);
        }

        let coordinates = Array2::from_shape_vec((ids.len(), dims), flat)
            .map_err(|e| invalid_input(&format!("coordinate matrix: {e}")))?;

        let regions = region_names
            .into_iter()
            .zip(members)
            .map(|(region_name, rows)| {
                Region::build(region_name, rows, &coordinates, params.leaf_size)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            dataset = name,
            cells = ids.len(),
            regions = regions.len(),
            labels = vocabulary.len(),
            "dataset validated"
        );

        Ok(Self {
            name: name.to_string(),
            ids,
            labels,
            coordinates,
            vocabulary,
            regions,
            region_of,
            params,
        })
    }

    /// Dataset name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the dataset has no cells (never true once built)
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Coordinate dimensionality (2 or 3)
    pub fn dims(&self) -> usize {
        self.coordinates.ncols()
    }

    /// Spatial parameters the indices were built with
    pub const fn params(&self) -> &SpatialParams {
        &self.params
    }

    /// Identifier of the cell at `row`
    pub fn cell_id(&self, row: usize) -> Option<&str> {
        self.ids.get(row).map(String::as_str)
    }

    /// Label id of the cell at `row`
    pub fn label_of(&self, row: usize) -> Option<LabelId> {
        self.labels.get(row).copied()
    }

    /// Coordinates of the cell at `row`
    pub fn coordinates(&self, row: usize) -> Option<&[f64]> {
        if row >= self.len() {
            return None;
        }
        self.coordinates.row(row).to_slice()
    }

    /// Region index of the cell at `row`
    pub fn region_of(&self, row: usize) -> Option<usize> {
        self.region_of.get(row).copied()
    }

    /// Label text for a label id
    pub fn label_name(&self, label: LabelId) -> Option<&str> {
        self.vocabulary.get(label).map(String::as_str)
    }

    /// Label id for a label text
    pub fn label_id(&self, name: &str) -> Option<LabelId> {
        self.vocabulary
            .binary_search_by(|candidate| candidate.as_str().cmp(name))
            .ok()
    }

    /// All labels in lexicographic order (index = label id)
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Regions in order of first appearance
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
}

fn required_text(value: Option<String>, field: &str, row: usize) -> Result<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(invalid_input(&format!("cell at row {row} has a blank {field}"))),
        None => Err(invalid_input(&format!("cell at row {row} has no {field}"))),
    }
}
