//! Neighborhood extraction around center cells
//!
//! A neighborhood is the multiset of labels of the cells around one center,
//! found either by a fixed neighbor count (KNN) or by a distance radius. The
//! center never counts as its own neighbor and queries never leave the
//! center's region.

use crate::algorithm::cancellation::CancellationToken;
use crate::io::configuration::CANCELLATION_CHECK_INTERVAL;
use crate::io::error::{Result, computation_error, invalid_argument};
use crate::spatial::{Dataset, LabelId, RadiusOrder, Region};
use rayon::prelude::*;
use tracing::warn;

/// Rule defining which cells form a neighborhood
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NeighborhoodQuery {
    /// The `k` nearest cells, optionally dropping those beyond `max_dist`
    Knn {
        /// Number of neighbors (at least 1)
        k: usize,
        /// Optional distance cut-off applied after the nearest are found
        max_dist: Option<f64>,
    },
    /// Every cell within `max_dist`
    Radius {
        /// Neighborhood radius (boundary inclusive)
        max_dist: f64,
        /// Neighborhoods with fewer cells are discarded
        min_size: usize,
        /// Keep at most this many cells, nearest first
        max_ns: Option<usize>,
    },
}

impl NeighborhoodQuery {
    /// Check every parameter is within its domain
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error for `k < 1`, a non-positive or
    /// non-finite distance, or a zero size cap
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Knn { k, max_dist } => {
                if k < 1 {
                    return Err(invalid_argument("k", &k, &"must be at least 1"));
                }
                if let Some(distance) = max_dist {
                    check_distance(distance)?;
                }
            }
            Self::Radius {
                max_dist, max_ns, ..
            } => {
                check_distance(max_dist)?;
                if max_ns == Some(0) {
                    return Err(invalid_argument("max_ns", &0, &"must be at least 1"));
                }
            }
        }
        Ok(())
    }

    /// Clamp the distance parameter to `max_radius`
    #[must_use]
    pub fn clamped(self, max_radius: f64) -> Self {
        match self {
            Self::Knn {
                k,
                max_dist: Some(distance),
            } if distance > max_radius => {
                warn!(max_dist = distance, max_radius, "distance clamped to max_radius");
                Self::Knn {
                    k,
                    max_dist: Some(max_radius),
                }
            }
            Self::Radius {
                max_dist,
                min_size,
                max_ns,
            } if max_dist > max_radius => {
                warn!(max_dist, max_radius, "distance clamped to max_radius");
                Self::Radius {
                    max_dist: max_radius,
                    min_size,
                    max_ns,
                }
            }
            other => other,
        }
    }
}

fn check_distance(distance: f64) -> Result<()> {
    if !distance.is_finite() || distance <= 0.0 {
        return Err(invalid_argument(
            "max_dist",
            &distance,
            &"must be a finite positive distance",
        ));
    }
    Ok(())
}

/// Neighbor composition around one center cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighborhood {
    /// Dataset row of the center cell
    pub center: usize,
    /// Dataset rows of the neighbors
    pub neighbors: Vec<usize>,
    /// Neighbor labels, sorted (a multiset)
    pub composition: Vec<LabelId>,
    /// Whether the region held fewer cells than the KNN rule asked for
    pub partial: bool,
}

impl Neighborhood {
    /// Number of neighbors
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Whether the neighborhood has no neighbors
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Whether every label of a sorted, duplicate-free pattern occurs here
    pub fn contains_all(&self, pattern: &[LabelId]) -> bool {
        pattern
            .iter()
            .all(|label| self.composition.binary_search(label).is_ok())
    }
}

/// Label id width used by [`LabelSet`]
type CompactLabel = u16;

/// Distinct neighbor labels around one center cell
///
/// This is the form background neighborhoods are kept in: neighbor rows and
/// label multiplicity are dropped, leaving only what containment tests read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    /// Dataset row of the center cell
    pub center: usize,
    /// Whether the region held fewer cells than the KNN rule asked for
    pub partial: bool,
    labels: Box<[CompactLabel]>,
}

impl LabelSet {
    /// Build a set from labels in any order, dropping duplicates
    ///
    /// # Errors
    ///
    /// Returns a computation error for a label id beyond the compact range
    pub fn new(center: usize, partial: bool, labels: &[LabelId]) -> Result<Self> {
        let mut compact = labels
            .iter()
            .map(|&label| {
                CompactLabel::try_from(label).map_err(|_| {
                    computation_error(
                        "neighborhood compaction",
                        &format!("label id {label} exceeds the compact range"),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;
        compact.sort_unstable();
        compact.dedup();
        Ok(Self {
            center,
            partial,
            labels: compact.into_boxed_slice(),
        })
    }

    /// Compact form of a full neighborhood
    ///
    /// # Errors
    ///
    /// See [`LabelSet::new`]
    pub fn from_neighborhood(neighborhood: &Neighborhood) -> Result<Self> {
        Self::new(
            neighborhood.center,
            neighborhood.partial,
            &neighborhood.composition,
        )
    }

    /// Distinct labels, ascending
    pub fn labels(&self) -> impl Iterator<Item = LabelId> + '_ {
        self.labels.iter().map(|&label| LabelId::from(label))
    }

    /// Number of distinct labels
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no neighbor was found
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Whether every label of `pattern` occurs here
    pub fn contains_all(&self, pattern: &[LabelId]) -> bool {
        pattern.iter().all(|&label| {
            CompactLabel::try_from(label)
                .is_ok_and(|compact| self.labels.binary_search(&compact).is_ok())
        })
    }

    /// Bytes held inline and on the heap
    pub fn footprint(&self) -> usize {
        size_of::<Self>() + self.labels.len() * size_of::<CompactLabel>()
    }
}

/// Build the neighborhood of the cell at `local` within `region`
///
/// Returns `None` when a radius neighborhood is smaller than `min_size`.
///
/// # Errors
///
/// Propagates spatial query errors; fails with a computation error if the
/// local index does not belong to the region
pub fn neighborhood_of(
    dataset: &Dataset,
    region: &Region,
    local: usize,
    query: &NeighborhoodQuery,
) -> Result<Option<Neighborhood>> {
    let index = region.index();
    let (Some(point), Some(center)) = (index.coordinates(local), region.global_index(local)) else {
        return Err(computation_error(
            "neighborhood extraction",
            &format!("cell {local} is outside region '{}'", region.name()),
        ));
    };

    let (locals, partial): (Vec<usize>, bool) = match *query {
        NeighborhoodQuery::Knn { k, max_dist } => {
            // One extra slot covers the center itself
            let result = index.query_knn(point, k.saturating_add(1))?;
            let locals = result
                .neighbors
                .into_iter()
                .filter(|neighbor| neighbor.index != local)
                .take(k)
                .filter(|neighbor| max_dist.is_none_or(|limit| neighbor.distance <= limit))
                .map(|neighbor| neighbor.index)
                .collect();
            (locals, result.partial)
        }
        NeighborhoodQuery::Radius {
            max_dist,
            min_size,
            max_ns,
        } => {
            let order = if max_ns.is_some() {
                RadiusOrder::NearestFirst
            } else {
                RadiusOrder::Unordered
            };
            let mut found: Vec<usize> = index
                .query_radius(point, max_dist, order)?
                .into_iter()
                .filter(|neighbor| neighbor.index != local)
                .map(|neighbor| neighbor.index)
                .collect();
            if let Some(cap) = max_ns {
                found.truncate(cap);
            }
            if found.len() < min_size {
                return Ok(None);
            }
            (found, false)
        }
    };

    let neighbors: Vec<usize> = locals
        .into_iter()
        .filter_map(|neighbor| region.global_index(neighbor))
        .collect();
    let mut composition: Vec<LabelId> = neighbors
        .iter()
        .filter_map(|&row| dataset.label_of(row))
        .collect();
    composition.sort_unstable();

    Ok(Some(Neighborhood {
        center,
        neighbors,
        composition,
        partial,
    }))
}

/// Extract neighborhoods for the cells of one region
///
/// With `center_label` only cells of that type become centers, otherwise every
/// cell does. Output follows dataset order.
///
/// # Errors
///
/// Propagates query errors and [`CancellationToken::check`] failures
pub fn extract_region(
    dataset: &Dataset,
    region: &Region,
    center_label: Option<LabelId>,
    query: &NeighborhoodQuery,
    cancel: &CancellationToken,
) -> Result<Vec<Neighborhood>> {
    extract_region_as(dataset, region, center_label, query, cancel, &Ok)
}

/// Extract one region, converting each neighborhood as soon as it is built
fn extract_region_as<T, F>(
    dataset: &Dataset,
    region: &Region,
    center_label: Option<LabelId>,
    query: &NeighborhoodQuery,
    cancel: &CancellationToken,
    convert: &F,
) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(Neighborhood) -> Result<T> + Sync,
{
    let centers: Vec<usize> = (0..region.len())
        .filter(|&local| {
            center_label.is_none_or(|label| {
                region
                    .global_index(local)
                    .and_then(|row| dataset.label_of(row))
                    == Some(label)
            })
        })
        .collect();

    let extracted = centers
        .par_iter()
        .enumerate()
        .map(|(position, &local)| {
            if position % CANCELLATION_CHECK_INTERVAL == 0 {
                cancel.check("neighborhood extraction")?;
            }
            neighborhood_of(dataset, region, local, query)?
                .map(convert)
                .transpose()
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(extracted.into_iter().flatten().collect())
}

/// Extract neighborhoods for every region, one list per region
///
/// Regions are processed in parallel and never see each other's cells.
///
/// # Errors
///
/// Propagates query errors and cancellation
pub fn extract_dataset(
    dataset: &Dataset,
    center_label: Option<LabelId>,
    query: &NeighborhoodQuery,
    cancel: &CancellationToken,
) -> Result<Vec<Vec<Neighborhood>>> {
    dataset
        .regions()
        .par_iter()
        .map(|region| {
            cancel.check("neighborhood extraction")?;
            extract_region(dataset, region, center_label, query, cancel)
        })
        .collect()
}

/// Compact neighborhoods of every cell, one list per region
///
/// Full neighborhoods are reduced to [`LabelSet`]s one at a time, so the
/// neighbor rows of the whole dataset are never held at once.
///
/// # Errors
///
/// Propagates query errors and cancellation
pub fn extract_background(
    dataset: &Dataset,
    query: &NeighborhoodQuery,
    cancel: &CancellationToken,
) -> Result<Vec<Vec<LabelSet>>> {
    let compact = |neighborhood: Neighborhood| LabelSet::from_neighborhood(&neighborhood);
    dataset
        .regions()
        .par_iter()
        .map(|region| {
            cancel.check("neighborhood extraction")?;
            extract_region_as(dataset, region, None, query, cancel, &compact)
        })
        .collect()
}
