//! Static kd-tree answering k-nearest and radius queries over one region
//!
//! The tree is built once from a fixed point set and is read-only afterwards,
//! so a single instance can serve queries from many threads at once. Points are
//! identified by their row in the matrix the tree was built from; every ordering
//! the tree produces breaks distance ties by that row index.

use crate::io::error::{Result, invalid_argument, invalid_input};
use ndarray::Array2;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Point returned by a spatial query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Row of the point in the indexed matrix
    pub index: usize,
    /// Euclidean distance to the query point
    pub distance: f64,
}

/// Answer to a k-nearest query
#[derive(Debug, Clone, PartialEq)]
pub struct KnnResult {
    /// Neighbors ordered by ascending distance, then by index
    pub neighbors: Vec<Neighbor>,
    /// Set when the tree holds fewer points than were requested
    pub partial: bool,
}

/// Ordering of radius query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RadiusOrder {
    /// Tree traversal order (deterministic, not sorted)
    #[default]
    Unordered,
    /// Ascending distance, ties by index
    NearestFirst,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        start: usize,
        end: usize,
    },
    Split {
        axis: usize,
        value: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance_sq: f64,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_sq
            .total_cmp(&other.distance_sq)
            .then(self.index.cmp(&other.index))
    }
}

impl Candidate {
    fn into_neighbor(self) -> Neighbor {
        Neighbor {
            index: self.index,
            distance: self.distance_sq.sqrt(),
        }
    }
}

/// Balanced kd-tree over 2D or 3D points
#[derive(Debug, Clone)]
pub struct KdTree {
    points: Array2<f64>,
    order: Vec<usize>,
    nodes: Vec<Node>,
    root: usize,
    leaf_size: usize,
}

impl KdTree {
    /// Build a tree over the rows of `points` (one row per point)
    ///
    /// Splits on the axis with the widest spread at the median, giving
    /// O(n log n) construction and a tree depth of O(log n).
    ///
    /// # Errors
    ///
    /// Returns an invalid input error if there are no points, if the
    /// dimensionality is not 2 or 3, or if any coordinate is not finite.
    /// Returns an invalid argument error if `leaf_size` is zero.
    pub fn build(points: Array2<f64>, leaf_size: usize) -> Result<Self> {
        let (count, dims) = points.dim();
        if count == 0 {
            return Err(invalid_input(&"spatial index requires at least one cell"));
        }
        if dims != 2 && dims != 3 {
            return Err(invalid_input(&format!(
                "coordinates must have 2 or 3 components, got {dims}"
            )));
        }
        if points.iter().any(|value| !value.is_finite()) {
            return Err(invalid_input(&"coordinates must be finite"));
        }
        if leaf_size == 0 {
            return Err(invalid_argument(
                "leaf_size",
                &leaf_size,
                &"must be at least 1",
            ));
        }

        // Rows must be contiguous for coordinate slices
        let points = if points.is_standard_layout() {
            points
        } else {
            points.as_standard_layout().into_owned()
        };

        let mut tree = Self {
            points,
            order: (0..count).collect(),
            nodes: Vec::new(),
            root: 0,
            leaf_size,
        };
        tree.root = tree.build_node(0, count);
        Ok(tree)
    }

    fn build_node(&mut self, start: usize, end: usize) -> usize {
        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf { start, end });

        if end - start <= self.leaf_size {
            return node_id;
        }

        let axis = self.widest_axis(start, end);
        let mid = (end - start) / 2;
        let points = &self.points;
        let value = match self.order.get_mut(start..end) {
            Some(slice) => {
                slice.select_nth_unstable_by(mid, |&a, &b| {
                    coordinate(points, a, axis)
                        .total_cmp(&coordinate(points, b, axis))
                        .then(a.cmp(&b))
                });
                slice
                    .get(mid)
                    .map_or(0.0, |&index| coordinate(points, index, axis))
            }
            None => return node_id,
        };

        let left = self.build_node(start, start + mid);
        let right = self.build_node(start + mid, end);
        if let Some(node) = self.nodes.get_mut(node_id) {
            *node = Node::Split {
                axis,
                value,
                left,
                right,
            };
        }
        node_id
    }

    fn widest_axis(&self, start: usize, end: usize) -> usize {
        let members = self.order.get(start..end).unwrap_or(&[]);
        let mut best_axis = 0;
        let mut best_spread = f64::NEG_INFINITY;

        for axis in 0..self.dims() {
            let mut low = f64::INFINITY;
            let mut high = f64::NEG_INFINITY;
            for &index in members {
                let value = coordinate(&self.points, index, axis);
                low = low.min(value);
                high = high.max(value);
            }
            if high - low > best_spread {
                best_spread = high - low;
                best_axis = axis;
            }
        }

        best_axis
    }

    /// Number of indexed points
    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    /// Whether the tree holds no points (never true for a built tree)
    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    /// Dimensionality of the indexed points
    pub fn dims(&self) -> usize {
        self.points.ncols()
    }

    /// Maximum number of points per leaf
    pub const fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Coordinates of an indexed point
    pub fn coordinates(&self, index: usize) -> Option<&[f64]> {
        if index >= self.len() {
            return None;
        }
        self.points.row(index).to_slice()
    }

    /// Find the `k` nearest points to `point`
    ///
    /// If the tree holds fewer than `k` points every point is returned and the
    /// result is flagged as partial.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error if the query point has the wrong
    /// dimensionality or a non-finite component.
    pub fn query_knn(&self, point: &[f64], k: usize) -> Result<KnnResult> {
        self.check_point(point)?;

        let available = self.len();
        let target = k.min(available);
        let mut heap = BinaryHeap::with_capacity(target + 1);
        if target > 0 {
            self.knn_visit(self.root, point, target, &mut heap);
        }

        let neighbors = heap
            .into_sorted_vec()
            .into_iter()
            .map(Candidate::into_neighbor)
            .collect();

        Ok(KnnResult {
            neighbors,
            partial: available < k,
        })
    }

    fn knn_visit(
        &self,
        node_id: usize,
        point: &[f64],
        k: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        match self.nodes.get(node_id) {
            Some(&Node::Leaf { start, end }) => {
                for &index in self.order.get(start..end).unwrap_or(&[]) {
                    let candidate = Candidate {
                        distance_sq: self.squared_distance(index, point),
                        index,
                    };
                    if heap.len() < k {
                        heap.push(candidate);
                    } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                        heap.pop();
                        heap.push(candidate);
                    }
                }
            }
            Some(&Node::Split {
                axis,
                value,
                left,
                right,
            }) => {
                let diff = point.get(axis).copied().unwrap_or(0.0) - value;
                let (near, far) = if diff < 0.0 {
                    (left, right)
                } else {
                    (right, left)
                };

                self.knn_visit(near, point, k, heap);

                // Equal bounds still descend so lower-index ties are found
                let bound = diff * diff;
                if heap.len() < k || heap.peek().is_some_and(|worst| bound <= worst.distance_sq) {
                    self.knn_visit(far, point, k, heap);
                }
            }
            None => {}
        }
    }

    /// Find every point within `radius` of `point` (boundary inclusive)
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error if the query point is malformed or
    /// the radius is negative or not finite.
    pub fn query_radius(
        &self,
        point: &[f64],
        radius: f64,
        order: RadiusOrder,
    ) -> Result<Vec<Neighbor>> {
        self.check_point(point)?;
        if !radius.is_finite() || radius < 0.0 {
            return Err(invalid_argument(
                "radius",
                &radius,
                &"must be a finite non-negative distance",
            ));
        }

        let mut found = Vec::new();
        self.radius_visit(self.root, point, radius * radius, &mut found);

        if order == RadiusOrder::NearestFirst {
            found.sort_unstable();
        }

        Ok(found.into_iter().map(Candidate::into_neighbor).collect())
    }

    fn radius_visit(
        &self,
        node_id: usize,
        point: &[f64],
        radius_sq: f64,
        found: &mut Vec<Candidate>,
    ) {
        match self.nodes.get(node_id) {
            Some(&Node::Leaf { start, end }) => {
                for &index in self.order.get(start..end).unwrap_or(&[]) {
                    let distance_sq = self.squared_distance(index, point);
                    if distance_sq <= radius_sq {
                        found.push(Candidate { distance_sq, index });
                    }
                }
            }
            Some(&Node::Split {
                axis,
                value,
                left,
                right,
            }) => {
                let diff = point.get(axis).copied().unwrap_or(0.0) - value;
                let (near, far) = if diff < 0.0 {
                    (left, right)
                } else {
                    (right, left)
                };

                self.radius_visit(near, point, radius_sq, found);
                if diff * diff <= radius_sq {
                    self.radius_visit(far, point, radius_sq, found);
                }
            }
            None => {}
        }
    }

    fn check_point(&self, point: &[f64]) -> Result<()> {
        if point.len() != self.dims() {
            return Err(invalid_argument(
                "point",
                &format!("{point:?}"),
                &format!("expected {} coordinates", self.dims()),
            ));
        }
        if point.iter().any(|value| !value.is_finite()) {
            return Err(invalid_argument(
                "point",
                &format!("{point:?}"),
                &"coordinates must be finite",
            ));
        }
        Ok(())
    }

    fn squared_distance(&self, index: usize, point: &[f64]) -> f64 {
        self.points
            .row(index)
            .iter()
            .zip(point)
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

fn coordinate(points: &Array2<f64>, index: usize, axis: usize) -> f64 {
    points.get([index, axis]).copied().unwrap_or(0.0)
}
