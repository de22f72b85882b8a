use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ortelius_types::cartesian::{CartesianPoint2d, Point2d};

use crate::error::OrteliusError;

/// A point returned by a nearest-neighbor query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the point in the original dataset, including entries that
    /// were excluded from the index.
    pub index: usize,
    /// Euclidean distance from the query point.
    pub distance: f64,
    /// Position of the point in plot-projection space.
    pub position: Point2d,
}

/// Immutable kd-tree over a snapshot of dataset coordinates.
///
/// Entries with non-finite coordinates are excluded from the tree but keep
/// their original indices, so query results always refer to positions in
/// the dataset the index was built from.
#[derive(Debug)]
pub struct SpatialIndex {
    nodes: Vec<Node>,
    root: Option<usize>,
}

#[derive(Debug)]
struct Node {
    position: Point2d,
    index: usize,
    axis: u8,
    left: Option<usize>,
    right: Option<usize>,
}

impl SpatialIndex {
    /// Builds an index over the given coordinates.
    ///
    /// Returns [`OrteliusError::EmptyDataset`] if no finite point remains
    /// after filtering.
    pub fn build<P: CartesianPoint2d<Num = f64>>(points: &[P]) -> Result<Self, OrteliusError> {
        let mut items: Vec<(Point2d, usize)> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.x().is_finite() && p.y().is_finite())
            .map(|(index, p)| (Point2d::new(p.x(), p.y()), index))
            .collect();

        if items.is_empty() {
            return Err(OrteliusError::EmptyDataset);
        }

        let mut nodes = Vec::with_capacity(items.len());
        let root = build_subtree(&mut nodes, &mut items, 0);

        Ok(Self { nodes, root })
    }

    /// Number of points in the index.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the index contains no points.
    ///
    /// Cannot actually happen for an index obtained from
    /// [`SpatialIndex::build`], which rejects empty datasets.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns up to `n` points nearest to `query` within `radius`,
    /// ordered by distance ascending. Ties at equal distance are broken by
    /// the original data index ascending.
    pub fn nearest(&self, query: Point2d, n: usize, radius: f64) -> Vec<Neighbor> {
        if n == 0 {
            return vec![];
        }

        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(n + 1);
        self.search(self.root, query, n, radius, &mut heap);

        heap.into_sorted_vec()
            .into_iter()
            .map(|candidate| Neighbor {
                index: candidate.index,
                distance: candidate.distance,
                position: candidate.position,
            })
            .collect()
    }

    /// Median over all indexed points of the distance to their nearest
    /// other point. Used to estimate a sensible search radius for datasets
    /// that did not specify one.
    ///
    /// Returns infinity for an index over a single point.
    pub fn median_spacing(&self) -> f64 {
        if self.nodes.len() < 2 {
            return f64::INFINITY;
        }

        let mut spacings: Vec<f64> = self
            .nodes
            .iter()
            .map(|node| {
                self.nearest(node.position, 2, f64::INFINITY)
                    .into_iter()
                    .find(|neighbor| neighbor.index != node.index)
                    .map(|neighbor| neighbor.distance)
                    .unwrap_or(f64::INFINITY)
            })
            .collect();

        spacings.sort_by(f64::total_cmp);
        spacings[spacings.len() / 2]
    }

    fn search(
        &self,
        node: Option<usize>,
        query: Point2d,
        n: usize,
        radius: f64,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let Some(node_index) = node else {
            return;
        };
        let node = &self.nodes[node_index];

        let distance = (query - node.position).norm();
        if distance <= radius {
            heap.push(Candidate {
                distance,
                index: node.index,
                position: node.position,
            });
            if heap.len() > n {
                heap.pop();
            }
        }

        let axis_delta = match node.axis {
            0 => query.x - node.position.x,
            _ => query.y - node.position.y,
        };
        let (near, far) = if axis_delta <= 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        self.search(near, query, n, radius, heap);

        let mut bound = radius;
        if heap.len() == n {
            if let Some(worst) = heap.peek() {
                bound = bound.min(worst.distance);
            }
        }
        if axis_delta.abs() <= bound {
            self.search(far, query, n, radius, heap);
        }
    }
}

fn build_subtree(
    nodes: &mut Vec<Node>,
    items: &mut [(Point2d, usize)],
    depth: usize,
) -> Option<usize> {
    if items.is_empty() {
        return None;
    }

    let axis = (depth % 2) as u8;
    let median = items.len() / 2;
    items.select_nth_unstable_by(median, |a, b| compare_on_axis(a, b, axis));

    let (position, index) = items[median];
    let node_index = nodes.len();
    nodes.push(Node {
        position,
        index,
        axis,
        left: None,
        right: None,
    });

    let (left_items, rest) = items.split_at_mut(median);
    let left = build_subtree(nodes, left_items, depth + 1);
    let right = build_subtree(nodes, &mut rest[1..], depth + 1);

    nodes[node_index].left = left;
    nodes[node_index].right = right;

    Some(node_index)
}

fn compare_on_axis(a: &(Point2d, usize), b: &(Point2d, usize), axis: u8) -> Ordering {
    let (av, bv) = match axis {
        0 => (a.0.x, b.0.x),
        _ => (a.0.y, b.0.y),
    };
    av.total_cmp(&bv).then_with(|| a.1.cmp(&b.1))
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f64,
    index: usize,
    position: Point2d,
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
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.index.cmp(&other.index))
    }
}
