//! 2D k-d tree for spatial indexing
//!
//! Provides O(log n) nearest-neighbor and k-nearest-neighbor queries
//! for scattered point data, optionally bounded by a search radius.
//! Queries are exact: results match a brute-force scan.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::SamplePoint;

/// A 2D k-d tree over sample points.
///
/// Result indices are positions in the slice passed to [`KdTree::build`].
#[derive(Debug)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    points: Vec<SamplePoint>,
}

#[derive(Debug)]
struct KdNode {
    /// Index into `points`
    point_idx: usize,
    /// Split dimension: 0 = x, 1 = y
    split_dim: u8,
    left: Option<usize>,
    right: Option<usize>,
}

/// Result of a nearest-neighbor query
#[derive(Debug, Clone, Copy)]
pub struct NearestResult {
    pub point: SamplePoint,
    pub distance_sq: f64,
    pub index: usize,
}

/// Total order on (distance², index): nearer first, lower index on ties.
#[inline]
fn rank(a: (f64, usize), b: (f64, usize)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

/// Heap entry ordered by [`rank`], so a max-heap keeps the worst on top
#[derive(Debug, Clone, Copy)]
struct Candidate {
    dist_sq: f64,
    index: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        rank((self.dist_sq, self.index), (other.dist_sq, other.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl KdTree {
    /// Build a k-d tree from sample points.
    ///
    /// Construction is O(n log n) using in-place median selection.
    pub fn build(points: &[SamplePoint]) -> Self {
        let mut nodes = Vec::with_capacity(points.len());
        if !points.is_empty() {
            let mut indices: Vec<usize> = (0..points.len()).collect();
            build_recursive(points, &mut indices, 0, &mut nodes);
        }

        Self {
            nodes,
            points: points.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point stored at `index`
    pub fn point(&self, index: usize) -> Option<&SamplePoint> {
        self.points.get(index)
    }

    /// Find the single nearest point to (qx, qy).
    ///
    /// Returns `None` if the tree is empty.
    pub fn nearest(&self, qx: f64, qy: f64) -> Option<NearestResult> {
        self.nearest_within(qx, qy, 1, None).into_iter().next()
    }

    /// Find the k nearest points to (qx, qy), sorted by ascending distance.
    pub fn k_nearest(&self, qx: f64, qy: f64, k: usize) -> Vec<NearestResult> {
        if k == 0 {
            return Vec::new();
        }
        self.nearest_within(qx, qy, k, None)
    }

    /// Find all points within `radius` of (qx, qy), sorted by ascending distance.
    pub fn within_radius(&self, qx: f64, qy: f64, radius: f64) -> Vec<NearestResult> {
        if radius <= 0.0 {
            return Vec::new();
        }
        self.nearest_within(qx, qy, 0, Some(radius * radius))
    }

    /// Up to `k` nearest points with squared distance ≤ `radius_sq`.
    ///
    /// `k == 0` means no count limit, `radius_sq == None` no distance limit.
    /// Results are sorted by ascending distance, ties by ascending index.
    pub fn nearest_within(
        &self,
        qx: f64,
        qy: f64,
        k: usize,
        radius_sq: Option<f64>,
    ) -> Vec<NearestResult> {
        if self.nodes.is_empty() {
            return Vec::new();
        }

        let k = if k == 0 { self.points.len() } else { k.min(self.points.len()) };
        let mut query = Query {
            qx,
            qy,
            k,
            radius_sq: radius_sq.unwrap_or(f64::INFINITY),
            best: BinaryHeap::with_capacity(k),
        };

        self.search(0, &mut query);

        query
            .best
            .into_sorted_vec()
            .into_iter()
            .map(|c| NearestResult {
                point: self.points[c.index],
                distance_sq: c.dist_sq,
                index: c.index,
            })
            .collect()
    }

    fn search(&self, node_idx: usize, query: &mut Query) {
        let node = &self.nodes[node_idx];
        let p = &self.points[node.point_idx];

        let dx = query.qx - p.x;
        let dy = query.qy - p.y;
        query.offer(dx * dx + dy * dy, node.point_idx);

        let diff = if node.split_dim == 0 { dx } else { dy };
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        // Search the closer side first
        if let Some(child) = first {
            self.search(child, query);
        }

        // Equal distances may hide lower-index ties on the far side
        if diff * diff <= query.threshold() {
            if let Some(child) = second {
                self.search(child, query);
            }
        }
    }
}

struct Query {
    qx: f64,
    qy: f64,
    k: usize,
    radius_sq: f64,
    /// At most `k` candidates; the top is the worst kept
    best: BinaryHeap<Candidate>,
}

impl Query {
    fn offer(&mut self, dist_sq: f64, index: usize) {
        if dist_sq > self.radius_sq {
            return;
        }

        let candidate = Candidate { dist_sq, index };
        if self.best.len() < self.k {
            self.best.push(candidate);
        } else if let Some(mut worst) = self.best.peek_mut() {
            if candidate < *worst {
                *worst = candidate;
            }
        }
    }

    /// Squared distance beyond which no subtree can contribute
    fn threshold(&self) -> f64 {
        match self.best.peek() {
            Some(worst) if self.best.len() >= self.k => worst.dist_sq.min(self.radius_sq),
            _ => self.radius_sq,
        }
    }
}

/// Recursively build the k-d tree, returning the subtree's root node index.
fn build_recursive(
    points: &[SamplePoint],
    indices: &mut [usize],
    depth: usize,
    nodes: &mut Vec<KdNode>,
) -> usize {
    let split_dim = (depth % 2) as u8;
    let coord = |i: usize| if split_dim == 0 { points[i].x } else { points[i].y };

    let median = indices.len() / 2;
    indices.select_nth_unstable_by(median, |&a, &b| {
        coord(a).partial_cmp(&coord(b)).unwrap_or(Ordering::Equal)
    });

    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        split_dim,
        left: None,
        right: None,
    });

    let (left, rest) = indices.split_at_mut(median);
    let right = &mut rest[1..];

    if !left.is_empty() {
        let child = build_recursive(points, left, depth + 1, nodes);
        nodes[node_idx].left = Some(child);
    }
    if !right.is_empty() {
        let child = build_recursive(points, right, depth + 1, nodes);
        nodes[node_idx].right = Some(child);
    }

    node_idx
}
