//! Point search engine shared by the interpolators
//!
//! Wraps a [`KdTree`] built over the valid samples of one attribute field
//! and answers "up to N nearest points within radius R" queries in terms of
//! the collection's own record indices.

use serde::{Deserialize, Serialize};
use gridkit_core::{Error, PointCollection, Result, SamplePoint};

use super::kdtree::KdTree;

/// Whether an interpolator restricts itself to nearby points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Query a spatial index per location
    #[default]
    Local,
    /// Use every point for every location
    Global,
}

/// Neighbourhood selection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub mode: SearchMode,
    /// Minimum number of points required for an estimate (local mode)
    pub min_points: usize,
    /// Maximum number of nearest points to use (local mode); `0` means no limit
    pub max_points: usize,
    /// Search radius; `0` means unbounded
    pub radius: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            mode: SearchMode::Local,
            min_points: 1,
            max_points: 20,
            radius: 0.0,
        }
    }
}

impl SearchParams {
    /// Global search over all points
    pub fn global() -> Self {
        Self {
            mode: SearchMode::Global,
            ..Default::default()
        }
    }

    /// Local search for up to `max_points` within `radius`
    pub fn local(max_points: usize, radius: f64) -> Self {
        Self {
            mode: SearchMode::Local,
            max_points,
            radius,
            ..Default::default()
        }
    }

    pub fn is_local(&self) -> bool {
        self.mode == SearchMode::Local
    }

    pub fn validate(&self) -> Result<()> {
        if !self.is_local() {
            return Ok(());
        }
        if self.min_points == 0 {
            return Err(Error::invalid("min_points", self.min_points, "must be > 0"));
        }
        if self.max_points > 0 && self.min_points > self.max_points {
            return Err(Error::invalid(
                "min_points",
                self.min_points,
                format!("exceeds max_points ({})", self.max_points),
            ));
        }
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(Error::invalid("radius", self.radius, "must be finite and >= 0"));
        }
        Ok(())
    }
}

/// A point found by a search, with its distance to the query location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Record index in the source collection
    pub index: usize,
    pub distance: f64,
    pub point: SamplePoint,
}

/// Spatial index over the valid samples of one attribute field.
///
/// Read-only after [`create`](Self::create); shareable across threads.
#[derive(Debug, Default)]
pub struct SearchIndex {
    tree: Option<KdTree>,
    /// Record index of each tree slot
    records: Vec<usize>,
}

impl SearchIndex {
    /// Build the index from all records whose `field` value is not no-data.
    pub fn create(points: &PointCollection, field: usize) -> Result<Self> {
        points.check_field(field)?;

        let (records, samples): (Vec<usize>, Vec<SamplePoint>) = points.samples(field).unzip();
        if samples.is_empty() {
            return Err(Error::IndexBuild(format!(
                "no valid values in field {} of {} points",
                field,
                points.len()
            )));
        }

        let tree = KdTree::build(&samples);
        tracing::debug!("search index built over {} of {} points", tree.len(), points.len());

        Ok(Self {
            tree: Some(tree),
            records,
        })
    }

    /// Whether the index holds a built tree
    pub fn is_okay(&self) -> bool {
        self.tree.is_some()
    }

    /// Release the tree. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        self.tree = None;
        self.records = Vec::new();
    }

    /// Number of indexed points
    pub fn len(&self) -> usize {
        self.tree.as_ref().map_or(0, KdTree::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nearest points to (x, y), ascending by distance.
    ///
    /// At most `max_points` (`0` = no limit) points at distance ≤ `radius`
    /// (`radius <= 0` = no limit) are written to `indices`/`distances`,
    /// which are cleared first. Returns the count found.
    pub fn get_nearest_points(
        &self,
        x: f64,
        y: f64,
        max_points: usize,
        radius: f64,
        indices: &mut Vec<usize>,
        distances: &mut Vec<f64>,
    ) -> usize {
        indices.clear();
        distances.clear();

        for n in self.query(x, y, max_points, radius) {
            indices.push(n.index);
            distances.push(n.distance);
        }
        indices.len()
    }

    /// Same selection as [`get_nearest_points`](Self::get_nearest_points),
    /// returned with the sample points themselves.
    pub fn neighbors(&self, x: f64, y: f64, max_points: usize, radius: f64) -> Vec<Neighbor> {
        self.query(x, y, max_points, radius).collect()
    }

    /// Single nearest point, if any
    pub fn get_nearest_point(&self, x: f64, y: f64) -> Option<Neighbor> {
        self.query(x, y, 1, 0.0).next()
    }

    /// Number of points located exactly at (x, y)
    pub fn get_duplicates(&self, x: f64, y: f64) -> usize {
        let Some(tree) = &self.tree else {
            return 0;
        };
        tree.nearest_within(x, y, 0, Some(0.0)).len()
    }

    /// Value of the indexed point with record index `index`
    pub fn point_value(&self, index: usize) -> Option<f64> {
        self.point(index).map(|p| p.value)
    }

    /// Indexed point with record index `index`
    pub fn point(&self, index: usize) -> Option<SamplePoint> {
        let slot = self.records.binary_search(&index).ok()?;
        self.tree.as_ref()?.point(slot).copied()
    }

    fn query(
        &self,
        x: f64,
        y: f64,
        max_points: usize,
        radius: f64,
    ) -> impl Iterator<Item = Neighbor> + '_ {
        let radius_sq = (radius > 0.0).then_some(radius * radius);
        let found = match &self.tree {
            Some(tree) => tree.nearest_within(x, y, max_points, radius_sq),
            None => Vec::new(),
        };

        found.into_iter().map(move |r| Neighbor {
            index: self.records[r.index],
            distance: r.distance_sq.sqrt(),
            point: r.point,
        })
    }
}
