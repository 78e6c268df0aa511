//! Scattered sample points with attribute fields
//!
//! A [`PointCollection`] is the input side of every interpolation run: an
//! ordered set of (x, y) locations, each carrying one value per attribute
//! field. The field used for a run is chosen by index. Record indices are
//! stable, so a search index can refer back to records by position.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A sample point with x, y coordinates and a value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    /// Squared Euclidean distance to another location
    #[inline]
    pub fn dist_sq(&self, other_x: f64, other_y: f64) -> f64 {
        let dx = self.x - other_x;
        let dy = self.y - other_y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another location
    #[inline]
    pub fn dist(&self, other_x: f64, other_y: f64) -> f64 {
        self.dist_sq(other_x, other_y).sqrt()
    }

    /// Whether the point sits exactly on (x, y)
    #[inline]
    pub fn is_at(&self, x: f64, y: f64) -> bool {
        self.x == x && self.y == y
    }
}

/// One record of a [`PointCollection`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub x: f64,
    pub y: f64,
    pub attributes: Vec<f64>,
}

/// Ordered collection of point records sharing one attribute schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointCollection {
    fields: Vec<String>,
    records: Vec<PointRecord>,
    /// Sentinel marking a missing value; NaN is always treated as missing.
    nodata: Option<f64>,
}

impl PointCollection {
    /// Create an empty collection with the given attribute field names
    pub fn new<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            records: Vec::new(),
            nodata: None,
        }
    }

    /// Single-field collection built from sample points.
    ///
    /// Coordinates are not checked here; [`samples`](Self::samples) skips
    /// records that are not finite.
    pub fn from_samples(field: &str, samples: &[SamplePoint]) -> Self {
        let mut collection = Self::new([field]);
        collection.records = samples
            .iter()
            .map(|p| PointRecord {
                x: p.x,
                y: p.y,
                attributes: vec![p.value],
            })
            .collect();
        collection
    }

    /// Set the no-data sentinel
    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    /// Append a record; the attribute count must match the schema.
    pub fn push(&mut self, x: f64, y: f64, attributes: Vec<f64>) -> Result<usize> {
        if attributes.len() != self.fields.len() {
            return Err(Error::invalid(
                "attributes",
                attributes.len(),
                format!("collection has {} fields", self.fields.len()),
            ));
        }
        if !x.is_finite() || !y.is_finite() {
            return Err(Error::invalid(
                "coordinates",
                format!("({x}, {y})"),
                "must be finite",
            ));
        }
        self.records.push(PointRecord { x, y, attributes });
        Ok(self.records.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_name(&self, field: usize) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Index of the field with the given name
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    pub fn record(&self, index: usize) -> Option<&PointRecord> {
        self.records.get(index)
    }

    /// Fail unless `field` names an existing attribute column
    pub fn check_field(&self, field: usize) -> Result<()> {
        if field < self.fields.len() {
            Ok(())
        } else {
            Err(Error::invalid(
                "field",
                field,
                format!("collection has {} fields", self.fields.len()),
            ))
        }
    }

    /// Whether a raw attribute value counts as missing
    #[inline]
    pub fn is_nodata(&self, value: f64) -> bool {
        value.is_nan() || self.nodata == Some(value)
    }

    /// Value of `field` at record `index`, `None` if missing or out of range
    pub fn value(&self, index: usize, field: usize) -> Option<f64> {
        let value = *self.records.get(index)?.attributes.get(field)?;
        (!self.is_nodata(value)).then_some(value)
    }

    /// Valid samples of `field`, paired with their record index.
    ///
    /// Records with a missing value or non-finite coordinates are skipped.
    pub fn samples(&self, field: usize) -> impl Iterator<Item = (usize, SamplePoint)> + '_ {
        self.records.iter().enumerate().filter_map(move |(i, r)| {
            let value = *r.attributes.get(field)?;
            let valid = !self.is_nodata(value) && r.x.is_finite() && r.y.is_finite();
            valid.then(|| (i, SamplePoint::new(r.x, r.y, value)))
        })
    }

    /// Number of records with a valid value in `field`
    pub fn valid_count(&self, field: usize) -> usize {
        self.samples(field).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection() -> PointCollection {
        let mut pc = PointCollection::new(["elev", "temp"]).with_nodata(-9999.0);
        pc.push(0.0, 0.0, vec![10.0, 1.0]).unwrap();
        pc.push(1.0, 0.0, vec![-9999.0, 2.0]).unwrap();
        pc.push(0.0, 1.0, vec![30.0, f64::NAN]).unwrap();
        pc
    }

    #[test]
    fn test_nodata_excluded_from_samples() {
        let pc = collection();
        let elev: Vec<usize> = pc.samples(0).map(|(i, _)| i).collect();
        assert_eq!(elev, vec![0, 2]);

        let temp: Vec<usize> = pc.samples(1).map(|(i, _)| i).collect();
        assert_eq!(temp, vec![0, 1]);
    }

    #[test]
    fn test_value_lookup() {
        let pc = collection();
        assert_eq!(pc.value(0, 0), Some(10.0));
        assert_eq!(pc.value(1, 0), None);
        assert_eq!(pc.value(2, 1), None);
        assert_eq!(pc.value(7, 0), None);
        assert_eq!(pc.valid_count(0), 2);
    }

    #[test]
    fn test_push_rejects_schema_mismatch() {
        let mut pc = collection();
        assert!(pc.push(2.0, 2.0, vec![1.0]).is_err());
        assert!(pc.push(f64::INFINITY, 2.0, vec![1.0, 2.0]).is_err());
        assert_eq!(pc.len(), 3);
    }

    #[test]
    fn test_field_lookup() {
        let pc = collection();
        assert_eq!(pc.field_index("temp"), Some(1));
        assert_eq!(pc.field_name(0), Some("elev"));
        assert!(pc.check_field(1).is_ok());
        assert!(pc.check_field(2).is_err());
    }

    #[test]
    fn test_from_samples() {
        let pts = [SamplePoint::new(1.0, 2.0, 3.0), SamplePoint::new(4.0, 5.0, 6.0)];
        let pc = PointCollection::from_samples("z", &pts);
        assert_eq!(pc.field_count(), 1);
        let back: Vec<SamplePoint> = pc.samples(0).map(|(_, p)| p).collect();
        assert_eq!(back, pts);
    }

    #[test]
    fn test_samples_skip_non_finite_coordinates() {
        let pts = [
            SamplePoint::new(1.0, 2.0, 3.0),
            SamplePoint::new(f64::NAN, 1.0, 1000.0),
            SamplePoint::new(4.0, f64::INFINITY, 1000.0),
        ];
        let pc = PointCollection::from_samples("z", &pts);
        assert_eq!(pc.len(), 3);
        assert_eq!(pc.valid_count(0), 1);
        let indices: Vec<usize> = pc.samples(0).map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0]);
    }
}
