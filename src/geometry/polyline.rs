use crate::error::MetricsError;
use crate::math::{polyline_length, Point3};

/// A skeleton segment stored as indices into a shared point array.
///
/// The first and last index are the segment's endpoints. Endpoints are
/// compared by index value only; two indices that resolve to coincident
/// coordinates are still distinct endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPolyline {
    indices: Vec<usize>,
}

impl IndexPolyline {
    /// Creates a polyline from point indices.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::MalformedSkeletonData`] if fewer than two
    /// indices are given.
    pub fn new(indices: Vec<usize>) -> Result<Self, MetricsError> {
        if indices.len() < 2 {
            return Err(MetricsError::MalformedSkeletonData(format!(
                "polyline needs at least 2 point indices, got {}",
                indices.len()
            )));
        }
        Ok(Self { indices })
    }

    /// Index of the first point.
    #[must_use]
    pub fn start(&self) -> usize {
        self.indices[0]
    }

    /// Index of the last point.
    #[must_use]
    pub fn end(&self) -> usize {
        self.indices[self.indices.len() - 1]
    }

    /// Both endpoints as `[start, end]`.
    #[must_use]
    pub fn endpoints(&self) -> [usize; 2] {
        [self.start(), self.end()]
    }

    /// Returns `true` if `index` appears anywhere in the sequence.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Returns `true` if the first and last index are the same point.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.start() == self.end()
    }

    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Resolves the indices against `points`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::MalformedSkeletonData`] if an index is out of range.
    pub fn resolve(&self, points: &[Point3]) -> Result<Vec<Point3>, MetricsError> {
        self.indices
            .iter()
            .map(|&i| {
                points.get(i).copied().ok_or_else(|| {
                    MetricsError::MalformedSkeletonData(format!(
                        "point index {i} out of range for {} points",
                        points.len()
                    ))
                })
            })
            .collect()
    }

    /// Geometric length of the chain through the resolved points.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::MalformedSkeletonData`] if an index is out of range.
    pub fn length(&self, points: &[Point3]) -> Result<f64, MetricsError> {
        Ok(polyline_length(&self.resolve(points)?))
    }
}
