use slotmap::SlotMap;

use crate::error::MetricsError;
use crate::geometry::IndexPolyline;
use crate::math::Point3;

slotmap::new_key_type! {
    /// Unique identifier for a polyline in a [`SkeletonGraph`].
    pub struct PolylineId;
}

/// A decoded skeleton: the shared point array plus the polylines indexing it.
///
/// Every stored polyline is guaranteed to reference points inside the
/// array, so metric queries can resolve coordinates without re-checking.
#[derive(Debug, Default, Clone)]
pub struct SkeletonGraph {
    points: Vec<Point3>,
    polylines: SlotMap<PolylineId, IndexPolyline>,
}

impl SkeletonGraph {
    /// Creates a graph over `points` with no polylines.
    #[must_use]
    pub fn new(points: Vec<Point3>) -> Self {
        Self {
            points,
            polylines: SlotMap::with_key(),
        }
    }

    /// Builds a graph from points and raw index sequences.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::MalformedSkeletonData`] if a sequence is
    /// shorter than two indices or references a missing point.
    pub fn from_parts<I>(points: Vec<Point3>, polylines: I) -> Result<Self, MetricsError>
    where
        I: IntoIterator<Item = Vec<usize>>,
    {
        let mut graph = Self::new(points);
        for indices in polylines {
            graph.add_polyline(IndexPolyline::new(indices)?)?;
        }
        Ok(graph)
    }

    /// Inserts a polyline and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::MalformedSkeletonData`] if the polyline
    /// references a point outside the graph.
    pub fn add_polyline(&mut self, polyline: IndexPolyline) -> Result<PolylineId, MetricsError> {
        if let Some(&bad) = polyline.indices().iter().find(|&&i| i >= self.points.len()) {
            return Err(MetricsError::MalformedSkeletonData(format!(
                "polyline references point {bad}, but only {} points exist",
                self.points.len()
            )));
        }
        Ok(self.polylines.insert(polyline))
    }

    /// Returns the polyline with the given ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the polyline is not part of this graph.
    pub fn polyline(&self, id: PolylineId) -> Result<&IndexPolyline, MetricsError> {
        self.polylines
            .get(id)
            .ok_or_else(|| MetricsError::MalformedSkeletonData("unknown polyline".into()))
    }

    /// Iterates over all polylines in insertion order.
    pub fn polylines(&self) -> impl Iterator<Item = (PolylineId, &IndexPolyline)> {
        self.polylines.iter()
    }

    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[must_use]
    pub fn polyline_count(&self) -> usize {
        self.polylines.len()
    }

    /// Geometric length of a stored polyline.
    ///
    /// # Errors
    ///
    /// Returns an error if the polyline is not part of this graph.
    pub fn polyline_length(&self, id: PolylineId) -> Result<f64, MetricsError> {
        self.polyline(id)?.length(&self.points)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[allow(clippy::cast_precision_loss)]
    fn line_points(n: usize) -> Vec<Point3> {
        (0..n).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect()
    }

    #[test]
    fn from_parts_keeps_all_polylines() {
        let graph = SkeletonGraph::from_parts(line_points(4), vec![vec![0, 1], vec![1, 2, 3]])
            .unwrap();
        assert_eq!(graph.polyline_count(), 2);
        assert_eq!(graph.points().len(), 4);
    }

    #[test]
    fn rejects_out_of_range_index() {
        let err = SkeletonGraph::from_parts(line_points(2), vec![vec![0, 2]]).unwrap_err();
        assert!(matches!(err, MetricsError::MalformedSkeletonData(_)));
    }

    #[test]
    fn rejects_single_index_polyline() {
        let err = SkeletonGraph::from_parts(line_points(2), vec![vec![1]]).unwrap_err();
        assert!(matches!(err, MetricsError::MalformedSkeletonData(_)));
    }

    #[test]
    fn polyline_lookup_and_length() {
        let mut graph = SkeletonGraph::new(line_points(3));
        let id = graph
            .add_polyline(IndexPolyline::new(vec![0, 1, 2]).unwrap())
            .unwrap();
        assert_eq!(graph.polyline(id).unwrap().endpoints(), [0, 2]);
        assert!((graph.polyline_length(id).unwrap() - 2.0).abs() < 1e-12);
    }
}
