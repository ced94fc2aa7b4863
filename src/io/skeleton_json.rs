use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{MetricsError, Result};
use crate::math::Point3;
use crate::topology::SkeletonGraph;

use super::vtk::CellMesh;

/// Raw contents of a `<case>_SkeletonData.json` file written by the
/// skeletonization tool.
///
/// Coordinates and connectivity are stored flat; use the accessors to get
/// typed, validated views.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SkeletonData {
    #[serde(rename = "SkPoints")]
    pub sk_points: Vec<f64>,
    #[serde(rename = "Polylines")]
    pub polylines: Vec<Vec<usize>>,
    #[serde(rename = "SurfaceMeshVertices", default)]
    pub surface_vertices: Vec<f64>,
    #[serde(rename = "SurfaceMeshFaces", default)]
    pub surface_faces: Vec<usize>,
    #[serde(rename = "SkEdges", default)]
    pub sk_edges: Vec<usize>,
}

impl SkeletonData {
    /// Decodes skeleton data from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::MalformedSkeletonData`] if the JSON is invalid
    /// or `SkPoints` / `Polylines` are missing or mistyped.
    pub fn from_json_str(json: &str) -> std::result::Result<Self, MetricsError> {
        serde_json::from_str(json).map_err(|e| MetricsError::MalformedSkeletonData(e.to_string()))
    }

    /// Reads and decodes a skeleton JSON file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or
    /// [`MetricsError::MalformedSkeletonData`] if it cannot be decoded.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(Self::from_json_str(&json)?)
    }

    /// Skeleton points, three coordinates each.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::MalformedSkeletonData`] if `SkPoints` is not a
    /// multiple of three long.
    pub fn points(&self) -> std::result::Result<Vec<Point3>, MetricsError> {
        to_points(&self.sk_points, "SkPoints")
    }

    /// Builds the skeleton graph used for metric computation.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::MalformedSkeletonData`] if the points are
    /// malformed, a polyline has fewer than two indices, or an index is out
    /// of range.
    pub fn to_graph(&self) -> std::result::Result<SkeletonGraph, MetricsError> {
        SkeletonGraph::from_parts(self.points()?, self.polylines.iter().cloned())
    }

    /// Triangulated vessel surface.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::MalformedSkeletonData`] if the flat arrays have
    /// the wrong length or a face references a missing vertex.
    pub fn surface_mesh(&self) -> std::result::Result<CellMesh, MetricsError> {
        let points = to_points(&self.surface_vertices, "SurfaceMeshVertices")?;
        let cells = to_cells(&self.surface_faces, 3, "SurfaceMeshFaces", points.len())?;
        Ok(CellMesh { points, cells })
    }

    /// Skeleton centerline as two-point edges over `SkPoints`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::MalformedSkeletonData`] if the flat arrays have
    /// the wrong length or an edge references a missing point.
    pub fn centerline(&self) -> std::result::Result<CellMesh, MetricsError> {
        let points = self.points()?;
        let cells = to_cells(&self.sk_edges, 2, "SkEdges", points.len())?;
        Ok(CellMesh { points, cells })
    }
}

fn check_width(len: usize, width: usize, key: &str) -> std::result::Result<(), MetricsError> {
    if len % width == 0 {
        Ok(())
    } else {
        Err(MetricsError::MalformedSkeletonData(format!(
            "{key} has {len} values, expected a multiple of {width}"
        )))
    }
}

fn to_points(flat: &[f64], key: &str) -> std::result::Result<Vec<Point3>, MetricsError> {
    check_width(flat.len(), 3, key)?;
    Ok(flat
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect())
}

fn to_cells(
    flat: &[usize],
    width: usize,
    key: &str,
    point_count: usize,
) -> std::result::Result<Vec<Vec<usize>>, MetricsError> {
    check_width(flat.len(), width, key)?;
    if let Some(&bad) = flat.iter().find(|&&i| i >= point_count) {
        return Err(MetricsError::MalformedSkeletonData(format!(
            "{key} references point {bad}, but only {point_count} points exist"
        )));
    }
    Ok(flat.chunks_exact(width).map(<[usize]>::to_vec).collect())
}
