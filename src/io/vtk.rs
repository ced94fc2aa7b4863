use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{ExportError, Result};
use crate::math::Point3;

use super::skeleton_json::SkeletonData;

/// Points plus cells referencing them, ready for VTK export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellMesh {
    pub points: Vec<Point3>,
    pub cells: Vec<Vec<usize>>,
}

/// VTK cell type code for a cell with `n` vertices.
fn cell_type(n: usize) -> std::result::Result<u8, ExportError> {
    match n {
        2 => Ok(3),
        3 => Ok(5),
        4 => Ok(9),
        _ => Err(ExportError::UnsupportedCell(n)),
    }
}

/// Writes `mesh` as a legacy ASCII VTK unstructured grid.
///
/// Lines, triangles and quads are supported. Cell types are checked
/// before anything is written.
///
/// # Errors
///
/// Returns [`ExportError::UnsupportedCell`] for any other cell size, or an
/// I/O error from the writer.
pub fn write_unstructured_grid<W: Write>(mesh: &CellMesh, out: &mut W) -> Result<()> {
    let types = mesh
        .cells
        .iter()
        .map(|c| cell_type(c.len()))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    writeln!(out, "# vtk DataFile Version 3.0")?;
    writeln!(out, "Unstructured Grid Example")?;
    writeln!(out, "ASCII")?;
    writeln!(out, "DATASET UNSTRUCTURED_GRID")?;

    writeln!(out, "POINTS {} float", mesh.points.len())?;
    for p in &mesh.points {
        writeln!(out, "{} {} {}", p.x, p.y, p.z)?;
    }

    let index_count: usize = mesh.cells.iter().map(Vec::len).sum();
    writeln!(out, "CELLS {} {}", mesh.cells.len(), index_count + mesh.cells.len())?;
    for cell in &mesh.cells {
        write!(out, "{}", cell.len())?;
        for i in cell {
            write!(out, " {i}")?;
        }
        writeln!(out)?;
    }

    writeln!(out, "CELL_TYPES {}", mesh.cells.len())?;
    for t in types {
        writeln!(out, "{t}")?;
    }
    Ok(())
}

/// Writes `mesh` to a `.vtk` file at `path`.
///
/// # Errors
///
/// See [`write_unstructured_grid`].
pub fn write_vtk_file(mesh: &CellMesh, path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_unstructured_grid(mesh, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Writes `<case>_Vessel.vtk` and `<case>_Centerline.vtk` into `dir`.
///
/// Returns the vessel and centerline paths.
///
/// # Errors
///
/// Returns an error if the skeleton data is malformed or a file cannot be written.
pub fn write_vessel_and_centerline(
    data: &SkeletonData,
    case_name: &str,
    dir: &Path,
) -> Result<(PathBuf, PathBuf)> {
    let vessel_path = dir.join(format!("{case_name}_Vessel.vtk"));
    let centerline_path = dir.join(format!("{case_name}_Centerline.vtk"));

    write_vtk_file(&data.surface_mesh()?, &vessel_path)?;
    write_vtk_file(&data.centerline()?, &centerline_path)?;

    Ok((vessel_path, centerline_path))
}
