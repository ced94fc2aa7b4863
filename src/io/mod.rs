pub mod skeleton_json;
pub mod vtk;

pub use skeleton_json::SkeletonData;
pub use vtk::{write_unstructured_grid, write_vessel_and_centerline, write_vtk_file, CellMesh};
