pub mod distance_3d;

pub use distance_3d::{euclidean_distance, polyline_length};

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;
