pub mod polyline;

pub use polyline::IndexPolyline;
