pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod math;
pub mod operations;
pub mod report;
pub mod runner;
pub mod topology;

pub use error::{MetricsError, Result, SkeltuneError};
