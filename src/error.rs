use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the skeleton trial runner.
#[derive(Debug, Error)]
pub enum SkeltuneError {
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors raised while decoding a skeleton or computing its metrics.
#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    #[error("malformed skeleton data: {0}")]
    MalformedSkeletonData(String),

    #[error("average degree is undefined for a skeleton without bifurcations")]
    UndefinedDegree,
}

/// Errors related to loading runner configuration and trial parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid trial parameters: {0}")]
    Parameters(String),

    #[error("no {0} executable given on the command line or in the configuration")]
    MissingExecutable(&'static str),
}

/// Errors related to invoking external executables.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to launch {exe}: {source}")]
    Spawn {
        exe: PathBuf,
        source: std::io::Error,
    },

    #[error("input directory not found: {0}")]
    MissingInputDir(PathBuf),
}

/// Errors related to writing VTK output.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported VTK cell with {0} vertices")]
    UnsupportedCell(usize),
}

/// Convenience type alias for results using [`SkeltuneError`].
pub type Result<T> = std::result::Result<T, SkeltuneError>;
