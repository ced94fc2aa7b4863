use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Seconds the skeletonization tool may run before it is killed.
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

const DEFAULT_EXPERIMENT_NAME: &str = "skeleton_search";

/// Settings shared by every trial of an experiment.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Root under which the experiment directory is created.
    pub output_dir: PathBuf,
    /// Directory scanned for `*.stl` cases.
    pub input_stl_dir: PathBuf,
    pub experiment_name: String,
    /// Search space definition copied next to the reports, if given.
    pub search_space: Option<PathBuf>,
    pub skeletonize_exe: PathBuf,
    /// Optional point-cloud comparison executable.
    pub compare_exe: Option<PathBuf>,
    pub timeout_secs: u64,
    /// Launch-file entries replacing the built-in defaults.
    pub launch_overrides: BTreeMap<String, String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            input_stl_dir: PathBuf::from("stls"),
            experiment_name: DEFAULT_EXPERIMENT_NAME.to_string(),
            search_space: None,
            skeletonize_exe: PathBuf::from("SK_Lite"),
            compare_exe: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            launch_overrides: BTreeMap::new(),
        }
    }
}

/// A loaded configuration together with where it came from and any fixes
/// applied while sanitizing it.
#[derive(Debug)]
pub struct RunnerConfigHandle {
    pub config: RunnerConfig,
    pub source: Option<PathBuf>,
    pub warnings: Vec<String>,
}

impl RunnerConfig {
    /// Loads a configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<RunnerConfigHandle, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        let (config, warnings) = config.sanitize();
        Ok(RunnerConfigHandle {
            config,
            source: Some(path.to_path_buf()),
            warnings,
        })
    }

    /// Loads `path` if given, otherwise falls back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is given and cannot be loaded.
    pub fn load_or_default(path: Option<&Path>) -> Result<RunnerConfigHandle, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(RunnerConfigHandle {
                config: Self::default(),
                source: None,
                warnings: Vec::new(),
            }),
        }
    }

    /// Picks the comparison executable, preferring `explicit` over the
    /// configured one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingExecutable`] if neither is set.
    pub fn resolve_compare_exe(&self, explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        explicit
            .or_else(|| self.compare_exe.clone())
            .ok_or(ConfigError::MissingExecutable("comparison"))
    }

    fn sanitize(mut self) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        if self.timeout_secs == 0 {
            warnings.push(format!(
                "timeout_secs must be positive, using {DEFAULT_TIMEOUT_SECS}"
            ));
            self.timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        if self.experiment_name.trim().is_empty() {
            warnings.push(format!(
                "experiment_name is empty, using '{DEFAULT_EXPERIMENT_NAME}'"
            ));
            self.experiment_name = DEFAULT_EXPERIMENT_NAME.to_string();
        }
        (self, warnings)
    }
}

/// Parameters proposed by the controller for one trial.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TrialParameters {
    #[serde(rename = "QualitySpeedTradeoff")]
    pub quality_speed_tradeoff: f64,
    #[serde(rename = "MedialSpeedTradeoff")]
    pub medial_speed_tradeoff: f64,
    #[serde(rename = "MinEdgeLength")]
    pub min_edge_length: f64,
}

impl TrialParameters {
    /// Parses parameters from inline JSON, or from a file when `arg`
    /// starts with `@`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parameters`] if the JSON is invalid or a key is
    /// missing, or [`ConfigError::Read`] if the file cannot be read.
    pub fn parse(arg: &str) -> Result<Self, ConfigError> {
        let json = match arg.strip_prefix('@') {
            Some(path) => fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: PathBuf::from(path),
                source,
            })?,
            None => arg.to_string(),
        };
        serde_json::from_str(&json).map_err(|e| ConfigError::Parameters(e.to_string()))
    }
}
