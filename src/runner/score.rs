use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::operations::query::MetricsResult;

use super::compare::FAILED_SCORE;

/// Outcome of one case within a trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CaseMetrics {
    pub passed: bool,
    pub bifurcations: usize,
    pub terminals: usize,
    pub average_degree: f64,
    pub skeleton_length: f64,
    /// Wall-clock seconds spent in the skeletonization tool.
    pub total_time: f64,
}

impl CaseMetrics {
    /// A case that produced no usable skeleton.
    #[must_use]
    pub fn failed() -> Self {
        Self {
            passed: false,
            bifurcations: 0,
            terminals: 0,
            average_degree: 0.0,
            skeleton_length: 0.0,
            total_time: 0.0,
        }
    }

    #[must_use]
    pub fn passed(metrics: &MetricsResult, total_time: f64) -> Self {
        Self {
            passed: true,
            bifurcations: metrics.bifurcation_count,
            terminals: metrics.terminal_count,
            average_degree: metrics.average_degree,
            skeleton_length: metrics.skeleton_length,
            total_time,
        }
    }
}

/// Trial-level summary averaged over the cases that passed.
///
/// Serializes to the objective record handed to the search controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrialScore {
    /// Objective value: average bifurcation count, or [`FAILED_SCORE`] if
    /// no case passed.
    pub default: f64,
    pub avg_bifurcations: f64,
    #[serde(rename = "avg_termina")]
    pub avg_terminals: f64,
    pub avg_degree: f64,
    #[serde(rename = "avg_sk_len")]
    pub avg_skeleton_length: f64,
    #[serde(skip)]
    pub passed_cases: usize,
}

impl TrialScore {
    /// Averages the passed cases of a trial.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_cases<'a, I>(cases: I) -> Self
    where
        I: IntoIterator<Item = &'a CaseMetrics>,
    {
        let mut passed = 0_usize;
        let (mut bif, mut term, mut degree, mut length) = (0.0, 0.0, 0.0, 0.0);
        for case in cases.into_iter().filter(|c| c.passed) {
            passed += 1;
            bif += case.bifurcations as f64;
            term += case.terminals as f64;
            degree += case.average_degree;
            length += case.skeleton_length;
        }

        if passed == 0 {
            return Self {
                default: FAILED_SCORE,
                avg_bifurcations: 0.0,
                avg_terminals: 0.0,
                avg_degree: 0.0,
                avg_skeleton_length: 0.0,
                passed_cases: 0,
            };
        }

        let n = passed as f64;
        Self {
            default: bif / n,
            avg_bifurcations: bif / n,
            avg_terminals: term / n,
            avg_degree: degree / n,
            avg_skeleton_length: length / n,
            passed_cases: passed,
        }
    }

    /// Writes the objective record as JSON to `path` and returns the JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_final_result(&self, path: &Path) -> Result<String> {
        let json = serde_json::to_string(self)?;
        fs::write(path, &json)?;
        Ok(json)
    }
}
