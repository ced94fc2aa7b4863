use serde::Serialize;

use crate::error::MetricsError;
use crate::topology::SkeletonGraph;

use super::branch_analysis::{BranchAnalysis, BranchSummary};

/// Topology metrics of one skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsResult {
    pub bifurcation_count: usize,
    pub terminal_count: usize,
    pub average_degree: f64,
    pub skeleton_length: f64,
}

impl MetricsResult {
    /// Builds the metrics from a branch summary.
    ///
    /// `fallback_degree` replaces the average degree when the skeleton has
    /// no bifurcations; `None` turns that case into an error.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::UndefinedDegree`] if there are no bifurcations
    /// and no fallback is given, or [`MetricsError::MalformedSkeletonData`]
    /// if an interior polyline cannot be resolved.
    pub fn from_summary(
        graph: &SkeletonGraph,
        summary: &BranchSummary,
        fallback_degree: Option<f64>,
    ) -> Result<Self, MetricsError> {
        let average_degree = match (summary.average_degree(), fallback_degree) {
            (Ok(degree), _) => degree,
            (Err(MetricsError::UndefinedDegree), Some(fallback)) => fallback,
            (Err(e), _) => return Err(e),
        };

        let mut skeleton_length = 0.0;
        for &id in &summary.interior {
            skeleton_length += graph.polyline_length(id)?;
        }

        Ok(Self {
            bifurcation_count: summary.bifurcation_count(),
            terminal_count: summary.terminal_count,
            average_degree,
            skeleton_length,
        })
    }
}

/// Computes bifurcation count, terminal count, average degree and skeleton
/// length of a skeleton graph.
///
/// Skeleton length only covers polylines whose endpoints are both
/// bifurcations; terminal spurs are excluded.
#[derive(Debug, Default)]
pub struct ComputeMetrics {
    fallback_degree: Option<f64>,
}

impl ComputeMetrics {
    /// Creates a new `ComputeMetrics` query that fails on skeletons
    /// without bifurcations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports `degree` as the average degree instead of failing when the
    /// skeleton has no bifurcations.
    #[must_use]
    pub fn with_fallback_degree(mut self, degree: f64) -> Self {
        self.fallback_degree = Some(degree);
        self
    }

    /// Executes the query.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::UndefinedDegree`] if the skeleton has no
    /// bifurcations and no fallback degree was configured.
    pub fn execute(&self, graph: &SkeletonGraph) -> Result<MetricsResult, MetricsError> {
        let summary = BranchAnalysis::new().execute(graph);
        MetricsResult::from_summary(graph, &summary, self.fallback_degree)
    }
}
