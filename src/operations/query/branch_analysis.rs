use std::collections::{BTreeMap, HashMap};

use crate::error::MetricsError;
use crate::geometry::IndexPolyline;
use crate::topology::{PolylineId, SkeletonGraph};

/// How a polyline sits in the skeleton, judged by its two endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    /// Neither endpoint is shared with another polyline.
    Isolated,
    /// Exactly one endpoint is a bifurcation.
    Terminal,
    /// Both endpoints are bifurcations.
    Interior,
}

/// Result of classifying every polyline of a skeleton.
#[derive(Debug, Clone, Default)]
pub struct BranchSummary {
    /// Degree of each bifurcation, keyed by point index.
    pub degrees: BTreeMap<usize, usize>,
    /// Number of polylines with exactly one bifurcating endpoint.
    pub terminal_count: usize,
    /// Polylines whose endpoints are both bifurcations.
    pub interior: Vec<PolylineId>,
}

impl BranchSummary {
    #[must_use]
    pub fn bifurcation_count(&self) -> usize {
        self.degrees.len()
    }

    /// Mean degree over all bifurcations.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::UndefinedDegree`] if there are no bifurcations.
    pub fn average_degree(&self) -> Result<f64, MetricsError> {
        if self.degrees.is_empty() {
            return Err(MetricsError::UndefinedDegree);
        }
        let sum: usize = self.degrees.values().sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = sum as f64 / self.degrees.len() as f64;
        Ok(mean)
    }
}

/// Finds bifurcations, terminal branches, and interior branches of a skeleton.
///
/// An endpoint is a bifurcation when it is also the start or end index of
/// another polyline. Polylines with an identical index sequence count as
/// the same polyline and never make each other's endpoints bifurcations.
///
/// The degree of a bifurcation is the number of polylines containing its
/// index anywhere in their sequence, not only at an endpoint.
#[derive(Debug, Default)]
pub struct BranchAnalysis;

impl BranchAnalysis {
    /// Creates a new `BranchAnalysis` query.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the query over `graph`.
    #[must_use]
    pub fn execute(&self, graph: &SkeletonGraph) -> BranchSummary {
        let owners = endpoint_owners(graph);
        let shared = |current: &IndexPolyline, endpoint: usize| {
            owners.get(&endpoint).is_some_and(|ids| {
                ids.iter()
                    .filter_map(|&id| graph.polyline(id).ok())
                    .any(|other| other != current)
            })
        };

        let mut summary = BranchSummary::default();
        for (id, polyline) in graph.polylines() {
            let [start, end] = polyline.endpoints();
            let start_shared = shared(polyline, start);
            let end_shared = shared(polyline, end);

            if start_shared {
                summary.degrees.insert(start, 0);
            }
            if end_shared {
                summary.degrees.insert(end, 0);
            }

            let kind = match (start_shared, end_shared) {
                (true, true) => BranchKind::Interior,
                (false, false) => BranchKind::Isolated,
                _ => BranchKind::Terminal,
            };
            match kind {
                BranchKind::Interior => summary.interior.push(id),
                BranchKind::Terminal => summary.terminal_count += 1,
                BranchKind::Isolated => {}
            }
        }

        for (&point, degree) in &mut summary.degrees {
            *degree = graph
                .polylines()
                .filter(|(_, polyline)| polyline.contains(point))
                .count();
        }

        summary
    }
}

/// Maps each endpoint index to the polylines that start or end there.
fn endpoint_owners(graph: &SkeletonGraph) -> HashMap<usize, Vec<PolylineId>> {
    let mut owners: HashMap<usize, Vec<PolylineId>> =
        HashMap::with_capacity(2 * graph.polyline_count());
    for (id, polyline) in graph.polylines() {
        let [start, end] = polyline.endpoints();
        owners.entry(start).or_default().push(id);
        if !polyline.is_closed() {
            owners.entry(end).or_default().push(id);
        }
    }
    owners
}
