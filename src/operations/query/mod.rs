mod branch_analysis;
mod skeleton_metrics;

pub use branch_analysis::{BranchAnalysis, BranchKind, BranchSummary};
pub use skeleton_metrics::{ComputeMetrics, MetricsResult};
