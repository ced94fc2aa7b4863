pub mod compare;
pub mod launch;
pub mod process;
pub mod score;
pub mod trial;

pub use compare::{compare_point_clouds, parse_score, FAILED_SCORE};
pub use launch::{LaunchParameters, DEFAULT_LAUNCH_PARAMETERS};
pub use process::{run_with_timeout, OutputCapture, RunOutcome};
pub use score::{CaseMetrics, TrialScore};
pub use trial::{ExternalSkeletonizer, Skeletonizer, TrialDirs, TrialOutcome, TrialRunner};
