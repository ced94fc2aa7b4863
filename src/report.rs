use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::TrialParameters;
use crate::runner::{CaseMetrics, TrialScore};

pub const EXPERIMENT_REPORT_NAME: &str = "Main_Report.csv";
pub const TRIAL_REPORT_NAME: &str = "Trial_Report.csv";

const EXPERIMENT_HEADER: &str = "Trial_Id, QST, MST, MinEL, Cases_Ran, default, avg_bifurcations, avg_termina, avg_degree, avg_sk_len";
const TRIAL_HEADER: &str =
    "Case, passed, bifurcations, terminal_cnt, avg_degree, skeleton_length, Total_Time";

/// Locations of the experiment-wide and per-trial reports.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub experiment: PathBuf,
    pub trial: PathBuf,
}

impl ReportPaths {
    /// Creates the experiment report if missing and starts a fresh trial report.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be written.
    pub fn create(experiment_dir: &Path, trial_dir: &Path) -> std::io::Result<Self> {
        let experiment = experiment_dir.join(EXPERIMENT_REPORT_NAME);
        if !experiment.is_file() {
            fs::write(&experiment, format!("{EXPERIMENT_HEADER}\n"))?;
        }

        let trial = trial_dir.join(TRIAL_REPORT_NAME);
        fs::write(&trial, format!("{TRIAL_HEADER}\n"))?;

        Ok(Self { experiment, trial })
    }

    /// Appends one case row to the trial report.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be appended to.
    pub fn append_case(&self, case_name: &str, case: &CaseMetrics) -> std::io::Result<()> {
        append_line(&self.trial, &case_row(case_name, case))
    }

    /// Appends the trial summary row to the experiment report.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be appended to.
    pub fn append_trial(
        &self,
        trial_id: &str,
        params: &TrialParameters,
        score: &TrialScore,
    ) -> std::io::Result<()> {
        append_line(&self.experiment, &trial_row(trial_id, params, score))
    }
}

fn case_row(case_name: &str, case: &CaseMetrics) -> String {
    format!(
        "{case_name},{},{},{},{:?},{:?},{:?}",
        u8::from(case.passed),
        case.bifurcations,
        case.terminals,
        case.average_degree,
        case.skeleton_length,
        case.total_time,
    )
}

fn trial_row(trial_id: &str, params: &TrialParameters, score: &TrialScore) -> String {
    format!(
        "{trial_id},{:?},{:?},{:?},{},{:?},{:?},{:?},{:?},{:?}",
        params.quality_speed_tradeoff,
        params.medial_speed_tradeoff,
        params.min_edge_length,
        score.passed_cases,
        score.default,
        score.avg_bifurcations,
        score.avg_terminals,
        score.avg_degree,
        score.avg_skeleton_length,
    )
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    writeln!(file, "{line}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn params() -> TrialParameters {
        TrialParameters {
            quality_speed_tradeoff: 0.5,
            medial_speed_tradeoff: 1.5,
            min_edge_length: 0.065,
        }
    }

    #[test]
    fn case_rows_follow_header() {
        let dir = tempfile::tempdir().unwrap();
        let reports = ReportPaths::create(dir.path(), dir.path()).unwrap();
        let passed = CaseMetrics {
            passed: true,
            bifurcations: 12,
            terminals: 14,
            average_degree: 3.0,
            skeleton_length: 101.25,
            total_time: 42.5,
        };
        reports.append_case("aorta", &passed).unwrap();
        reports.append_case("iliac", &CaseMetrics::failed()).unwrap();

        let text = fs::read_to_string(&reports.trial).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], TRIAL_HEADER);
        assert_eq!(lines[1], "aorta,1,12,14,3.0,101.25,42.5");
        assert_eq!(lines[2], "iliac,0,0,0,0.0,0.0,0.0");
    }

    #[test]
    fn experiment_report_is_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let trial_a = dir.path().join("a");
        let trial_b = dir.path().join("b");
        fs::create_dir_all(&trial_a).unwrap();
        fs::create_dir_all(&trial_b).unwrap();

        let score = TrialScore::from_cases(&[CaseMetrics::failed()]);
        let first = ReportPaths::create(dir.path(), &trial_a).unwrap();
        first.append_trial("a", &params(), &score).unwrap();
        let second = ReportPaths::create(dir.path(), &trial_b).unwrap();
        second.append_trial("b", &params(), &score).unwrap();

        let text = fs::read_to_string(&second.experiment).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], EXPERIMENT_HEADER);
        assert_eq!(lines[1], "a,0.5,1.5,0.065,0,10000000000.0,0.0,0.0,0.0,0.0");
        assert!(lines[2].starts_with("b,"));
    }

    #[test]
    fn trial_report_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let reports = ReportPaths::create(dir.path(), dir.path()).unwrap();
        reports.append_case("x", &CaseMetrics::failed()).unwrap();
        let reports = ReportPaths::create(dir.path(), dir.path()).unwrap();
        let text = fs::read_to_string(reports.trial).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
