use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::config::{RunnerConfig, TrialParameters};
use crate::error::{Result, RunError};
use crate::io::{write_vessel_and_centerline, SkeletonData};
use crate::operations::query::{ComputeMetrics, MetricsResult};
use crate::report::ReportPaths;

use super::launch::LaunchParameters;
use super::process::{run_with_timeout, OutputCapture, RunOutcome};
use super::score::{CaseMetrics, TrialScore};

/// Average degree recorded for skeletons without bifurcations.
pub const NO_BIFURCATION_DEGREE: f64 = 0.0;

/// Runs the skeletonization tool on one launch file.
pub trait Skeletonizer {
    /// Runs the tool and reports how it went.
    ///
    /// # Errors
    ///
    /// Returns an error only if the tool could not be started at all.
    fn run(&self, launch_file: &Path) -> std::result::Result<RunOutcome, RunError>;
}

/// The external skeletonization executable.
#[derive(Debug, Clone)]
pub struct ExternalSkeletonizer {
    pub exe: PathBuf,
    pub timeout: Duration,
}

impl Skeletonizer for ExternalSkeletonizer {
    fn run(&self, launch_file: &Path) -> std::result::Result<RunOutcome, RunError> {
        run_with_timeout(&self.exe, &[launch_file], self.timeout, OutputCapture::Merged)
    }
}

/// Working directories of one trial.
#[derive(Debug, Clone)]
pub struct TrialDirs {
    pub experiment: PathBuf,
    pub trial: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    pub vtk: PathBuf,
}

impl TrialDirs {
    /// Creates `<root>/<experiment>/<trial_id>/{input,output,vtks}`.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn create(root: &Path, experiment: &str, trial_id: &str) -> std::io::Result<Self> {
        let experiment = root.join(experiment);
        let trial = experiment.join(trial_id);
        let dirs = Self {
            input: trial.join("input"),
            output: trial.join("output"),
            vtk: trial.join("vtks"),
            experiment,
            trial,
        };
        for dir in [&dirs.input, &dirs.output, &dirs.vtk] {
            fs::create_dir_all(dir)?;
        }
        Ok(dirs)
    }
}

/// Everything a finished trial produced.
#[derive(Debug, Clone)]
pub struct TrialOutcome {
    pub cases: Vec<(String, CaseMetrics)>,
    pub score: TrialScore,
    pub dirs: TrialDirs,
    pub final_result: String,
}

/// Runs every input case of one trial and scores the results.
pub struct TrialRunner<S> {
    config: RunnerConfig,
    launch: LaunchParameters,
    skeletonizer: S,
}

impl TrialRunner<ExternalSkeletonizer> {
    /// Creates a runner that calls the executable named in `config`.
    #[must_use]
    pub fn from_config(config: RunnerConfig) -> Self {
        let skeletonizer = ExternalSkeletonizer {
            exe: config.skeletonize_exe.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        };
        Self::new(config, skeletonizer)
    }
}

impl<S: Skeletonizer> TrialRunner<S> {
    #[must_use]
    pub fn new(config: RunnerConfig, skeletonizer: S) -> Self {
        let launch = LaunchParameters::with_overrides(&config.launch_overrides);
        Self {
            config,
            launch,
            skeletonizer,
        }
    }

    /// Runs one trial.
    ///
    /// Cases that fail to skeletonize or decode are recorded as failed and
    /// do not stop the trial.
    ///
    /// # Errors
    ///
    /// Returns an error if the input directory is missing or the trial
    /// directories and reports cannot be written.
    pub fn run(&self, trial_id: &str, params: &TrialParameters) -> Result<TrialOutcome> {
        let inputs = find_stl_files(&self.config.input_stl_dir)?;
        let dirs = TrialDirs::create(
            &self.config.output_dir,
            &self.config.experiment_name,
            trial_id,
        )?;
        if let Some(search_space) = &self.config.search_space {
            copy_search_space(search_space, &dirs.experiment)?;
        }
        let reports = ReportPaths::create(&dirs.experiment, &dirs.trial)?;
        let launch = self.launch.for_trial(params);

        info!(trial_id, cases = inputs.len(), ?params, "starting trial");

        let mut cases = Vec::with_capacity(inputs.len());
        for (i, input) in inputs.iter().enumerate() {
            let case_name = case_name(input);
            info!(case = %case_name, "case {}/{}", i + 1, inputs.len());

            let metrics = self.run_case(&case_name, input, &launch, &dirs)?;
            reports.append_case(&case_name, &metrics)?;
            cases.push((case_name, metrics));
        }

        let score = TrialScore::from_cases(cases.iter().map(|(_, m)| m));
        reports.append_trial(trial_id, params, &score)?;
        let final_result = score.write_final_result(&dirs.trial.join("final_result.json"))?;
        info!(
            trial_id,
            passed = score.passed_cases,
            total = cases.len(),
            default = score.default,
            "trial finished"
        );

        Ok(TrialOutcome {
            cases,
            score,
            dirs,
            final_result,
        })
    }

    fn run_case(
        &self,
        case_name: &str,
        input: &Path,
        launch: &LaunchParameters,
        dirs: &TrialDirs,
    ) -> Result<CaseMetrics> {
        let launch_file = dirs.input.join(format!("{case_name}.txt"));
        let case_dir = dirs.output.join(case_name);
        fs::create_dir_all(&case_dir)?;
        launch.write(&launch_file, case_name, input, &case_dir.join(case_name))?;

        let outcome = match self.skeletonizer.run(&launch_file) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(case = %case_name, error = %e, "skeletonization could not be started");
                write_case_log(&case_dir, case_name, &e.to_string())?;
                return Ok(CaseMetrics::failed());
            }
        };

        let json = format!("{case_name}_SkeletonData.json");
        let json_path = if outcome.success {
            find_file(&case_dir, &json)
        } else {
            None
        };
        let Some(json_path) = json_path else {
            warn!(case = %case_name, timed_out = outcome.timed_out, "skeletonization failed");
            write_case_log(&case_dir, case_name, &outcome.output)?;
            return Ok(CaseMetrics::failed());
        };

        match evaluate_case(&json_path, case_name, &dirs.vtk) {
            Ok(metrics) => Ok(CaseMetrics::passed(&metrics, outcome.elapsed.as_secs_f64())),
            Err(e) => {
                warn!(case = %case_name, error = %e, "skeleton data rejected");
                write_case_log(&case_dir, case_name, &outcome.output)?;
                Ok(CaseMetrics::failed())
            }
        }
    }
}

/// Decodes the skeleton, computes its metrics and exports the VTK files.
fn evaluate_case(
    json_path: &Path,
    case_name: &str,
    vtk_dir: &Path,
) -> Result<MetricsResult> {
    let data = SkeletonData::load(json_path)?;
    let graph = data.to_graph()?;
    let metrics = ComputeMetrics::new()
        .with_fallback_degree(NO_BIFURCATION_DEGREE)
        .execute(&graph)?;

    if let Err(e) = write_vessel_and_centerline(&data, case_name, vtk_dir) {
        warn!(case = %case_name, error = %e, "vtk export failed");
    }
    Ok(metrics)
}

fn write_case_log(case_dir: &Path, case_name: &str, output: &str) -> std::io::Result<()> {
    fs::write(case_dir.join(format!("{case_name}_stdout.txt")), output)
}

/// File stem of an input mesh.
fn case_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lists `*.stl` files (any letter case) in `dir`, sorted by path.
///
/// # Errors
///
/// Returns [`RunError::MissingInputDir`] if `dir` is not a directory.
pub fn find_stl_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(RunError::MissingInputDir(dir.to_path_buf()).into());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_stl = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("stl"));
        if is_stl && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Recursively searches `dir` for a file named `name`, ignoring letter case.
#[must_use]
pub fn find_file(dir: &Path, name: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if entry
            .file_name()
            .to_string_lossy()
            .eq_ignore_ascii_case(name)
        {
            return Some(path);
        }
    }
    subdirs.sort();
    subdirs.iter().find_map(|sub| find_file(sub, name))
}

/// Copies the search space definition into the experiment directory once.
fn copy_search_space(search_space: &Path, experiment_dir: &Path) -> std::io::Result<()> {
    let dest = experiment_dir.join("search_space.json");
    if !dest.is_file() {
        fs::copy(search_space, dest)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::SkeltuneError;

    const Y_JUNCTION: &str = r#"{
        "SkPoints": [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1],
        "Polylines": [[0, 1], [0, 2], [0, 3]],
        "SkEdges": [0, 1, 0, 2, 0, 3],
        "SurfaceMeshVertices": [0, 0, 0, 1, 0, 0, 0, 1, 0],
        "SurfaceMeshFaces": [0, 1, 2]
    }"#;

    /// Writes a fixed skeleton next to the launch file's `OutputName`,
    /// unless the case name is listed as failing.
    struct FakeSkeletonizer {
        failing: Vec<&'static str>,
        json: &'static str,
    }

    impl FakeSkeletonizer {
        fn new(json: &'static str) -> Self {
            Self {
                failing: Vec::new(),
                json,
            }
        }
    }

    impl Skeletonizer for FakeSkeletonizer {
        fn run(&self, launch_file: &Path) -> std::result::Result<RunOutcome, RunError> {
            let text = fs::read_to_string(launch_file).unwrap();
            let output_name = text
                .lines()
                .find_map(|l| l.strip_prefix("OutputName = "))
                .unwrap();
            let case = case_name(launch_file);
            let success = !self.failing.iter().any(|f| *f == case);
            if success {
                fs::write(format!("{output_name}_SkeletonData.json"), self.json).unwrap();
            }
            Ok(RunOutcome {
                success,
                timed_out: false,
                elapsed: Duration::from_millis(1500),
                output: format!("processed {case}\n"),
                stderr: String::new(),
            })
        }
    }

    fn setup(cases: &[&str]) -> (tempfile::TempDir, RunnerConfig) {
        let root = tempfile::tempdir().unwrap();
        let stl_dir = root.path().join("stls");
        fs::create_dir_all(&stl_dir).unwrap();
        for case in cases {
            fs::write(stl_dir.join(format!("{case}.stl")), "solid x\nendsolid x\n").unwrap();
        }
        fs::write(stl_dir.join("notes.txt"), "ignored").unwrap();
        let config = RunnerConfig {
            output_dir: root.path().join("runs"),
            input_stl_dir: stl_dir,
            experiment_name: "exp".to_string(),
            ..RunnerConfig::default()
        };
        (root, config)
    }

    fn params() -> TrialParameters {
        TrialParameters {
            quality_speed_tradeoff: 0.3,
            medial_speed_tradeoff: 1.2,
            min_edge_length: 0.05,
        }
    }

    #[test]
    fn runs_all_cases_and_scores_passed_ones() {
        let (_root, config) = setup(&["b_case", "a_case", "c_case"]);
        let mut fake = FakeSkeletonizer::new(Y_JUNCTION);
        fake.failing.push("b_case");
        let runner = TrialRunner::new(config, fake);

        let outcome = runner.run("trial1", &params()).unwrap();
        let names: Vec<&str> = outcome.cases.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a_case", "b_case", "c_case"]);

        let (_, a) = &outcome.cases[0];
        assert!(a.passed);
        assert_eq!(a.bifurcations, 1);
        assert_eq!(a.terminals, 3);
        assert!((a.total_time - 1.5).abs() < 1e-9);
        assert!(!outcome.cases[1].1.passed);

        assert_eq!(outcome.score.passed_cases, 2);
        assert!((outcome.score.default - 1.0).abs() < 1e-12);

        let dirs = &outcome.dirs;
        assert!(dirs.vtk.join("a_case_Vessel.vtk").is_file());
        assert!(dirs.vtk.join("c_case_Centerline.vtk").is_file());
        assert!(dirs.output.join("b_case").join("b_case_stdout.txt").is_file());
        assert!(dirs.trial.join("final_result.json").is_file());

        let launch = fs::read_to_string(dirs.input.join("a_case.txt")).unwrap();
        assert!(launch.contains("QualitySpeedTradeoff = 0.3\n"));
        assert!(launch.contains("MinEdgeLength = 0.05\n"));

        let trial_report = fs::read_to_string(dirs.trial.join("Trial_Report.csv")).unwrap();
        assert_eq!(trial_report.lines().count(), 4);
        let main_report = fs::read_to_string(dirs.experiment.join("Main_Report.csv")).unwrap();
        assert!(main_report.lines().nth(1).unwrap().starts_with("trial1,0.3,1.2,0.05,2,"));
    }

    #[test]
    fn malformed_skeleton_fails_only_that_case() {
        let (_root, config) = setup(&["only"]);
        let runner = TrialRunner::new(config, FakeSkeletonizer::new(r#"{"SkPoints": [0, 0]}"#));
        let outcome = runner.run("t", &params()).unwrap();
        assert!(!outcome.cases[0].1.passed);
        assert_eq!(outcome.score.passed_cases, 0);
        assert!(outcome
            .dirs
            .output
            .join("only")
            .join("only_stdout.txt")
            .is_file());
    }

    #[test]
    fn skeleton_without_bifurcations_uses_fallback_degree() {
        let (_root, config) = setup(&["line"]);
        let json = r#"{"SkPoints": [0, 0, 0, 2, 0, 0], "Polylines": [[0, 1]]}"#;
        let runner = TrialRunner::new(config, FakeSkeletonizer::new(json));
        let outcome = runner.run("t", &params()).unwrap();
        let (_, case) = &outcome.cases[0];
        assert!(case.passed);
        assert_eq!(case.bifurcations, 0);
        assert!((case.average_degree - NO_BIFURCATION_DEGREE).abs() < f64::EPSILON);
    }

    #[test]
    fn search_space_is_copied_once() {
        let (root, mut config) = setup(&[]);
        let space = root.path().join("space.json");
        fs::write(&space, r#"{"MinEdgeLength": {"_type": "uniform"}}"#).unwrap();
        config.search_space = Some(space.clone());
        let runner = TrialRunner::new(config, FakeSkeletonizer::new(Y_JUNCTION));

        let outcome = runner.run("t1", &params()).unwrap();
        let copied = outcome.dirs.experiment.join("search_space.json");
        assert!(copied.is_file());

        fs::write(&space, "{}").unwrap();
        runner.run("t2", &params()).unwrap();
        assert_ne!(fs::read_to_string(copied).unwrap(), "{}");
    }

    #[test]
    fn missing_input_dir_is_an_error() {
        let config = RunnerConfig {
            input_stl_dir: PathBuf::from("/nonexistent/stls"),
            ..RunnerConfig::default()
        };
        let runner = TrialRunner::new(config, FakeSkeletonizer::new(Y_JUNCTION));
        let err = runner.run("t", &params()).unwrap_err();
        assert!(matches!(
            err,
            SkeltuneError::Run(RunError::MissingInputDir(_))
        ));
    }

    #[test]
    fn find_file_searches_subdirectories_ignoring_case() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deep").join("er");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("Case_SkeletonData.JSON"), "{}").unwrap();

        let found = find_file(dir.path(), "case_skeletondata.json").unwrap();
        assert_eq!(found, nested.join("Case_SkeletonData.JSON"));
        assert!(find_file(dir.path(), "other.json").is_none());
    }
}
