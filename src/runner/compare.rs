use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use super::process::{run_with_timeout, OutputCapture};

/// Score reported when the comparison cannot produce one.
pub const FAILED_SCORE: f64 = 1e10;

const SCORE_PREFIX: &str = "SCORE:";

/// Extracts the first `SCORE:<number>` value that ends a line of `output`.
#[must_use]
pub fn parse_score(output: &str) -> Option<f64> {
    output.lines().find_map(|line| {
        let pos = line.rfind(SCORE_PREFIX)?;
        let tail = &line[pos + SCORE_PREFIX.len()..];
        if is_unsigned_decimal(tail) {
            tail.parse().ok()
        } else {
            None
        }
    })
}

/// Matches `digits` or `digits.digits`.
fn is_unsigned_decimal(s: &str) -> bool {
    let all_digits = |t: &str| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit());
    match s.split_once('.') {
        Some((int, frac)) => all_digits(int) && all_digits(frac),
        None => all_digits(s),
    }
}

/// Compares a skeleton JSON against a reference centerline VTK with the
/// external point-cloud comparison tool.
///
/// The score is read from the tool's stdout only. Any failure to run the
/// tool or to find a score yields [`FAILED_SCORE`].
#[must_use]
pub fn compare_point_clouds(exe: &Path, json: &Path, vtk: &Path, timeout: Duration) -> f64 {
    let outcome = match run_with_timeout(exe, &[json, vtk], timeout, OutputCapture::Separate) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "point-cloud comparison could not be started");
            return FAILED_SCORE;
        }
    };
    if !outcome.success {
        warn!(
            output = %outcome.output,
            stderr = %outcome.stderr,
            "point-cloud comparison failed"
        );
        return FAILED_SCORE;
    }
    match parse_score(&outcome.output) {
        Some(score) => {
            info!(score, "point-cloud comparison finished");
            score
        }
        None => {
            warn!("no line with 'SCORE:' found in comparison output");
            FAILED_SCORE
        }
    }
}
