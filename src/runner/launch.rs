use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::config::TrialParameters;

/// Built-in skeletonization settings, in launch-file order.
pub const DEFAULT_LAUNCH_PARAMETERS: &[(&str, &str)] = &[
    ("MaxTriangleAngle", "110.0"),
    ("QualitySpeedTradeoff", "0.5"),
    ("MedialSpeedTradeoff", "1.5"),
    ("AreaVariationFactor", "0.0001"),
    ("MaxIterations", "600"),
    ("MinEdgeLength", "0.065"),
    ("RunMetrics", "0"),
    ("DebugPopups", "0"),
    ("UseInletPopup", "0"),
    ("UseNeckPlane", "0"),
];

/// Placeholder replaced by the case name in parameter values.
const NAME_PLACEHOLDER: &str = "*NAME*";

/// Ordered `key = value` entries of a skeletonization launch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchParameters {
    entries: Vec<(String, String)>,
}

impl Default for LaunchParameters {
    fn default() -> Self {
        Self {
            entries: DEFAULT_LAUNCH_PARAMETERS
                .iter()
                .map(|&(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl LaunchParameters {
    /// Built-in defaults with `overrides` applied on top.
    #[must_use]
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut params = Self::default();
        for (key, value) in overrides {
            params.set(key, value.clone());
        }
        params
    }

    /// Sets `key`, keeping its position if it already exists.
    pub fn set(&mut self, key: &str, value: String) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns a copy with the searched parameters of one trial applied.
    #[must_use]
    pub fn for_trial(&self, trial: &TrialParameters) -> Self {
        let mut params = self.clone();
        params.set("QualitySpeedTradeoff", format!("{:?}", trial.quality_speed_tradeoff));
        params.set("MedialSpeedTradeoff", format!("{:?}", trial.medial_speed_tradeoff));
        params.set("MinEdgeLength", format!("{:?}", trial.min_edge_length));
        params
    }

    /// Renders the launch file for one case.
    #[must_use]
    pub fn render(&self, case_name: &str, input: &Path, output_name: &Path) -> String {
        let mut text = String::from("[Main]\n");
        let _ = writeln!(text, "Input = {}", input.display());
        let _ = writeln!(text, "OutputName = {}", output_name.display());
        for (key, value) in &self.entries {
            let _ = writeln!(text, "{key} = {}", value.replace(NAME_PLACEHOLDER, case_name));
        }
        text
    }

    /// Writes the launch file for one case to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(
        &self,
        path: &Path,
        case_name: &str,
        input: &Path,
        output_name: &Path,
    ) -> std::io::Result<()> {
        fs::write(path, self.render(case_name, input, output_name))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_render_in_order() {
        let text = LaunchParameters::default().render(
            "aorta",
            Path::new("in/aorta.stl"),
            Path::new("out/aorta/aorta"),
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "[Main]");
        assert_eq!(lines[1], "Input = in/aorta.stl");
        assert_eq!(lines[2], "OutputName = out/aorta/aorta");
        assert_eq!(lines[3], "MaxTriangleAngle = 110.0");
        assert_eq!(lines.last().copied(), Some("UseNeckPlane = 0"));
        assert_eq!(lines.len(), 3 + DEFAULT_LAUNCH_PARAMETERS.len());
    }

    #[test]
    fn trial_values_replace_defaults_in_place() {
        let defaults = LaunchParameters::default();
        let trial = TrialParameters {
            quality_speed_tradeoff: 0.25,
            medial_speed_tradeoff: 2.0,
            min_edge_length: 0.1,
        };
        let params = defaults.for_trial(&trial);
        assert_eq!(params.get("QualitySpeedTradeoff"), Some("0.25"));
        assert_eq!(params.get("MedialSpeedTradeoff"), Some("2.0"));
        assert_eq!(params.get("MinEdgeLength"), Some("0.1"));
        assert_eq!(defaults.get("MinEdgeLength"), Some("0.065"));

        let text = params.render("c", Path::new("c.stl"), Path::new("c"));
        assert!(text.contains("MedialSpeedTradeoff = 2.0\nAreaVariationFactor"));
    }

    #[test]
    fn name_placeholder_is_substituted() {
        let mut overrides = BTreeMap::new();
        overrides.insert("LogFile".to_string(), "logs/*NAME*.log".to_string());
        overrides.insert("MaxIterations".to_string(), "900".to_string());
        let params = LaunchParameters::with_overrides(&overrides);

        let text = params.render("carotid", Path::new("x.stl"), Path::new("y"));
        assert!(text.contains("LogFile = logs/carotid.log\n"));
        assert!(text.contains("MaxIterations = 900\n"));
    }

    #[test]
    fn write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case.txt");
        LaunchParameters::default()
            .write(&path, "case", Path::new("case.stl"), Path::new("out"))
            .unwrap();
        assert!(fs::read_to_string(path).unwrap().starts_with("[Main]\n"));
    }
}
