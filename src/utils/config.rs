use crate::collector::suite_name::SuiteNamePolicy;
use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up by the CLI
pub const DEFAULT_CONFIG_FILE: &str = "lumi-reporter.yaml";

/// When the collector asks the driver for a screenshot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ScreenshotOption {
    #[default]
    No,
    OnFailure,
    Full,
}

impl ScreenshotOption {
    pub fn wants_capture(&self, failed: bool) -> bool {
        match self {
            ScreenshotOption::No => false,
            ScreenshotOption::OnFailure => failed,
            ScreenshotOption::Full => true,
        }
    }
}

/// Collector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorOptions {
    /// Report path; only its directory is used, the file name gets a timestamp
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,

    #[serde(default)]
    pub screenshot_option: ScreenshotOption,

    #[serde(default)]
    pub suite_name_policy: SuiteNamePolicy,

    /// Fetch browser console logs after each test (driver permitting)
    #[serde(default)]
    pub capture_browser_logs: bool,

    #[serde(default = "default_browser_log_type")]
    pub browser_log_type: String,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            output_file: default_output_file(),
            screenshot_option: ScreenshotOption::No,
            suite_name_policy: SuiteNamePolicy::Verbatim,
            capture_browser_logs: false,
            browser_log_type: default_browser_log_type(),
        }
    }
}

impl CollectorOptions {
    /// Directory reports and screenshots are written to
    pub fn output_dir(&self) -> PathBuf {
        match self.output_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        self.output_dir().join("screenshots")
    }
}

fn default_output_file() -> PathBuf {
    PathBuf::from("./reports/test-report.json")
}

fn default_browser_log_type() -> String {
    "browser".to_string()
}

/// Load collector options from a YAML file.
///
/// A missing file yields defaults; a file that exists but does not parse is an error.
pub fn load_options(path: &Path) -> Result<CollectorOptions> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(CollectorOptions::default())
        }
        Err(source) => {
            return Err(ReportError::ReadError {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_yaml::from_str(&content).map_err(|source| ReportError::Config {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_options() {
        let yaml = r#"
outputFile: out/results/report.json
screenshotOption: OnFailure
captureBrowserLogs: true
suiteNamePolicy:
  kind: stripNumericSuffix
"#;
        let options: CollectorOptions = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(options.screenshot_option, ScreenshotOption::OnFailure);
        assert!(options.capture_browser_logs);
        assert_eq!(options.browser_log_type, "browser");
        assert_eq!(options.suite_name_policy, SuiteNamePolicy::StripNumericSuffix);
        assert_eq!(options.output_dir(), PathBuf::from("out/results"));
        assert_eq!(
            options.screenshot_dir(),
            PathBuf::from("out/results/screenshots")
        );
    }

    #[test]
    fn test_bare_file_name_uses_current_dir() {
        let options = CollectorOptions {
            output_file: PathBuf::from("report.json"),
            ..Default::default()
        };
        assert_eq!(options.output_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_screenshot_policy() {
        assert!(!ScreenshotOption::No.wants_capture(true));
        assert!(ScreenshotOption::OnFailure.wants_capture(true));
        assert!(!ScreenshotOption::OnFailure.wants_capture(false));
        assert!(ScreenshotOption::Full.wants_capture(false));
    }

    #[test]
    fn test_missing_config_file_gives_defaults() {
        let options = load_options(Path::new("/definitely/not/here.yaml")).unwrap();
        assert_eq!(options.screenshot_option, ScreenshotOption::No);
    }
}
