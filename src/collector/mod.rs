pub mod events;
pub mod sanitize;
pub mod state;
pub mod suite_name;

use crate::driver::{AutomationDriver, DriverError};
use crate::error::{ReportError, Result};
use crate::report::types::{TestResult, TestStatus};
use crate::utils::config::CollectorOptions;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use events::*;
pub use state::*;
pub use suite_name::{SuiteNamePolicy, SuiteNameTransform};

/// Suite name recorded when the engine gives a test no parent label
pub const DEFAULT_SUITE: &str = "Default Suite";

/// Lifecycle hooks a reporter registers with the host test engine
///
/// None of the hooks may abort the run: capture problems are handled
/// inside the reporter. Only the final report write can fail.
#[async_trait]
pub trait Reporter: Send {
    /// A test is about to run; resets the per-test spec log buffer
    fn on_test_start(&mut self, test: &TestInfo);

    /// Raw stdout chunk from the spec under test
    fn on_stdout(&mut self, chunk: &str);

    async fn on_test_pass(&mut self, test: &TestInfo);

    async fn on_test_fail(&mut self, test: &TestInfo);

    /// Write the run report, returning its path
    async fn on_runner_end(&mut self) -> Result<PathBuf>;
}

/// Collects pass/fail results during a live run and writes one JSON run report.
///
/// The spec log buffer is reset when a test starts and handed over when
/// that test's result is assembled. Output that arrives after the result
/// was recorded is attributed to whichever test is current at that time.
pub struct ResultCollector {
    driver: Arc<dyn AutomationDriver>,
    options: CollectorOptions,
    suite_names: Box<dyn SuiteNameTransform>,
    state: CollectionState,
}

impl ResultCollector {
    pub fn new(driver: Arc<dyn AutomationDriver>, options: CollectorOptions) -> Self {
        let suite_names = options.suite_name_policy.compile();
        Self {
            driver,
            options,
            suite_names,
            state: CollectionState::new(Utc::now()),
        }
    }

    /// Replace the configured suite-name policy with a custom transform
    pub fn with_suite_names<T>(mut self, transform: T) -> Self
    where
        T: SuiteNameTransform + 'static,
    {
        self.suite_names = Box::new(transform);
        self
    }

    pub fn options(&self) -> &CollectorOptions {
        &self.options
    }

    /// Results recorded so far, in completion order
    pub fn results(&self) -> &[TestResult] {
        self.state.results()
    }

    /// Build and record the result of a finished test.
    ///
    /// Returns false when a result with the same uid was already recorded;
    /// the duplicate is dropped without capturing anything.
    pub async fn add_test_result(&mut self, test: &TestInfo, status: TestStatus) -> bool {
        let timestamp = iso_timestamp(&Utc::now());
        let uid = match test.uid.as_deref() {
            Some(uid) if !uid.is_empty() => uid.to_string(),
            _ => format!("{}-{}", test.title, timestamp),
        };

        if self.state.contains(&uid) {
            log::debug!("Ignoring duplicate result for '{}' ({})", test.title, uid);
            self.state.take_logs();
            return false;
        }

        let suite_name = self.suite_name(test);
        let failed = status == TestStatus::Failed;
        let (error, stack) = match (&test.error, failed) {
            (Some(err), true) => (
                sanitize::sanitize_message(&err.message),
                err.stack.as_deref().map(sanitize::sanitize).unwrap_or_default(),
            ),
            _ => (String::new(), String::new()),
        };

        let screenshot = if self.options.screenshot_option.wants_capture(failed) {
            self.capture_screenshot(&test.title, &timestamp, &uid).await
        } else {
            String::new()
        };

        let browser_console_logs = if self.options.capture_browser_logs {
            self.collect_browser_logs().await
        } else {
            Vec::new()
        };

        let spec_console_logs = self.state.take_logs();

        self.state.record(TestResult {
            uid,
            timestamp,
            suite_name,
            test_name: test.title.clone(),
            status,
            error,
            stack,
            screenshot,
            browser_console_logs,
            spec_console_logs,
        })
    }

    /// Write the run report next to the configured output file
    pub async fn write_report(&self) -> Result<PathBuf> {
        let ended_at = Utc::now();
        let report = self.state.to_report(self.driver.browser_name(), ended_at);

        let dir = self.options.output_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| ReportError::OutputWrite {
                path: dir.clone(),
                source,
            })?;

        let file_name = format!(
            "test-report-{}-{}.json",
            iso_timestamp(&ended_at).replace(':', "-"),
            std::process::id()
        );
        let path = dir.join(file_name);
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|source| ReportError::OutputWrite {
                path: path.clone(),
                source,
            })?;

        log::info!(
            "JSON report with {} results written to {}",
            report.test_results.len(),
            path.display()
        );
        Ok(path)
    }

    fn suite_name(&self, test: &TestInfo) -> String {
        let raw = test.parent.as_deref().map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return DEFAULT_SUITE.to_string();
        }
        let normalized = self.suite_names.normalize(raw);
        if normalized.is_empty() {
            DEFAULT_SUITE.to_string()
        } else {
            normalized
        }
    }

    /// Capture and store a screenshot; an empty path means nothing was saved
    async fn capture_screenshot(&self, title: &str, timestamp: &str, uid: &str) -> String {
        let encoded = match self.driver.take_screenshot().await {
            Ok(data) => data,
            Err(DriverError::Unsupported) => return String::new(),
            Err(e) => {
                log::warn!("Failed to capture screenshot for '{}': {}", title, e);
                return String::new();
            }
        };

        let bytes = match STANDARD.decode(encoded.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Screenshot for '{}' is not valid base64: {}", title, e);
                return String::new();
            }
        };

        let dir = self.options.screenshot_dir();
        let path = dir.join(screenshot_file_name(title, timestamp, uid));
        match write_file(&dir, &path, &bytes).await {
            Ok(()) => path.to_string_lossy().to_string(),
            Err(e) => {
                log::warn!("Failed to save screenshot {}: {}", path.display(), e);
                String::new()
            }
        }
    }

    async fn collect_browser_logs(&self) -> Vec<String> {
        let log_type = self.options.browser_log_type.as_str();
        if !self.driver.supports_log_type(log_type) {
            return Vec::new();
        }

        match self.driver.get_logs(log_type).await {
            Ok(lines) => lines,
            Err(DriverError::Unsupported) => Vec::new(),
            Err(e @ DriverError::Connection(_)) => {
                log::warn!("Could not fetch {} logs: {}", log_type, e);
                Vec::new()
            }
            Err(e) => {
                log::error!("Error fetching {} logs: {}", log_type, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Reporter for ResultCollector {
    fn on_test_start(&mut self, _test: &TestInfo) {
        self.state.reset_logs();
    }

    fn on_stdout(&mut self, chunk: &str) {
        self.state.push_log(chunk);
    }

    async fn on_test_pass(&mut self, test: &TestInfo) {
        self.add_test_result(test, TestStatus::Passed).await;
    }

    async fn on_test_fail(&mut self, test: &TestInfo) {
        self.add_test_result(test, TestStatus::Failed).await;
    }

    async fn on_runner_end(&mut self) -> Result<PathBuf> {
        self.write_report().await
    }
}

/// Title characters kept in a screenshot file name; the uid hash keeps names distinct
const MAX_TITLE_CHARS: usize = 100;

/// `screenshot-<title>-<timestamp>-<hash>.png`, safe on every file system
pub fn screenshot_file_name(title: &str, timestamp: &str, uid: &str) -> String {
    let safe_title: String = title
        .chars()
        .take(MAX_TITLE_CHARS)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let safe_timestamp = timestamp.replace(':', "-");
    let digest = Sha256::digest(uid.as_bytes());
    let hash: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
    format!("screenshot-{}-{}-{}.png", safe_title, safe_timestamp, hash)
}

async fn write_file(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(path, bytes).await
}
