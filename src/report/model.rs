use super::types::{RunMetadata, TestResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Suite key used when a merged record carries no suite name
pub const UNKNOWN_SUITE: &str = "Unknown";

/// Suite a merged record is counted under
pub fn suite_key(result: &TestResult) -> &str {
    if result.suite_name.trim().is_empty() {
        UNKNOWN_SUITE
    } else {
        &result.suite_name
    }
}

/// Round to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / total * 100`, rounded, or 0 when `total` is 0
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(part as f64 / total as f64 * 100.0)
    }
}

/// Pass/fail counters over a set of results
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
    pub fail_rate: f64,
}

impl Summary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let mut counts = SuiteStats::default();
        for result in results {
            counts.add(result);
        }
        counts.into()
    }
}

impl From<SuiteStats> for Summary {
    fn from(stats: SuiteStats) -> Self {
        Self {
            total: stats.total,
            passed: stats.passed,
            failed: stats.failed,
            pass_rate: percentage(stats.passed, stats.total),
            fail_rate: percentage(stats.failed, stats.total),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SuiteStats {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl SuiteStats {
    pub fn new(total: usize, passed: usize, failed: usize) -> Self {
        Self {
            total,
            passed,
            failed,
        }
    }

    pub fn add(&mut self, result: &TestResult) {
        self.total += 1;
        if result.is_passed() {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorCount {
    pub error: String,
    pub count: usize,
}

/// Error message histogram that iterates in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ErrorCount>", into = "Vec<ErrorCount>")]
pub struct UniqueErrors {
    entries: Vec<ErrorCount>,
    index: HashMap<String, usize>,
}

impl UniqueErrors {
    pub fn record(&mut self, error: &str) {
        match self.index.get(error) {
            Some(&i) => self.entries[i].count += 1,
            None => {
                self.index.insert(error.to_string(), self.entries.len());
                self.entries.push(ErrorCount {
                    error: error.to_string(),
                    count: 1,
                });
            }
        }
    }

    pub fn get(&self, error: &str) -> Option<usize> {
        self.index.get(error).map(|&i| self.entries[i].count)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorCount> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<ErrorCount>> for UniqueErrors {
    fn from(entries: Vec<ErrorCount>) -> Self {
        let mut errors = UniqueErrors::default();
        for entry in entries {
            match errors.index.get(&entry.error) {
                Some(&i) => errors.entries[i].count += entry.count,
                None => {
                    errors.index.insert(entry.error.clone(), errors.entries.len());
                    errors.entries.push(entry);
                }
            }
        }
        errors
    }
}

impl From<UniqueErrors> for Vec<ErrorCount> {
    fn from(errors: UniqueErrors) -> Self {
        errors.entries
    }
}

/// One point of a suite's history trend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub timestamp: String,
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
    pub fail_rate: f64,
    pub new_issues: Vec<String>,
    pub resolved_issues: Vec<String>,
}

/// Input skipped during aggregation: a whole file, or one record of it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PartialInputWarning {
    pub path: PathBuf,
    /// Index of the dropped record; `None` when the whole file was skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<usize>,
    pub reason: String,
}

impl PartialInputWarning {
    pub fn file(path: &Path, reason: String) -> Self {
        Self {
            path: path.to_path_buf(),
            record: None,
            reason,
        }
    }

    pub fn record(path: &Path, index: usize, reason: String) -> Self {
        Self {
            path: path.to_path_buf(),
            record: Some(index),
            reason,
        }
    }

    pub fn is_file_level(&self) -> bool {
        self.record.is_none()
    }
}

impl std::fmt::Display for PartialInputWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.record {
            Some(index) => write!(f, "{} record {}: {}", self.path.display(), index, self.reason),
            None => write!(f, "{}: {}", self.path.display(), self.reason),
        }
    }
}

/// Everything a renderer needs, derived fresh from the inputs on every run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportModel {
    pub merged_results: Vec<TestResult>,
    pub overall_summary: Summary,
    pub suite_stats: BTreeMap<String, SuiteStats>,
    pub unique_errors: UniqueErrors,
    pub aggregate_metadata: RunMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_trend: Option<BTreeMap<String, Vec<TrendPoint>>>,
    /// `.json` files found in the input directory
    pub input_files: usize,
    pub warnings: Vec<PartialInputWarning>,
}

impl ReportModel {
    /// Files skipped as a whole
    pub fn skipped_files(&self) -> usize {
        self.warnings.iter().filter(|w| w.is_file_level()).count()
    }

    /// Records dropped from otherwise accepted files
    pub fn skipped_records(&self) -> usize {
        self.warnings.len() - self.skipped_files()
    }

    /// Files that contributed results
    pub fn accepted_files(&self) -> usize {
        self.input_files.saturating_sub(self.skipped_files())
    }
}
