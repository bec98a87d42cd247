//! Historical per-suite statistics and the trend series derived from them.
//!
//! The history file is maintained outside this crate. New and resolved
//! issues are taken from each entry's `defectComparison` as-is; nothing
//! here recomputes them from raw results.

use super::model::{percentage, TrendPoint};
use crate::error::{ReportError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DefectComparison {
    #[serde(default)]
    pub new_defects: Vec<String>,
    #[serde(default)]
    pub resolved_defects: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SuiteSnapshot {
    #[serde(default)]
    pub total_tests: usize,
    #[serde(default)]
    pub passed: usize,
    #[serde(default)]
    pub failed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defect_comparison: Option<DefectComparison>,
}

/// Per-suite statistics of one past run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub timestamp: String,
    #[serde(default)]
    pub suites: BTreeMap<String, SuiteSnapshot>,
}

pub type HistorySeries = Vec<HistoryEntry>;

/// Read a history series from a JSON file
pub async fn load_history(path: &Path) -> Result<HistorySeries> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ReportError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&content).map_err(|source| ReportError::HistoryParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Group the series by suite; every suite's points ascend by timestamp.
///
/// RFC 3339 timestamps are ordered chronologically; anything unparseable
/// sorts after them, lexically.
pub fn build_trend(history: &[HistoryEntry]) -> BTreeMap<String, Vec<TrendPoint>> {
    let mut entries: Vec<&HistoryEntry> = history.iter().collect();
    entries.sort_by_cached_key(|entry| {
        let parsed = parse_timestamp(&entry.timestamp);
        (parsed.is_none(), parsed, entry.timestamp.clone())
    });

    let mut trend: BTreeMap<String, Vec<TrendPoint>> = BTreeMap::new();
    for entry in entries {
        for (suite, snapshot) in &entry.suites {
            let defects = snapshot.defect_comparison.clone().unwrap_or_default();
            trend.entry(suite.clone()).or_default().push(TrendPoint {
                timestamp: entry.timestamp.clone(),
                total_tests: snapshot.total_tests,
                passed: snapshot.passed,
                failed: snapshot.failed,
                pass_rate: percentage(snapshot.passed, snapshot.total_tests),
                fail_rate: percentage(snapshot.failed, snapshot.total_tests),
                new_issues: defects.new_defects,
                resolved_issues: defects.resolved_defects,
            });
        }
    }
    trend
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|time| time.with_timezone(&Utc))
}
