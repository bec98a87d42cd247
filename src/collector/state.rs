use crate::report::types::{RunMetadata, RunReport, TestResult};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashSet;

/// Browser name reported when the driver exposes no capabilities
pub const UNKNOWN_BROWSER: &str = "Unknown";

/// Mutable state of one collection session
#[derive(Debug, Clone)]
pub struct CollectionState {
    pub started_at: DateTime<Utc>,
    results: Vec<TestResult>,
    seen_uids: HashSet<String>,
    log_buffer: Vec<String>,
}

impl CollectionState {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            results: Vec::new(),
            seen_uids: HashSet::new(),
            log_buffer: Vec::new(),
        }
    }

    /// Whether a result with this uid has already been recorded
    pub fn contains(&self, uid: &str) -> bool {
        self.seen_uids.contains(uid)
    }

    /// Append `result` unless its uid was seen before.
    ///
    /// Returns false (and drops the record) for duplicates.
    pub fn record(&mut self, result: TestResult) -> bool {
        if !self.seen_uids.insert(result.uid.clone()) {
            return false;
        }
        self.results.push(result);
        true
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn reset_logs(&mut self) {
        self.log_buffer.clear();
    }

    pub fn push_log(&mut self, chunk: &str) {
        self.log_buffer.push(chunk.to_string());
    }

    /// Hand over the buffered spec logs and leave the buffer empty
    pub fn take_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.log_buffer)
    }

    pub fn metadata(&self, browser_name: Option<String>, ended_at: DateTime<Utc>) -> RunMetadata {
        let elapsed_ms = (ended_at - self.started_at).num_milliseconds().max(0);
        RunMetadata {
            browser_name: browser_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_BROWSER.to_string()),
            execution_start_time: iso_timestamp(&self.started_at),
            execution_end_time: iso_timestamp(&ended_at),
            total_time_in_minutes: format!("{:.2}", elapsed_ms as f64 / 60_000.0),
        }
    }

    pub fn to_report(&self, browser_name: Option<String>, ended_at: DateTime<Utc>) -> RunReport {
        RunReport {
            metadata: self.metadata(browser_name, ended_at),
            test_results: self.results.clone(),
        }
    }
}

/// `2024-01-01T00:10:00.000Z`
pub fn iso_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
