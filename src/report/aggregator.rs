use super::history::{build_trend, load_history, parse_timestamp, HistorySeries};
use super::model::{
    round2, suite_key, PartialInputWarning, ReportModel, SuiteStats, Summary, UniqueErrors,
};
use super::types::{ReportDocument, RunMetadata, TestResult};
use crate::error::{ReportError, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A result document accepted from the input directory
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub document: ReportDocument,
}

/// Outcome of scanning an input directory
#[derive(Debug, Clone, Default)]
pub struct LoadedInputs {
    pub documents: Vec<LoadedDocument>,
    pub warnings: Vec<PartialInputWarning>,
    /// `.json` entries seen, accepted or not
    pub files_seen: usize,
}

/// Read every `*.json` file directly inside `dir`, in file-name order.
///
/// Only an unlistable directory is an error. Unreadable or malformed files
/// become warnings and the scan continues; so do single records that are
/// not valid test results, while the rest of their file is kept.
pub async fn load_documents(dir: &Path) -> Result<LoadedInputs> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|source| ReportError::ReadError {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut inputs = LoadedInputs::default();
    let mut paths = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                if path.extension().map_or(false, |ext| ext == "json") && is_file(&path).await {
                    paths.push(path);
                }
            }
            Ok(None) => break,
            Err(e) => {
                inputs.files_seen += 1;
                push_warning(
                    &mut inputs.warnings,
                    PartialInputWarning::file(dir, format!("listing stopped early: {}", e)),
                );
                break;
            }
        }
    }
    paths.sort();

    for path in paths {
        inputs.files_seen += 1;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                push_warning(
                    &mut inputs.warnings,
                    PartialInputWarning::file(&path, format!("unreadable: {}", e)),
                );
                continue;
            }
        };

        match ReportDocument::parse(&content) {
            Ok((document, rejected)) => {
                for record in rejected {
                    push_warning(
                        &mut inputs.warnings,
                        PartialInputWarning::record(
                            &path,
                            record.index,
                            format!("not a test result: {}", record.reason),
                        ),
                    );
                }
                log::debug!("Loaded result document {}", path.display());
                inputs.documents.push(LoadedDocument { path, document });
            }
            Err(e) => {
                push_warning(
                    &mut inputs.warnings,
                    PartialInputWarning::file(&path, format!("not a result document: {}", e)),
                );
            }
        }
    }

    Ok(inputs)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}

fn push_warning(warnings: &mut Vec<PartialInputWarning>, warning: PartialInputWarning) {
    log::warn!("Skipping {}", warning);
    warnings.push(warning);
}

/// Merges run reports (and optionally a history series) into a [`ReportModel`]
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    history: Option<HistorySeries>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, history: HistorySeries) -> Self {
        self.history = Some(history);
        self
    }

    /// Attach the history series stored at `path`
    pub async fn with_history_file(self, path: &Path) -> Result<Self> {
        Ok(self.with_history(load_history(path).await?))
    }

    /// Load and aggregate every result document in `dir`
    pub async fn aggregate_folder(&self, dir: &Path) -> Result<ReportModel> {
        let inputs = load_documents(dir).await?;
        let model = self.aggregate(inputs);
        log::info!(
            "Aggregated {} results from {} of {} files in {}",
            model.overall_summary.total,
            model.accepted_files(),
            model.input_files,
            dir.display()
        );
        Ok(model)
    }

    /// Aggregate already-loaded inputs.
    ///
    /// Records are concatenated in document order without cross-file
    /// de-duplication: the same uid in two files counts twice.
    pub fn aggregate(&self, inputs: LoadedInputs) -> ReportModel {
        let mut window = MetadataWindow::default();
        let mut merged_results: Vec<TestResult> = Vec::new();

        for loaded in inputs.documents {
            let (metadata, results) = loaded.document.into_parts();
            if let Some(metadata) = metadata {
                window.observe(metadata);
            }
            merged_results.extend(results);
        }

        let mut suite_stats: BTreeMap<String, SuiteStats> = BTreeMap::new();
        let mut unique_errors = UniqueErrors::default();
        for result in &merged_results {
            suite_stats
                .entry(suite_key(result).to_string())
                .or_default()
                .add(result);

            if !result.error.is_empty() {
                unique_errors.record(&result.error);
            }
        }

        ReportModel {
            overall_summary: Summary::from_results(&merged_results),
            merged_results,
            suite_stats,
            unique_errors,
            aggregate_metadata: window.finish(),
            history_trend: self.history.as_deref().map(build_trend),
            input_files: inputs.files_seen,
            warnings: inputs.warnings,
        }
    }
}

/// Earliest start and latest end over every document that has metadata
#[derive(Debug, Default)]
struct MetadataWindow {
    first: Option<RunMetadata>,
    start: Option<(DateTime<Utc>, String)>,
    end: Option<(DateTime<Utc>, String)>,
}

impl MetadataWindow {
    fn observe(&mut self, metadata: RunMetadata) {
        if let Some(start) = parse_timestamp(&metadata.execution_start_time) {
            if self.start.as_ref().map_or(true, |(current, _)| start < *current) {
                self.start = Some((start, metadata.execution_start_time.clone()));
            }
        }
        if let Some(end) = parse_timestamp(&metadata.execution_end_time) {
            if self.end.as_ref().map_or(true, |(current, _)| end > *current) {
                self.end = Some((end, metadata.execution_end_time.clone()));
            }
        }
        if self.first.is_none() {
            self.first = Some(metadata);
        }
    }

    fn finish(self) -> RunMetadata {
        let Some(first) = self.first else {
            return RunMetadata::unavailable();
        };

        match (self.start, self.end) {
            (Some((start, start_raw)), Some((end, end_raw))) => {
                let minutes = (end - start).num_milliseconds() as f64 / 60_000.0;
                RunMetadata {
                    browser_name: first.browser_name,
                    execution_start_time: start_raw,
                    execution_end_time: end_raw,
                    total_time_in_minutes: format!("{:.2}", round2(minutes)),
                }
            }
            // Timestamps we cannot order: keep what the first run reported
            _ => first,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::history::{HistoryEntry, SuiteSnapshot};
    use crate::report::model::{ErrorCount, UNKNOWN_SUITE};
    use crate::report::types::TestStatus;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lumi-aggregate-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const RUN1: &str = r#"{
        "metadata": {
            "browserName": "chrome",
            "executionStartTime": "2024-01-01T00:00:00Z",
            "executionEndTime": "2024-01-01T00:10:00Z"
        },
        "testResults": [
            {"suiteName": "S1", "testName": "t1", "status": "PASSED"},
            {"suiteName": "S1", "testName": "t2", "status": "FAILED", "error": "boom"}
        ]
    }"#;

    const RUN2: &str = r#"{
        "metadata": {
            "browserName": "firefox",
            "executionStartTime": "2024-01-01T00:05:00Z",
            "executionEndTime": "2024-01-01T00:20:30Z"
        },
        "testResults": [
            {"suiteName": "S2", "testName": "t3", "status": "PASSED"}
        ]
    }"#;

    #[tokio::test]
    async fn test_end_to_end_counts() {
        let dir = temp_dir();
        std::fs::write(dir.join("run1.json"), RUN1).unwrap();
        std::fs::write(dir.join("run2.json"), RUN2).unwrap();

        let model = ResultAggregator::new().aggregate_folder(&dir).await.unwrap();

        assert_eq!(model.overall_summary.total, 3);
        assert_eq!(model.overall_summary.passed, 2);
        assert_eq!(model.overall_summary.failed, 1);
        assert_eq!(model.suite_stats["S1"], SuiteStats::new(2, 1, 1));
        assert_eq!(model.suite_stats["S2"], SuiteStats::new(1, 1, 0));
        assert_eq!(model.suite_stats.len(), 2);
        assert_eq!(model.unique_errors.get("boom"), Some(1));
        assert_eq!(model.unique_errors.len(), 1);
        assert!(model.warnings.is_empty());
        assert!(model.history_trend.is_none());

        let names: Vec<&str> = model
            .merged_results
            .iter()
            .map(|r| r.test_name.as_str())
            .collect();
        assert_eq!(names, vec!["t1", "t2", "t3"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_metadata_window_spans_all_documents() {
        let dir = temp_dir();
        std::fs::write(dir.join("run1.json"), RUN1).unwrap();
        std::fs::write(dir.join("run2.json"), RUN2).unwrap();

        let metadata = ResultAggregator::new()
            .aggregate_folder(&dir)
            .await
            .unwrap()
            .aggregate_metadata;

        assert_eq!(metadata.browser_name, "chrome");
        assert_eq!(metadata.execution_start_time, "2024-01-01T00:00:00Z");
        assert_eq!(metadata.execution_end_time, "2024-01-01T00:20:30Z");
        assert_eq!(metadata.total_time_in_minutes, "20.50");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_corrupt_file_is_isolated() {
        let dir = temp_dir();
        std::fs::write(dir.join("a.json"), RUN1).unwrap();
        std::fs::write(dir.join("b.json"), "{\"testResults\": [").unwrap();
        std::fs::write(dir.join("c.json"), RUN2).unwrap();
        std::fs::write(dir.join("notes.txt"), "not considered").unwrap();

        let model = ResultAggregator::new().aggregate_folder(&dir).await.unwrap();

        assert_eq!(model.overall_summary.total, 3);
        assert_eq!(model.warnings.len(), 1);
        assert!(model.warnings[0].path.ends_with("b.json"));
        assert_eq!(model.input_files, 3);
        assert_eq!(model.accepted_files(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_bare_array_document() {
        let dir = temp_dir();
        std::fs::write(
            dir.join("legacy.json"),
            r#"[{"testName": "x", "status": "FAILED", "error": "E"}, {"testName": "y", "status": "PASSED"}]"#,
        )
        .unwrap();

        let model = ResultAggregator::new().aggregate_folder(&dir).await.unwrap();

        assert_eq!(model.overall_summary.total, 2);
        assert_eq!(model.suite_stats[UNKNOWN_SUITE], SuiteStats::new(2, 1, 1));
        assert_eq!(model.aggregate_metadata, RunMetadata::unavailable());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_unlistable_directory_is_fatal() {
        let err = ResultAggregator::new()
            .aggregate_folder(Path::new("/no/such/results/dir"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::ReadError { .. }));
    }

    #[tokio::test]
    async fn test_unknown_status_drops_only_that_record() {
        let dir = temp_dir();
        std::fs::write(
            dir.join("mixed.json"),
            r#"{"testResults": [
                {"suiteName": "S1", "testName": "ok", "status": "PASSED"},
                {"suiteName": "S1", "testName": "broken", "status": "FAILED", "error": "boom"},
                {"suiteName": "S1", "testName": "later", "status": "SKIPPED"}
            ]}"#,
        )
        .unwrap();
        std::fs::write(dir.join("other.json"), RUN2).unwrap();

        let model = ResultAggregator::new().aggregate_folder(&dir).await.unwrap();

        assert_eq!(model.overall_summary.total, 3);
        assert_eq!(model.suite_stats["S1"], SuiteStats::new(2, 1, 1));
        assert_eq!(model.unique_errors.get("boom"), Some(1));
        assert_eq!(model.warnings.len(), 1);
        assert_eq!(model.warnings[0].record, Some(2));
        assert!(model.warnings[0].path.ends_with("mixed.json"));
        assert_eq!(model.skipped_files(), 0);
        assert_eq!(model.skipped_records(), 1);
        assert_eq!(model.accepted_files(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_cross_file_duplicates_count_twice() {
        let result = r#"[{"uid": "same", "testName": "t", "suiteName": "S", "status": "PASSED"}]"#;
        let inputs = LoadedInputs {
            documents: vec![
                LoadedDocument {
                    path: PathBuf::from("one.json"),
                    document: serde_json::from_str(result).unwrap(),
                },
                LoadedDocument {
                    path: PathBuf::from("two.json"),
                    document: serde_json::from_str(result).unwrap(),
                },
            ],
            warnings: vec![],
            files_seen: 2,
        };

        let model = ResultAggregator::new().aggregate(inputs);
        assert_eq!(model.overall_summary.total, 2);
        assert_eq!(model.suite_stats["S"].total, 2);
    }

    #[test]
    fn test_unique_errors_and_invariants() {
        let statuses = [
            ("S1", TestStatus::Failed, "E1"),
            ("S2", TestStatus::Failed, "E2"),
            ("", TestStatus::Passed, ""),
            ("S1", TestStatus::Failed, "E1"),
            ("S3", TestStatus::Passed, ""),
        ];
        let results: Vec<TestResult> = statuses
            .iter()
            .enumerate()
            .map(|(i, (suite, status, error))| TestResult {
                uid: i.to_string(),
                timestamp: String::new(),
                suite_name: suite.to_string(),
                test_name: format!("t{}", i),
                status: *status,
                error: error.to_string(),
                stack: String::new(),
                screenshot: String::new(),
                browser_console_logs: vec![],
                spec_console_logs: vec![],
            })
            .collect();
        let inputs = LoadedInputs {
            documents: vec![LoadedDocument {
                path: PathBuf::from("run.json"),
                document: ReportDocument::Bare(results),
            }],
            warnings: vec![],
            files_seen: 1,
        };

        let model = ResultAggregator::new().aggregate(inputs);

        let errors: Vec<ErrorCount> = model.unique_errors.iter().cloned().collect();
        assert_eq!(
            errors,
            vec![
                ErrorCount { error: "E1".to_string(), count: 2 },
                ErrorCount { error: "E2".to_string(), count: 1 },
            ]
        );

        let summary = model.overall_summary;
        assert_eq!(summary.total, summary.passed + summary.failed);
        let suite_total: usize = model.suite_stats.values().map(|s| s.total).sum();
        assert_eq!(suite_total, summary.total);
        assert_eq!(model.suite_stats[UNKNOWN_SUITE].total, 1);
        assert_eq!(summary.pass_rate, 40.0);
        assert_eq!(summary.fail_rate, 60.0);
    }

    #[test]
    fn test_history_trend_attached() {
        let history = vec![HistoryEntry {
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            suites: BTreeMap::from([(
                "S1".to_string(),
                SuiteSnapshot {
                    total_tests: 0,
                    passed: 0,
                    failed: 0,
                    defect_comparison: None,
                },
            )]),
        }];

        let model = ResultAggregator::new()
            .with_history(history)
            .aggregate(LoadedInputs::default());

        let trend = model.history_trend.unwrap();
        assert_eq!(trend["S1"].len(), 1);
        assert_eq!(trend["S1"][0].pass_rate, 0.0);
        assert_eq!(model.overall_summary.total, 0);
    }
}
