use serde::{Deserialize, Deserializer, Serialize};

/// Sentinel used for metadata fields that could not be determined
pub const NOT_AVAILABLE: &str = "N/A";

/// Terminal status of a single test execution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    Passed,
    Failed,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "PASSED",
            TestStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One test execution as written to a run report.
///
/// Every field except `status` is optional on input so that documents
/// written by older reporters (or by hand) still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub suite_name: String,
    #[serde(default)]
    pub test_name: String,
    pub status: TestStatus,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub stack: String,
    #[serde(default)]
    pub screenshot: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub browser_console_logs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spec_console_logs: Vec<String>,
}

impl TestResult {
    pub fn is_passed(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

/// Run-level information computed by the collector at run end
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    #[serde(default = "not_available")]
    pub browser_name: String,
    #[serde(default = "not_available")]
    pub execution_start_time: String,
    #[serde(default = "not_available")]
    pub execution_end_time: String,
    #[serde(default = "not_available", deserialize_with = "string_or_number")]
    pub total_time_in_minutes: String,
}

impl RunMetadata {
    /// Metadata with every field set to the "N/A" sentinel
    pub fn unavailable() -> Self {
        Self {
            browser_name: not_available(),
            execution_start_time: not_available(),
            execution_end_time: not_available(),
            total_time_in_minutes: not_available(),
        }
    }
}

impl Default for RunMetadata {
    fn default() -> Self {
        Self::unavailable()
    }
}

/// Document written once per run by the collector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub metadata: RunMetadata,
    pub test_results: Vec<TestResult>,
}

/// Any JSON shape accepted as a result document by the aggregator
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReportDocument {
    /// `{ "metadata": {...}, "testResults": [...] }`, metadata optional
    Run {
        #[serde(default)]
        metadata: Option<RunMetadata>,
        #[serde(rename = "testResults")]
        test_results: Vec<TestResult>,
    },
    /// A bare array of test results, no metadata contribution
    Bare(Vec<TestResult>),
}

impl ReportDocument {
    pub fn into_parts(self) -> (Option<RunMetadata>, Vec<TestResult>) {
        match self {
            ReportDocument::Run {
                metadata,
                test_results,
            } => (metadata, test_results),
            ReportDocument::Bare(results) => (None, results),
        }
    }
}

/// A record of an accepted document that is not a valid test result
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    /// Position in the document's result list
    pub index: usize,
    pub reason: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Run {
        #[serde(default)]
        metadata: Option<RunMetadata>,
        #[serde(rename = "testResults")]
        test_results: Vec<serde_json::Value>,
    },
    Bare(Vec<serde_json::Value>),
}

impl ReportDocument {
    /// Parse a result document record by record.
    ///
    /// Only the document shape can fail. Records that are not valid test
    /// results (an unknown status, say) are returned as rejections and the
    /// rest of the document is kept.
    pub fn parse(content: &str) -> serde_json::Result<(Self, Vec<RejectedRecord>)> {
        let (metadata, values, bare) = match serde_json::from_str::<RawDocument>(content)? {
            RawDocument::Run {
                metadata,
                test_results,
            } => (metadata, test_results, false),
            RawDocument::Bare(values) => (None, values, true),
        };

        let mut results = Vec::with_capacity(values.len());
        let mut rejected = Vec::new();
        for (index, value) in values.into_iter().enumerate() {
            match serde_json::from_value::<TestResult>(value) {
                Ok(result) => results.push(result),
                Err(e) => rejected.push(RejectedRecord {
                    index,
                    reason: e.to_string(),
                }),
            }
        }

        let document = if bare {
            ReportDocument::Bare(results)
        } else {
            ReportDocument::Run {
                metadata,
                test_results: results,
            }
        };
        Ok((document, rejected))
    }
}

impl From<RunReport> for ReportDocument {
    fn from(report: RunReport) -> Self {
        ReportDocument::Run {
            metadata: Some(report.metadata),
            test_results: report.test_results,
        }
    }
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

/// Older reporters wrote the elapsed minutes as a number
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(not_available()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for totalTimeInMinutes, got {}",
            other
        ))),
    }
}
