pub mod aggregator;
pub mod history;
pub mod html;
pub mod json;
pub mod junit;
pub mod model;
pub mod screenshot;
pub mod types;

pub use aggregator::{load_documents, ResultAggregator};
pub use history::{load_history, HistoryEntry, HistorySeries};
pub use model::{PartialInputWarning, ReportModel, Summary, SuiteStats, TrendPoint};
pub use types::{ReportDocument, RunMetadata, RunReport, TestResult, TestStatus};

use anyhow::Result;
use std::path::Path;

/// Aggregate every run report in `input_dir` and render it
pub async fn generate_report(
    input_dir: &Path,
    history: Option<&Path>,
    format: &str,
    output: Option<&Path>,
) -> Result<ReportModel> {
    let mut aggregator = ResultAggregator::new();
    if let Some(path) = history {
        aggregator = aggregator.with_history_file(path).await?;
    }
    let model = aggregator.aggregate_folder(input_dir).await?;

    match format {
        "html" => html::generate(&model, output).await?,
        "json" => json::generate(&model, output).await?,
        "junit" => junit::generate(&model, output).await?,
        _ => anyhow::bail!("Unknown format: {}", format),
    }

    Ok(model)
}
