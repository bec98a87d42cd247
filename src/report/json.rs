use super::model::ReportModel;
use crate::error::ReportError;
use anyhow::Result;
use std::path::Path;

/// Generate JSON report
pub async fn generate(model: &ReportModel, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(model)?;

    if let Some(path) = output {
        tokio::fs::write(path, json)
            .await
            .map_err(|source| ReportError::OutputWrite {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!("JSON report saved to: {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}
