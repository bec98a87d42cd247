use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to callers of the collector and the aggregator.
///
/// Per-file input problems are not errors; they are collected as
/// [`crate::report::PartialInputWarning`] values on the report model.
#[derive(Error, Debug)]
pub enum ReportError {
    /// The input directory (or history file) could not be read at all
    #[error("Failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid history file {path}: {source}")]
    HistoryParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Writing a run report or a rendered output failed
    #[error("Failed to write {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

pub type Result<T> = std::result::Result<T, ReportError>;
