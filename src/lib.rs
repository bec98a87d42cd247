pub mod collector;
pub mod driver;
pub mod error;
pub mod report;
pub mod utils;

// Re-export common items
pub use collector::{Reporter, ResultCollector};
pub use error::{ReportError, Result};
pub use report::{generate_report, ReportModel, ResultAggregator};
