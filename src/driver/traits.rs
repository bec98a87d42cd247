use async_trait::async_trait;
use thiserror::Error;

/// Failure modes of a browser-automation call.
///
/// The collector reacts differently to each: unsupported calls are
/// skipped silently, connection problems are warnings, the rest are errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    #[error("operation not supported by this browser/driver combination")]
    Unsupported,

    #[error("connection to automation driver failed: {0}")]
    Connection(String),

    #[error("{0}")]
    Other(String),
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Browser-automation handle injected into the collector
///
/// This trait is the only view the reporter has of the running browser
/// session. Implementations wrap whatever protocol client the host test
/// engine uses (WebDriver, CDP, Playwright); tests use an in-memory fake.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Browser name from the session capabilities, if the session has one
    fn browser_name(&self) -> Option<String>;

    /// Capture the current viewport
    ///
    /// # Returns
    /// The PNG image encoded as base64
    async fn take_screenshot(&self) -> DriverResult<String>;

    /// Whether `get_logs` can be called for the given log type
    ///
    /// Defaults to false; only some browser/protocol combinations expose logs.
    fn supports_log_type(&self, _log_type: &str) -> bool {
        false
    }

    /// Retrieve (and usually drain) the browser's log buffer of `log_type`
    async fn get_logs(&self, _log_type: &str) -> DriverResult<Vec<String>> {
        Err(DriverError::Unsupported)
    }
}

/// Driver for runs without a browser session (e.g. API-only suites)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBrowser;

#[async_trait]
impl AutomationDriver for NoBrowser {
    fn browser_name(&self) -> Option<String> {
        None
    }

    async fn take_screenshot(&self) -> DriverResult<String> {
        Err(DriverError::Unsupported)
    }
}
