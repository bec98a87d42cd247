pub mod traits;

pub use traits::{AutomationDriver, DriverError, DriverResult, NoBrowser};
