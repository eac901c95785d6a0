pub mod error;
pub mod logging;

pub use error::{ErrorSeverity, HistoryError, Result, SelectionTarget};
pub use logging::{setup_logging, LogFormat, LogOutput, LoggingConfig};
