//! CLI error types.

use std::fmt;

use geotimesheet::config::ConfigError;
use geotimesheet::monday::MondayError;
use geotimesheet::position::ReceiverError;

/// Errors surfaced to the CLI user.
#[derive(Debug)]
pub enum CliError {
    /// Configuration problem (missing key, bad value, unreadable file).
    Config(String),

    /// Monday.com API failure.
    Monday(MondayError),

    /// Fix receiver failure.
    Receiver(ReceiverError),

    /// Failed to create the Tokio runtime.
    Runtime(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Monday(e) => write!(f, "Monday.com error: {}", e),
            CliError::Receiver(e) => write!(f, "Fix receiver error: {}", e),
            CliError::Runtime(msg) => write!(f, "Failed to create Tokio runtime: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Monday(e) => Some(e),
            CliError::Receiver(e) => Some(e),
            CliError::Config(_) | CliError::Runtime(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<MondayError> for CliError {
    fn from(e: MondayError) -> Self {
        CliError::Monday(e)
    }
}

impl From<ReceiverError> for CliError {
    fn from(e: ReceiverError) -> Self {
        CliError::Receiver(e)
    }
}
