//! Service error types.

/// Errors from interacting with a running tracking service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The service loop has exited; commands can no longer be delivered.
    #[error("tracking service is no longer running")]
    Stopped,
}
