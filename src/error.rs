//! Error types for the wallboard service.

/// Top-level error type for the portal background service.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// Card/task/contact store error.
    #[error("store error: {0}")]
    Store(String),

    /// Schedule evaluation or loop orchestration error.
    #[error("schedule error: {0}")]
    Schedule(String),

    /// Snapshot export error.
    #[error("export error: {0}")]
    Export(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PortalError>;
