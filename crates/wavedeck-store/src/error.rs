//! Error types for credential storage.

/// Errors that can occur while reading or writing the credential slot.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading the slot failed.
    #[error("failed to read credential slot: {0}")]
    Read(#[source] std::io::Error),

    /// Persisting a new credential failed.
    #[error("failed to write credential slot: {0}")]
    Write(#[source] std::io::Error),

    /// Emptying the slot failed.
    #[error("failed to clear credential slot: {0}")]
    Clear(#[source] std::io::Error),
}
