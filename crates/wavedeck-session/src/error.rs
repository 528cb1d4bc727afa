//! Error types for the session layer.

/// Errors that can occur during session transitions.
///
/// Deliberately small: credential decode failures and channel failures
/// never surface here — decode failures fail closed into "no session",
/// and channel failures are absorbed by the channel's own reconnect
/// loop. What remains is the durable store.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The durable credential slot could not be read or written.
    #[error(transparent)]
    Store(#[from] wavedeck_store::StoreError),
}
