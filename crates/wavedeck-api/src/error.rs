//! Error taxonomy for REST calls.

/// What can go wrong with an admin REST call.
///
/// Three classes, handled at three levels:
///
/// - [`Transport`](Self::Transport) — no usable response (DNS, refused
///   connection, malformed body). The caller retries or reports.
/// - [`Unauthorized`](Self::Unauthorized) — the backend rejected the
///   credential. Handled globally (the client clears the store and fires
///   its hook) *and* surfaced, so the call site can stop what it was
///   doing.
/// - [`Status`](Self::Status) — any other non-success status. Purely the
///   caller's business; the client does nothing globally.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a usable response.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered 401; the session is over.
    #[error("credential rejected by the backend")]
    Unauthorized,

    /// Any other non-success status, with the backend's message when it
    /// sent one.
    #[error("request failed with status {code}: {message}")]
    Status { code: u16, message: String },
}
