//! Error types for the channel layer.

/// Errors that can occur on the realtime channel.
///
/// Callers rarely see these: connect and receive failures are consumed
/// by the channel's own reconnect loop and surface to subscribers as
/// `ChannelEvent::Disconnected` instead.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Establishing a connection failed (bad endpoint, refused upgrade,
    /// unreachable host).
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// An established connection failed mid-stream.
    ///
    /// This is the transient class: it never forces logout.
    #[error("transport failed: {0}")]
    Transport(String),
}
