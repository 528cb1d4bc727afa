//! One error type spanning the whole SDK surface.

use wavedeck_api::ApiError;
use wavedeck_channel::ChannelError;
use wavedeck_protocol::ProtocolError;
use wavedeck_session::SessionError;
use wavedeck_store::StoreError;

/// Any failure the SDK can produce, one variant per layer.
///
/// Embedders going through the meta-crate can write `?` against a single
/// `Result<_, WavedeckError>` instead of naming each layer's error;
/// transparent wrapping keeps the underlying message and source chain
/// intact for logging.
#[derive(Debug, thiserror::Error)]
pub enum WavedeckError {
    /// A protocol-level error (credential or event decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A credential-storage error (read, write, clear).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A realtime-channel error (connect, transport).
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// A session-transition error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A REST call error (transport, 401, other status).
    #[error(transparent)]
    Api(#[from] ApiError),
}
