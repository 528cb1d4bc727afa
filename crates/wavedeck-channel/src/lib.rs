//! The authenticated realtime push channel.
//!
//! One persistent duplex connection per session, authenticated with the
//! same bearer credential as the REST client, used exclusively for
//! server-to-client notifications. Admin actions never travel this way.
//!
//! # How it fits in the stack
//!
//! ```text
//! Session layer (above)   ← owns the channel, reacts to kicked/disconnect
//!     ↕
//! Channel layer (this crate)  ← connects, decodes frames, fans out events
//!     ↕
//! Protocol layer (below)  ← PushEvent / ChannelEvent / Credential types
//! ```
//!
//! The transport is abstracted behind the [`PushTransport`] /
//! [`PushConnection`] traits so the channel logic (subscriptions,
//! reconnect, disconnect classification) is testable without a network:
//!
//! - [`WebSocketTransport`] — production, via `tokio-tungstenite`
//!   (`websocket` feature, on by default)
//! - [`MemoryTransport`] — loopback pair for tests and local development
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod channel;
mod error;
mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use channel::{RealtimeChannel, SubscriptionId};
pub use error::ChannelError;
pub use memory::{MemoryPeer, MemoryRemote, MemoryTransport};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketPushConnection, WebSocketTransport};

use std::time::Duration;

use wavedeck_protocol::Credential;

/// Establishes authenticated connections to the realtime endpoint.
///
/// The credential is connection-time auth context: it travels with the
/// handshake, and a reconnect after a transient failure presents the
/// same credential again.
pub trait PushTransport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Conn: PushConnection;

    /// Opens a new connection authenticated as `credential`.
    fn connect(
        &self,
        credential: &Credential,
    ) -> impl std::future::Future<Output = Result<Self::Conn, ChannelError>> + Send;
}

/// A single established push connection.
///
/// The `recv` contract carries the disconnect classification the session
/// layer depends on:
///
/// - `Ok(Some(frame))` — one event frame, in backend send order
/// - `Ok(None)` — the server deliberately closed the connection
///   (forced-logout edge)
/// - `Err(_)` — the transport failed (transient edge; the channel
///   reconnects)
pub trait PushConnection: Send + 'static {
    /// Receives the next event frame from the backend.
    fn recv(
        &mut self,
    ) -> impl std::future::Future<Output = Result<Option<String>, ChannelError>> + Send;

    /// Closes the connection from the client side.
    ///
    /// Best-effort: the connection is considered gone regardless of
    /// whether the close handshake completes.
    fn close(&mut self) -> impl std::future::Future<Output = ()> + Send;
}

/// Configuration for channel reconnect behavior.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// First reconnect delay after a transient failure. Doubles on each
    /// consecutive failure.
    ///
    /// Default: 1 second. Tests shrink this to keep themselves fast.
    pub reconnect_base: Duration,

    /// Upper bound on the reconnect delay.
    ///
    /// Default: 30 seconds.
    pub reconnect_max: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            reconnect_base: Duration::from_secs(1),
            reconnect_max: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_config_default_values() {
        let config = ChannelConfig::default();
        assert_eq!(config.reconnect_base, Duration::from_secs(1));
        assert_eq!(config.reconnect_max, Duration::from_secs(30));
    }
}
