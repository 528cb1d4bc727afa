//! In-memory loopback transport.
//!
//! [`MemoryTransport::pair`] returns the client-side transport plus a
//! [`MemoryRemote`] that plays the backend: it observes connection
//! attempts (including the credential each presented), pushes event
//! frames, and ends connections either politely (close frame) or rudely
//! (severed link) to exercise both disconnect classes.
//!
//! The session and channel test suites are built on this; it also works
//! as a stub backend for local development.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use wavedeck_protocol::{Credential, PushEvent};

use crate::{ChannelError, PushConnection, PushTransport};

/// What travels from the fake backend to a client connection.
enum PeerFrame {
    /// One event frame, as it would arrive on the wire.
    Text(String),
    /// A deliberate server-side close.
    Close,
}

// ---------------------------------------------------------------------------
// Transport (client side)
// ---------------------------------------------------------------------------

/// The client half of a loopback pair.
pub struct MemoryTransport {
    announce: mpsc::UnboundedSender<MemoryPeer>,
}

impl MemoryTransport {
    /// Creates a connected transport/remote pair.
    pub fn pair() -> (Self, MemoryRemote) {
        let (announce, accepted) = mpsc::unbounded_channel();
        (
            Self { announce },
            MemoryRemote {
                accepted: tokio::sync::Mutex::new(accepted),
            },
        )
    }
}

impl PushTransport for MemoryTransport {
    type Conn = MemoryConnection;

    async fn connect(
        &self,
        credential: &Credential,
    ) -> Result<Self::Conn, ChannelError> {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let client_closed = Arc::new(AtomicBool::new(false));

        let peer = MemoryPeer {
            credential: credential.clone(),
            frame_tx: Mutex::new(Some(frame_tx)),
            client_closed: Arc::clone(&client_closed),
        };
        self.announce.send(peer).map_err(|_| {
            ChannelError::ConnectFailed("remote endpoint is gone".into())
        })?;

        Ok(MemoryConnection {
            frames: frame_rx,
            closed: client_closed,
        })
    }
}

/// The connection handed to the channel's reader task.
pub struct MemoryConnection {
    frames: mpsc::UnboundedReceiver<PeerFrame>,
    closed: Arc<AtomicBool>,
}

impl PushConnection for MemoryConnection {
    async fn recv(&mut self) -> Result<Option<String>, ChannelError> {
        match self.frames.recv().await {
            Some(PeerFrame::Text(frame)) => Ok(Some(frame)),
            // Polite server close — the forced-logout edge.
            Some(PeerFrame::Close) => Ok(None),
            // Sender gone without a close frame — the transient edge.
            None => Err(ChannelError::Transport("peer link severed".into())),
        }
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.frames.close();
    }
}

// ---------------------------------------------------------------------------
// Remote (fake backend side)
// ---------------------------------------------------------------------------

/// The backend half of a loopback pair.
pub struct MemoryRemote {
    accepted: tokio::sync::Mutex<mpsc::UnboundedReceiver<MemoryPeer>>,
}

impl MemoryRemote {
    /// Waits for the next connection attempt.
    ///
    /// Returns `None` once the client transport is dropped.
    pub async fn next_connection(&self) -> Option<MemoryPeer> {
        self.accepted.lock().await.recv().await
    }
}

/// The backend's handle on one accepted connection.
pub struct MemoryPeer {
    credential: Credential,
    frame_tx: Mutex<Option<mpsc::UnboundedSender<PeerFrame>>>,
    client_closed: Arc<AtomicBool>,
}

impl MemoryPeer {
    /// The credential the client presented at connect time.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Pushes one event to the client.
    pub fn push(&self, event: &PushEvent) {
        let frame = serde_json::to_string(event)
            .expect("push events always serialize");
        self.push_raw(frame);
    }

    /// Pushes a raw frame, valid or not — tests use this for malformed
    /// input.
    pub fn push_raw(&self, frame: impl Into<String>) {
        let guard =
            self.frame_tx.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = guard.as_ref() {
            // A frame to a disappeared client is dropped, like on a real
            // socket.
            let _ = tx.send(PeerFrame::Text(frame.into()));
        }
    }

    /// Ends the connection the polite way: the client observes a
    /// server-initiated close.
    pub fn close(&self) {
        let guard =
            self.frame_tx.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send(PeerFrame::Close);
        }
    }

    /// Ends the connection the rude way: the link just dies, and the
    /// client observes a transport failure.
    pub fn sever(&self) {
        let mut guard =
            self.frame_tx.lock().unwrap_or_else(|e| e.into_inner());
        guard.take();
    }

    /// Returns `true` once the client has closed its side.
    pub fn is_client_closed(&self) -> bool {
        self.client_closed.load(Ordering::SeqCst)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cred() -> Credential {
        Credential::new("h.p.s")
    }

    #[tokio::test]
    async fn test_connect_announces_peer_with_credential() {
        let (transport, remote) = MemoryTransport::pair();

        let _conn = transport.connect(&cred()).await.unwrap();
        let peer = remote.next_connection().await.unwrap();

        assert_eq!(peer.credential(), &cred());
    }

    #[tokio::test]
    async fn test_pushed_frames_arrive_in_order() {
        let (transport, remote) = MemoryTransport::pair();
        let mut conn = transport.connect(&cred()).await.unwrap();
        let peer = remote.next_connection().await.unwrap();

        peer.push_raw("one");
        peer.push_raw("two");

        assert_eq!(conn.recv().await.unwrap(), Some("one".into()));
        assert_eq!(conn.recv().await.unwrap(), Some("two".into()));
    }

    #[tokio::test]
    async fn test_server_close_yields_clean_end_of_stream() {
        let (transport, remote) = MemoryTransport::pair();
        let mut conn = transport.connect(&cred()).await.unwrap();
        let peer = remote.next_connection().await.unwrap();

        peer.close();

        assert!(matches!(conn.recv().await, Ok(None)));
    }

    #[tokio::test]
    async fn test_severed_link_yields_transport_error() {
        let (transport, remote) = MemoryTransport::pair();
        let mut conn = transport.connect(&cred()).await.unwrap();
        let peer = remote.next_connection().await.unwrap();

        peer.sever();

        assert!(matches!(
            conn.recv().await,
            Err(ChannelError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_client_close_is_visible_to_peer() {
        let (transport, remote) = MemoryTransport::pair();
        let mut conn = transport.connect(&cred()).await.unwrap();
        let peer = remote.next_connection().await.unwrap();

        assert!(!peer.is_client_closed());
        conn.close().await;
        assert!(peer.is_client_closed());
    }

    #[tokio::test]
    async fn test_connect_after_remote_dropped_fails() {
        let (transport, remote) = MemoryTransport::pair();
        drop(remote);

        assert!(matches!(
            transport.connect(&cred()).await,
            Err(ChannelError::ConnectFailed(_))
        ));
    }
}
