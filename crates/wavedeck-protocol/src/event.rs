//! The closed set of server-to-client push notifications.
//!
//! The backend's realtime endpoint emits named events with JSON payloads.
//! Instead of stringly-typed names and untyped dictionaries, the push
//! protocol is a tagged union decoded once at the channel boundary —
//! subscribers downstream only ever see typed values.
//!
//! The channel is push-only: nothing here originates a command. Admin
//! actions go through the REST client.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{BetRecord, ProtocolError};

// ---------------------------------------------------------------------------
// PushEvent — what the backend sends on the wire
// ---------------------------------------------------------------------------

/// A domain or control event pushed by the backend.
///
/// `#[serde(tag = "event", content = "data")]` matches the wire shape:
///
/// ```json
/// { "event": "bet_placed", "data": { "username": "alice", ... } }
/// { "event": "kicked" }
/// ```
///
/// Payload-less events omit `data` entirely. An unknown `event` tag fails
/// decoding — the union is closed on purpose, so a new backend event is a
/// protocol change here first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    /// Server-initiated forced logout: this admin's session was revoked
    /// (banned, logged out elsewhere, token invalidated).
    Kicked,

    /// The user list changed (registration, ban, unban). Carries no
    /// payload — consumers re-fetch rather than merge.
    UsersUpdated,

    /// A bet was placed. Carries the bet so dashboards can log it, but
    /// the bets view still re-fetches instead of splicing it in.
    BetPlaced(BetRecord),

    /// Aggregate analytics changed. No payload; re-fetch.
    AnalyticsUpdated,
}

impl PushEvent {
    /// The subscription key this event is delivered under.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Kicked => EventKind::Kicked,
            Self::UsersUpdated => EventKind::UsersUpdated,
            Self::BetPlaced(_) => EventKind::BetPlaced,
            Self::AnalyticsUpdated => EventKind::AnalyticsUpdated,
        }
    }
}

/// Decodes one realtime frame into a [`PushEvent`].
///
/// Called exactly once per received frame, at the channel boundary.
///
/// # Errors
/// Returns [`ProtocolError::EventDecode`] for unknown event tags or
/// malformed payloads. The channel drops such frames with a warning; they
/// never reach subscribers.
pub fn decode_push_frame(frame: &str) -> Result<PushEvent, ProtocolError> {
    serde_json::from_str(frame).map_err(ProtocolError::EventDecode)
}

// ---------------------------------------------------------------------------
// DisconnectReason — why the channel went down
// ---------------------------------------------------------------------------

/// Classification of a channel disconnect.
///
/// The distinction is load-bearing: only a server-initiated close forces
/// logout. A transient failure must NOT end the session — the transport
/// reconnects on its own with the same stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server deliberately closed the connection (sent a close
    /// frame). Treated identically to [`PushEvent::Kicked`].
    ServerInitiated,

    /// The transport dropped without a close frame: network blip, read
    /// error, abnormal stream end. The channel will reconnect.
    Transient,
}

impl DisconnectReason {
    /// Returns `true` if this disconnect must end the session.
    pub fn forces_logout(self) -> bool {
        matches!(self, Self::ServerInitiated)
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerInitiated => write!(f, "server-initiated"),
            Self::Transient => write!(f, "transient"),
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelEvent — what subscribers receive
// ---------------------------------------------------------------------------

/// Everything a channel subscriber can observe: decoded pushes plus the
/// channel's own lifecycle edges.
///
/// Lifecycle events share the subscription registry with domain events so
/// the session controller consumes "kicked" and "disconnected" through
/// the same fan-out path as any page consuming "users_updated".
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A decoded push from the backend, in arrival order.
    Push(PushEvent),

    /// The connection went down, with the classification above.
    Disconnected(DisconnectReason),
}

impl ChannelEvent {
    /// The subscription key this event is delivered under.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Push(event) => event.kind(),
            Self::Disconnected(_) => EventKind::Disconnected,
        }
    }
}

// ---------------------------------------------------------------------------
// EventKind — subscription keys
// ---------------------------------------------------------------------------

/// The name a subscriber registers under.
///
/// One key per [`PushEvent`] variant plus the lifecycle key. `Copy + Hash`
/// so the registry can use it directly as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Kicked,
    UsersUpdated,
    BetPlaced,
    AnalyticsUpdated,
    Disconnected,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Kicked => "kicked",
            Self::UsersUpdated => "users_updated",
            Self::BetPlaced => "bet_placed",
            Self::AnalyticsUpdated => "analytics_updated",
            Self::Disconnected => "disconnected",
        };
        write!(f, "{name}")
    }
}

// =========================================================================
// Tests
// =========================================================================
