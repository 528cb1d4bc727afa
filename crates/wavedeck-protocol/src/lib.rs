//! Wire and data model for Wavedeck.
//!
//! This crate defines the "language" the admin console and the backend
//! speak:
//!
//! - **Credential** ([`Credential`], [`Claims`]) — the bearer token that
//!   identifies an admin session, and the soft (expiry-only) validation
//!   the client is allowed to do on it.
//! - **Push events** ([`PushEvent`], [`ChannelEvent`], [`EventKind`]) —
//!   the closed set of server-to-client notifications, decoded at the
//!   channel boundary so subscribers always see typed values.
//! - **REST payloads** ([`AdminStats`], [`AdminUser`], [`BetRecord`],
//!   [`AnalyticsPoint`], login request/response) — the JSON bodies of the
//!   admin endpoints.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while decoding
//!   either of the above.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about connections, storage, or HTTP.
//! It only converts between bytes/strings and typed values:
//!
//! ```text
//! Channel (frames)  → Protocol (PushEvent)  → Session / views
//! API     (bodies)  → Protocol (payloads)   → views
//! Store   (token)   → Protocol (Claims)     → Session
//! ```

mod credential;
mod error;
mod event;
mod types;

pub use credential::{decode_claims, Claims, Credential};
pub use error::ProtocolError;
pub use event::{
    decode_push_frame, ChannelEvent, DisconnectReason, EventKind, PushEvent,
};
pub use types::{
    AdminStats, AdminUser, AnalyticsPoint, BetRecord, BetResult,
    LoginRequest, LoginResponse, UserId,
};
