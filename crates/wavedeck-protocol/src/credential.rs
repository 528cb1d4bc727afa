//! The bearer credential and its embedded claims.
//!
//! The backend issues a compact signed token (`header.claims.signature`)
//! on login. The client never verifies the signature — no secret is
//! available on this side — it only reads the claim set out of the middle
//! segment to do expiry-based soft validation. The backend remains the
//! sole authority on signature validity, enforced through the 401 path in
//! `wavedeck-api`.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// An opaque signed bearer token identifying an admin session.
///
/// Newtype over the raw compact string. The token is opaque to every
/// component except [`decode_claims`]; it travels verbatim into the
/// `Authorization` header and the realtime handshake.
///
/// `#[serde(transparent)]` keeps the JSON representation a plain string,
/// which is what the login endpoint returns and what the durable store
/// persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wraps a raw token string.
    ///
    /// No validation happens here — a syntactically broken token is still
    /// a `Credential`. Semantic checks are lazy: [`Credential::claims`]
    /// for structure and expiry, the backend for everything else.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw compact token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the embedded claim set.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the token is not three segments,
    /// the claim segment is not base64url, or the decoded bytes are not
    /// a valid claim set.
    pub fn claims(&self) -> Result<Claims, ProtocolError> {
        decode_claims(&self.0)
    }
}

impl fmt::Display for Credential {
    /// Redacted — credentials must not leak into logs wholesale.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = self.0.split('.').next().unwrap_or("");
        write!(f, "{head}.<redacted>")
    }
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// The claim set embedded in a [`Credential`].
///
/// Only `exp` is required; everything else the backend puts in the token
/// is carried when present and ignored otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry as unix seconds. After this instant the session is dead
    /// and the credential can never be resurrected.
    pub exp: u64,

    /// The admin this token was issued to, when the backend includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
}

impl Claims {
    /// Returns `true` if the claim expiry is at or before `now` (unix
    /// seconds).
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.exp <= now
    }

    /// Returns `true` if the claim expiry has passed the system clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}

/// Current system time as unix seconds.
///
/// A clock before the epoch is treated as time zero, which makes every
/// credential look unexpired — fails open locally, but the backend's 401
/// path still closes the session.
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decodes the claim set out of a compact three-segment bearer token.
///
/// Pure function: split on `.`, base64url-decode the middle segment,
/// parse it as a [`Claims`] value. Every failure mode is a typed error —
/// a malformed token must fail closed at the session boundary, never
/// panic past it.
///
/// # Errors
/// - [`ProtocolError::MalformedToken`] — not exactly three segments
/// - [`ProtocolError::ClaimEncoding`] — middle segment is not base64url
/// - [`ProtocolError::ClaimShape`] — decoded bytes are not a claim set
pub fn decode_claims(token: &str) -> Result<Claims, ProtocolError> {
    let mut segments = token.split('.');
    let payload = match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(ProtocolError::MalformedToken),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(ProtocolError::ClaimEncoding)?;

    serde_json::from_slice(&bytes).map_err(ProtocolError::ClaimShape)
}

// =========================================================================
// Tests
// =========================================================================
