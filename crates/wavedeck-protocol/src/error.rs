//! Error types for the protocol layer.
//!
//! Each crate in Wavedeck defines its own error enum. When you see a
//! `ProtocolError` you know the problem is a malformed token or frame,
//! not networking or storage.

/// Errors that can occur while decoding credentials or push frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The credential is not a compact three-segment token.
    ///
    /// A well-formed bearer token looks like `header.claims.signature`.
    /// Anything with more or fewer segments fails here, before we even
    /// try to base64-decode it.
    #[error("credential is not a compact 3-segment token")]
    MalformedToken,

    /// The claim segment is not valid base64url.
    #[error("claim segment is not valid base64url: {0}")]
    ClaimEncoding(#[source] base64::DecodeError),

    /// The claim segment decoded, but is not a valid claim set.
    ///
    /// Common causes: not JSON at all, or a JSON value missing the
    /// required `exp` field.
    #[error("claim segment is not a valid claim set: {0}")]
    ClaimShape(#[source] serde_json::Error),

    /// A push frame could not be decoded into a known event.
    ///
    /// The push protocol is a closed union — a frame with an unknown
    /// `event` tag or a malformed payload lands here and is dropped at
    /// the channel boundary rather than reaching subscribers.
    #[error("push frame decode failed: {0}")]
    EventDecode(#[source] serde_json::Error),
}
