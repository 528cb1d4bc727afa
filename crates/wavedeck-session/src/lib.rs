//! Admin session lifecycle for Wavedeck.
//!
//! This crate owns the one question every other component asks — "is the
//! admin logged in?" — and the invariant that goes with it: the realtime
//! channel is connected **iff** the session is authenticated.
//!
//! 1. **Lifecycle** — `login` / `logout` / `restore` on the
//!    [`SessionController`]
//! 2. **Forced logout** — the `kicked` push and server-initiated
//!    disconnects both funnel into one idempotent `end_session`
//! 3. **Redirect hook** — the [`Navigator`] trait, implemented by the
//!    embedding app
//!
//! # How it fits in the stack
//!
//! ```text
//! Views / HTTP client (above)  ← read authentication state, never mutate it
//!     ↕
//! Session layer (this crate)   ← sole owner of credential + channel handle
//!     ↕
//! Channel + store (below)      ← push transport, durable credential slot
//! ```

mod controller;
mod error;
mod navigator;

pub use controller::SessionController;
pub use error::SessionError;
pub use navigator::{Navigator, NoopNavigator};
