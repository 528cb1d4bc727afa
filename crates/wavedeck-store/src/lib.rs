//! Durable credential storage for Wavedeck.
//!
//! The admin console keeps exactly one credential in exactly one slot —
//! the Rust analog of the browser's `localStorage` key. This crate
//! defines the [`TokenStore`] trait plus two implementations:
//!
//! 1. **[`MemoryTokenStore`]** — process-local, gone on exit. Used by
//!    tests and by callers that explicitly don't want persistence.
//! 2. **[`FileTokenStore`]** — a single file on disk, written atomically.
//!    Survives process restart, which is what lets the session controller
//!    resume an authenticated session on startup.
//!
//! # Ownership
//!
//! Only the session controller mutates the store. The HTTP client reads
//! it (immediately before each request) and clears it on a 401 — the one
//! sanctioned exception, because 401 handling must work even when the
//! session controller hasn't run yet.

mod error;
mod file;
mod memory;

pub use error::StoreError;
pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

use wavedeck_protocol::Credential;

/// The canonical name of the single credential slot.
///
/// Earlier revisions of the console disagreed on the storage key
/// (`token` vs `adminToken`); there is exactly one now.
pub const CREDENTIAL_SLOT: &str = "admin_token";

/// A durable slot holding at most one [`Credential`].
///
/// Object-safe and synchronous: every backend here is a cheap local
/// read/write, so the async layers call it directly without blocking
/// concerns. Implementations must be safe to call from concurrent tasks.
pub trait TokenStore: Send + Sync + 'static {
    /// Reads the stored credential, if any.
    ///
    /// # Errors
    /// Returns [`StoreError`] only for real storage failures. An empty
    /// slot is `Ok(None)`, not an error.
    fn load(&self) -> Result<Option<Credential>, StoreError>;

    /// Replaces the slot's contents with `credential`.
    ///
    /// The replacement must be all-or-nothing: a reader never observes a
    /// half-written token.
    ///
    /// # Errors
    /// Returns [`StoreError`] if the new value could not be persisted.
    fn save(&self, credential: &Credential) -> Result<(), StoreError>;

    /// Empties the slot. Idempotent — clearing an empty slot succeeds.
    ///
    /// # Errors
    /// Returns [`StoreError`] only for real storage failures.
    fn clear(&self) -> Result<(), StoreError>;
}
