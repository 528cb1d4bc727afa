//! The session controller: single source of truth for authentication
//! state.
//!
//! # Lifecycle
//!
//! ```text
//! restore() ──┬─ no / malformed / expired credential ──→ [Unauthenticated]
//!             └─ valid credential ─────────────┐
//!                                              ▼
//! login(credential) ─────────────────────→ [Authenticated]
//!                                              │   channel connected
//!         kicked / server disconnect / 401 ────┤
//!         logout() ────────────────────────────┴──→ [Unauthenticated]
//!                                                    channel torn down
//! ```
//!
//! Authentication state is derived, never stored: the session is
//! authenticated iff the durable slot holds a credential whose expiry is
//! in the future. The controller is the only component that mutates the
//! slot or the channel handle; everything else reads.
//!
//! # Concurrency note
//!
//! Every transition runs under one async mutex (the channel slot), so a
//! login that races another login, a logout, or a forced logout always
//! operates on the state as it is *after* the previous transition — not
//! on a snapshot captured before an await gap. Whichever transition
//! acquires the lock last wins wholesale; there is no state where two
//! credentials or two channels are live.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, Mutex};

use wavedeck_channel::{
    ChannelConfig, PushTransport, RealtimeChannel,
};
use wavedeck_protocol::{ChannelEvent, Credential, EventKind, PushEvent};
use wavedeck_store::TokenStore;

use crate::{Navigator, SessionError};

/// A forced-logout edge observed on the channel, tagged with the epoch
/// of the channel that produced it so signals from an already-replaced
/// channel can be ignored.
struct ControlSignal {
    epoch: u64,
    cause: ForcedLogout,
}

enum ForcedLogout {
    /// The backend pushed `kicked`.
    Kicked,
    /// The backend deliberately closed the channel.
    ServerDisconnect,
}

/// Owns the credential slot and the realtime channel handle.
///
/// Cheap to clone; clones share state. Construct one at application
/// start and inject it wherever authentication state is needed.
pub struct SessionController<T: PushTransport> {
    inner: Arc<SessionInner<T>>,
}

impl<T: PushTransport> Clone for SessionController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SessionInner<T: PushTransport> {
    store: Arc<dyn TokenStore>,
    transport: Arc<T>,
    navigator: Arc<dyn Navigator>,
    channel_config: ChannelConfig,

    /// The single channel handle; `None` iff unauthenticated.
    /// Doubles as the transition lock — see the module docs.
    channel: Mutex<Option<Arc<RealtimeChannel<T>>>>,

    /// Epoch of the currently installed channel (0 = none). Control
    /// signals from older epochs are stale and dropped.
    current_epoch: AtomicU64,
    next_epoch: AtomicU64,

    control_tx: mpsc::UnboundedSender<ControlSignal>,
}

impl<T: PushTransport> SessionController<T> {
    /// Creates a controller in the unauthenticated state.
    ///
    /// Call [`restore`](Self::restore) right after construction to
    /// resume a persisted session.
    ///
    /// # Panics
    /// Spawns the forced-logout control task at construction, so this
    /// must be called from within a tokio runtime.
    pub fn new(
        store: Arc<dyn TokenStore>,
        transport: Arc<T>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self::with_config(store, transport, navigator, ChannelConfig::default())
    }

    /// Same as [`new`](Self::new) with explicit channel tuning; the
    /// runtime requirement applies here too.
    pub fn with_config(
        store: Arc<dyn TokenStore>,
        transport: Arc<T>,
        navigator: Arc<dyn Navigator>,
        channel_config: ChannelConfig,
    ) -> Self {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(SessionInner {
            store,
            transport,
            navigator,
            channel_config,
            channel: Mutex::new(None),
            current_epoch: AtomicU64::new(0),
            next_epoch: AtomicU64::new(1),
            control_tx,
        });
        spawn_control_task(Arc::downgrade(&inner), control_rx);
        Self { inner }
    }

    /// Resumes a persisted session, if one exists and is still valid.
    ///
    /// - no stored credential → stays unauthenticated
    /// - malformed credential → fails closed: slot cleared, no error
    ///   surfaced
    /// - expired credential → behaves as [`logout`](Self::logout)
    /// - valid credential → behaves as [`login`](Self::login) without
    ///   re-persisting
    ///
    /// Returns `true` if a session was resumed. No realtime connection
    /// is ever attempted for an invalid credential.
    pub async fn restore(&self) -> bool {
        let credential = match self.inner.store.load() {
            Ok(Some(credential)) => credential,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "credential slot unreadable");
                return false;
            }
        };

        match credential.claims() {
            Ok(claims) if !claims.is_expired() => {
                tracing::info!("resuming persisted admin session");
                let mut channel = self.inner.channel.lock().await;
                self.replace_channel(&mut channel, credential).await;
                true
            }
            Ok(_) => {
                tracing::info!("stored credential expired, logging out");
                if let Err(e) = self.logout().await {
                    tracing::warn!(error = %e, "failed to clear expired credential");
                }
                false
            }
            Err(e) => {
                // Malformed token: treated as "no valid session", never
                // surfaced as an error to the user.
                tracing::warn!(error = %e, "stored credential malformed");
                if let Err(e) = self.inner.store.clear() {
                    tracing::warn!(error = %e, "failed to clear malformed credential");
                }
                false
            }
        }
    }

    /// Persists `credential` and brings the realtime channel up with it.
    ///
    /// Any previous channel is torn down first; after this returns there
    /// is exactly one stored credential and one channel handle, both the
    /// new one. Semantic validity of the credential is the backend's
    /// concern, discovered lazily on the first rejected request.
    ///
    /// # Errors
    /// Returns [`SessionError::Store`] if the credential could not be
    /// persisted; the previous session, if any, is left untouched.
    pub async fn login(
        &self,
        credential: Credential,
    ) -> Result<(), SessionError> {
        let mut channel = self.inner.channel.lock().await;
        self.inner.store.save(&credential)?;
        self.replace_channel(&mut channel, credential).await;
        tracing::info!("admin logged in");
        Ok(())
    }

    /// Clears the credential and tears down the channel. Idempotent.
    ///
    /// # Errors
    /// Returns [`SessionError::Store`] if the slot could not be cleared.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let mut channel = self.inner.channel.lock().await;
        self.inner.current_epoch.store(0, Ordering::SeqCst);
        self.inner.store.clear()?;
        if let Some(old) = channel.take() {
            old.disconnect().await;
            tracing::info!("admin logged out");
        }
        Ok(())
    }

    /// The single session-ending transition: logout plus redirect.
    ///
    /// Every forced-logout edge — `kicked`, server-initiated disconnect,
    /// and the HTTP client's 401 hook — funnels here, so the transition
    /// happens once no matter how many edges fire.
    pub async fn end_session(&self) {
        if let Err(e) = self.logout().await {
            tracing::warn!(error = %e, "logout during forced session end failed");
        }
        self.inner.navigator.to_login();
    }

    /// Derived authentication state: a stored credential with a future
    /// expiry. Malformed or absent credentials read as unauthenticated.
    pub fn is_authenticated(&self) -> bool {
        match self.inner.store.load() {
            Ok(Some(credential)) => credential
                .claims()
                .map(|claims| !claims.is_expired())
                .unwrap_or(false),
            _ => false,
        }
    }

    /// The current channel handle, for subscribing view caches.
    ///
    /// `None` whenever the session is unauthenticated.
    pub async fn channel(&self) -> Option<Arc<RealtimeChannel<T>>> {
        self.inner.channel.lock().await.clone()
    }

    /// Installs a fresh channel for `credential` under the held lock and
    /// connects it, tearing down any previous occupant first.
    async fn replace_channel(
        &self,
        slot: &mut Option<Arc<RealtimeChannel<T>>>,
        credential: Credential,
    ) {
        if let Some(old) = slot.take() {
            self.inner.current_epoch.store(0, Ordering::SeqCst);
            old.disconnect().await;
        }

        let epoch = self.inner.next_epoch.fetch_add(1, Ordering::SeqCst);
        let channel = Arc::new(RealtimeChannel::with_config(
            Arc::clone(&self.inner.transport),
            credential,
            self.inner.channel_config.clone(),
        ));

        // Control events go through a queue to a dedicated task: handlers
        // run on the channel's reader task, which must never await its
        // own teardown.
        let tx = self.inner.control_tx.clone();
        channel.subscribe(EventKind::Kicked, move |event| {
            if matches!(event, ChannelEvent::Push(PushEvent::Kicked)) {
                let _ = tx.send(ControlSignal {
                    epoch,
                    cause: ForcedLogout::Kicked,
                });
            }
        });
        let tx = self.inner.control_tx.clone();
        channel.subscribe(EventKind::Disconnected, move |event| {
            if let ChannelEvent::Disconnected(reason) = event {
                if reason.forces_logout() {
                    let _ = tx.send(ControlSignal {
                        epoch,
                        cause: ForcedLogout::ServerDisconnect,
                    });
                } else {
                    tracing::debug!(
                        %reason,
                        "transient channel disconnect, session unaffected"
                    );
                }
            }
        });

        channel.connect();
        self.inner.current_epoch.store(epoch, Ordering::SeqCst);
        *slot = Some(channel);
    }
}

/// Consumes forced-logout signals for as long as the controller lives.
fn spawn_control_task<T: PushTransport>(
    inner: Weak<SessionInner<T>>,
    mut control_rx: mpsc::UnboundedReceiver<ControlSignal>,
) {
    tokio::spawn(async move {
        while let Some(signal) = control_rx.recv().await {
            let Some(inner) = inner.upgrade() else { return };

            // A signal from a channel that has since been replaced or
            // torn down must not end the successor session.
            if inner.current_epoch.load(Ordering::SeqCst) != signal.epoch {
                tracing::debug!("dropping stale forced-logout signal");
                continue;
            }

            match signal.cause {
                ForcedLogout::Kicked => {
                    tracing::info!("kicked by server, ending session");
                }
                ForcedLogout::ServerDisconnect => {
                    tracing::info!(
                        "server closed the realtime channel, ending session"
                    );
                }
            }

            let controller = SessionController { inner };
            controller.end_session().await;
        }
    });
}
