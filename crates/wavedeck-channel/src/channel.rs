//! The realtime channel: subscriptions, fan-out dispatch, and the reader
//! task with reconnect.
//!
//! # Lifecycle
//!
//! ```text
//! new() ──→ [disconnected] ──connect()──→ [reading]
//!                                            │
//!                    transient failure ──────┤ reconnect (backoff, same
//!                                            │ credential)
//!                    server close ───────────┤ dispatch Disconnected
//!                                            │ (ServerInitiated), stop
//!                    disconnect() ───────────┴ silent stop
//! ```
//!
//! A handle is single-use: once stopped (either way) it never reconnects.
//! The session controller creates a fresh channel per login.
//!
//! # Concurrency note
//!
//! Handlers run on the reader task, synchronously, in arrival order. A
//! handler must not block and must not await the channel's own
//! `disconnect` — forward to another task for anything heavier than a
//! cache poke or a message send. The session controller does exactly
//! that with its control-event task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use wavedeck_protocol::{
    decode_push_frame, ChannelEvent, Credential, DisconnectReason, EventKind,
};

use crate::{ChannelConfig, PushConnection, PushTransport};

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// Handle returned by `subscribe`, used to unsubscribe.
///
/// Closures can't be compared, so deregistration goes by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&ChannelEvent) + Send + Sync>;

/// The fan-out registry shared between the handle and the reader task.
struct Registry {
    subs: Mutex<HashMap<EventKind, Vec<(SubscriptionId, Handler)>>>,
    next_id: AtomicU64,
}

impl Registry {
    fn new() -> Self {
        Self {
            subs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn subscribe(&self, kind: EventKind, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut subs = self.subs.lock().unwrap_or_else(|e| e.into_inner());
        subs.entry(kind).or_default().push((id, handler));
        id
    }

    fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut subs = self.subs.lock().unwrap_or_else(|e| e.into_inner());
        match subs.get_mut(&kind) {
            Some(handlers) => {
                let before = handlers.len();
                handlers.retain(|(sub_id, _)| *sub_id != id);
                before != handlers.len()
            }
            None => false,
        }
    }

    /// Invokes every handler registered for this event's kind.
    ///
    /// Handlers are cloned out before invocation so a handler can
    /// subscribe/unsubscribe without deadlocking the registry lock.
    fn dispatch(&self, event: &ChannelEvent) {
        let handlers: Vec<Handler> = {
            let subs = self.subs.lock().unwrap_or_else(|e| e.into_inner());
            subs.get(&event.kind())
                .map(|list| {
                    list.iter().map(|(_, h)| Arc::clone(h)).collect()
                })
                .unwrap_or_default()
        };
        for handler in handlers {
            handler(event);
        }
    }
}

// ---------------------------------------------------------------------------
// RealtimeChannel
// ---------------------------------------------------------------------------

/// One authenticated push channel.
///
/// Created in a disconnected state; the owner calls [`connect`] to start
/// the reader task and [`disconnect`] to stop it. At most one lives per
/// session — enforced by the session controller, which is the only
/// component allowed to create or tear one down.
///
/// [`connect`]: RealtimeChannel::connect
/// [`disconnect`]: RealtimeChannel::disconnect
pub struct RealtimeChannel<T: PushTransport> {
    transport: Arc<T>,
    credential: Credential,
    config: ChannelConfig,
    registry: Arc<Registry>,
    connected: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl<T: PushTransport> RealtimeChannel<T> {
    /// Creates a disconnected channel bound to `credential`.
    pub fn new(transport: Arc<T>, credential: Credential) -> Self {
        Self::with_config(transport, credential, ChannelConfig::default())
    }

    /// Same as [`new`](Self::new) with explicit reconnect tuning.
    pub fn with_config(
        transport: Arc<T>,
        credential: Credential,
        config: ChannelConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            transport,
            credential,
            config,
            registry: Arc::new(Registry::new()),
            connected: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            reader: Mutex::new(None),
        }
    }

    /// Registers `handler` for events of `kind`.
    ///
    /// All handlers for a kind are invoked once per event (fan-out), in
    /// arrival order per event; ordering across handlers of the same
    /// event is unspecified.
    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: impl Fn(&ChannelEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.registry.subscribe(kind, Arc::new(handler))
    }

    /// Deregisters a handler. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        self.registry.unsubscribe(kind, id)
    }

    /// Starts the reader task. No-op if already started or stopped.
    pub fn connect(&self) {
        let mut reader = self.reader.lock().unwrap_or_else(|e| e.into_inner());
        if reader.is_some() || self.stopped.load(Ordering::SeqCst) {
            return;
        }

        let task = ReaderTask {
            transport: Arc::clone(&self.transport),
            credential: self.credential.clone(),
            config: self.config.clone(),
            registry: Arc::clone(&self.registry),
            connected: Arc::clone(&self.connected),
            shutdown: self.shutdown_tx.subscribe(),
        };
        *reader = Some(tokio::spawn(task.run()));
    }

    /// Client-initiated close: stops the reader and releases the
    /// connection without emitting any `Disconnected` event — tearing
    /// down our own channel is not a failure.
    ///
    /// Idempotent, and awaits the reader so that when this returns the
    /// connection is really gone.
    pub async fn disconnect(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(true);

        let handle = {
            let mut reader =
                self.reader.lock().unwrap_or_else(|e| e.into_inner());
            reader.take()
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Returns `true` while the reader holds an established connection.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Returns `true` once the channel has been stopped for good
    /// (client disconnect or server-initiated close).
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// The credential this channel authenticates with.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

// ---------------------------------------------------------------------------
// Reader task
// ---------------------------------------------------------------------------

/// Everything the reader task owns, detached from the handle so the task
/// outlives borrows of `RealtimeChannel`.
struct ReaderTask<T: PushTransport> {
    transport: Arc<T>,
    credential: Credential,
    config: ChannelConfig,
    registry: Arc<Registry>,
    connected: Arc<AtomicBool>,
    shutdown: watch::Receiver<bool>,
}

/// Why one established connection ended.
enum ReadOutcome {
    /// `disconnect()` was called.
    Shutdown,
    /// The server sent a close frame.
    ServerClosed,
    /// The transport dropped without a close frame.
    TransportLost,
}

impl<T: PushTransport> ReaderTask<T> {
    async fn run(mut self) {
        let mut failures: u32 = 0;

        loop {
            if *self.shutdown.borrow() {
                return;
            }

            // Connect, racing against shutdown so disconnect() never
            // waits on a slow handshake.
            let mut conn = tokio::select! {
                _ = self.shutdown.changed() => return,
                result = self.transport.connect(&self.credential) => {
                    match result {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!(error = %e, "realtime connect failed");
                            if !self.backoff(&mut failures).await {
                                return;
                            }
                            continue;
                        }
                    }
                }
            };

            failures = 0;
            self.connected.store(true, Ordering::SeqCst);
            tracing::info!("realtime channel connected");

            let outcome = self.read_until_closed(&mut conn).await;
            self.connected.store(false, Ordering::SeqCst);

            match outcome {
                ReadOutcome::Shutdown => {
                    conn.close().await;
                    return;
                }
                ReadOutcome::ServerClosed => {
                    tracing::info!("realtime channel closed by server");
                    self.registry.dispatch(&ChannelEvent::Disconnected(
                        DisconnectReason::ServerInitiated,
                    ));
                    // Server-initiated close means the session is being
                    // ended; reconnecting here would race the logout.
                    return;
                }
                ReadOutcome::TransportLost => {
                    tracing::debug!("realtime transport lost, will reconnect");
                    self.registry.dispatch(&ChannelEvent::Disconnected(
                        DisconnectReason::Transient,
                    ));
                    if !self.backoff(&mut failures).await {
                        return;
                    }
                }
            }
        }
    }

    /// Reads and dispatches frames until the connection ends.
    async fn read_until_closed(
        &mut self,
        conn: &mut T::Conn,
    ) -> ReadOutcome {
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => return ReadOutcome::Shutdown,
                result = conn.recv() => match result {
                    Ok(Some(frame)) => match decode_push_frame(&frame) {
                        Ok(event) => {
                            tracing::trace!(kind = %event.kind(), "push event");
                            self.registry
                                .dispatch(&ChannelEvent::Push(event));
                        }
                        Err(e) => {
                            // A bad frame is the backend's bug, not a
                            // reason to drop a healthy connection.
                            tracing::warn!(
                                error = %e,
                                "dropping undecodable push frame"
                            );
                        }
                    },
                    Ok(None) => return ReadOutcome::ServerClosed,
                    Err(e) => {
                        tracing::debug!(error = %e, "recv failed");
                        return ReadOutcome::TransportLost;
                    }
                },
            }
        }
    }

    /// Sleeps the jittered exponential backoff for the current failure
    /// streak. Returns `false` if shutdown arrived during the sleep.
    async fn backoff(&mut self, failures: &mut u32) -> bool {
        let exp = self
            .config
            .reconnect_base
            .saturating_mul(1u32 << (*failures).min(16))
            .min(self.config.reconnect_max);
        // Jitter keeps a fleet of consoles from reconnecting in lockstep
        // after a backend restart.
        let jitter_ms = (exp.as_millis() / 4).max(1) as u64;
        let delay =
            exp + Duration::from_millis(rand::rng().random_range(0..jitter_ms));
        *failures = failures.saturating_add(1);

        tokio::select! {
            _ = self.shutdown.changed() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
