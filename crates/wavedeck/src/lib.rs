//! # Wavedeck
//!
//! Client SDK for the Wavedeck admin console: one authenticated session,
//! one realtime push channel, and REST-backed view caches that stay
//! fresh by refetching on push.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wavedeck::prelude::*;
//!
//! # async fn run() -> Result<(), wavedeck::WavedeckError> {
//! let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new("/var/lib/wavedeck")?);
//! let api = AdminApi::new("https://backend.example", Arc::clone(&store));
//! let transport = Arc::new(WebSocketTransport::new("wss://backend.example/realtime"));
//! let session = SessionController::new(store, transport, Arc::new(NoopNavigator));
//!
//! // End the session on a rejected credential, same as a kick.
//! let hook_session = session.clone();
//! api.set_unauthorized_hook(move || {
//!     let session = hook_session.clone();
//!     tokio::spawn(async move { session.end_session().await });
//! });
//!
//! let token = api.login("admin", "secret").await?;
//! session.login(token).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod views;

pub use error::WavedeckError;
pub use views::{BetsView, StatsView, UsersView, ViewCache};

pub use wavedeck_api as api;
pub use wavedeck_channel as channel;
pub use wavedeck_protocol as protocol;
pub use wavedeck_session as session;
pub use wavedeck_store as store;

/// The types most embedders need, in one import.
pub mod prelude {
    pub use crate::{BetsView, StatsView, UsersView, ViewCache, WavedeckError};
    pub use wavedeck_api::{AdminApi, ApiError};
    pub use wavedeck_channel::{
        ChannelConfig, MemoryTransport, PushConnection, PushTransport,
        RealtimeChannel, SubscriptionId,
    };
    #[cfg(feature = "websocket")]
    pub use wavedeck_channel::WebSocketTransport;
    pub use wavedeck_protocol::{
        AdminStats, AdminUser, AnalyticsPoint, BetRecord, BetResult,
        ChannelEvent, Credential, DisconnectReason, EventKind, PushEvent,
        UserId,
    };
    pub use wavedeck_session::{
        Navigator, NoopNavigator, SessionController, SessionError,
    };
    pub use wavedeck_store::{
        FileTokenStore, MemoryTokenStore, TokenStore,
    };
}
