//! Headless admin console: logs in (or resumes a persisted session),
//! mounts the three data views on the realtime channel, and logs a line
//! every time a push refreshes one of them.
//!
//! Configuration is environment-driven:
//!
//! - `WAVEDECK_API_URL`   (default `http://127.0.0.1:3001`)
//! - `WAVEDECK_WS_URL`    (default `ws://127.0.0.1:3001/realtime`)
//! - `WAVEDECK_STATE_DIR` (default `.wavedeck`) — credential persistence
//! - `WAVEDECK_USER` / `WAVEDECK_PASS` — required when no session can be
//!   resumed
//! - `RUST_LOG` — log filter (default `info`)

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use wavedeck::prelude::*;

/// Exits the console when the session ends underneath it — the closest
/// a headless process gets to "navigate to the login screen".
struct ExitNavigator {
    ended: tokio::sync::mpsc::UnboundedSender<()>,
}

impl Navigator for ExitNavigator {
    fn to_login(&self) {
        let _ = self.ended.send(());
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let api_url = env_or("WAVEDECK_API_URL", "http://127.0.0.1:3001");
    let ws_url = env_or("WAVEDECK_WS_URL", "ws://127.0.0.1:3001/realtime");
    let state_dir = env_or("WAVEDECK_STATE_DIR", ".wavedeck");

    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&state_dir)?);
    let api = AdminApi::new(api_url, Arc::clone(&store));
    let transport = Arc::new(WebSocketTransport::new(ws_url));

    let (ended_tx, mut ended_rx) = tokio::sync::mpsc::unbounded_channel();
    let session = SessionController::new(
        store,
        transport,
        Arc::new(ExitNavigator { ended: ended_tx }),
    );

    // A rejected credential ends the session exactly like a kick.
    let hook_session = session.clone();
    api.set_unauthorized_hook(move || {
        let session = hook_session.clone();
        tokio::spawn(async move { session.end_session().await });
    });

    if session.restore().await {
        tracing::info!("resumed persisted session");
    } else {
        let username = std::env::var("WAVEDECK_USER")
            .map_err(|_| "set WAVEDECK_USER to log in")?;
        let password = std::env::var("WAVEDECK_PASS")
            .map_err(|_| "set WAVEDECK_PASS to log in")?;
        let token = api.login(&username, &password).await?;
        session.login(token).await?;
        tracing::info!("logged in as {username}");
    }

    let channel = session
        .channel()
        .await
        .ok_or("session has no realtime channel")?;

    let stats = StatsView::new(api.clone());
    let users = UsersView::new(api.clone());
    let bets = BetsView::new(api.clone());
    stats.mount(&channel);
    users.mount(&channel);
    bets.mount(&channel);

    stats.refresh().await?;
    users.refresh().await?;
    bets.refresh().await?;

    if let Some(totals) = stats.totals() {
        tracing::info!(
            users = totals.total_users,
            bets = totals.total_bets,
            volume = totals.total_volume,
            "platform totals"
        );
    }
    if let Some(roster) = users.current() {
        tracing::info!(count = roster.len(), "user roster loaded");
    }
    if let Some(feed) = bets.current() {
        tracing::info!(count = feed.len(), "bets feed loaded");
    }

    tracing::info!("watching for pushes, ctrl-c to log out");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            session.logout().await?;
            tracing::info!("logged out");
        }
        _ = ended_rx.recv() => {
            tracing::info!("session ended by the backend");
        }
    }
    Ok(())
}
