//! Integration tests for the session controller over the in-memory
//! transport and store: lifecycle transitions, restore semantics, forced
//! logout, and the login/login race.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use wavedeck_channel::{ChannelConfig, MemoryRemote, MemoryTransport};
use wavedeck_protocol::{Credential, PushEvent};
use wavedeck_session::{Navigator, SessionController};
use wavedeck_store::{MemoryTokenStore, TokenStore};

// -- Helpers --------------------------------------------------------------

/// Builds a structurally valid token whose claims expire at `exp`.
fn token_expiring_at(exp: u64) -> Credential {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#);
    let claims =
        URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp},"sub":"admin"}}"#));
    Credential::new(format!("{header}.{claims}.sig"))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before unix epoch")
        .as_secs()
}

/// A token that stays valid for the life of the test.
fn live_token() -> Credential {
    token_expiring_at(unix_now() + 3600)
}

fn expired_token() -> Credential {
    token_expiring_at(unix_now().saturating_sub(3600))
}

/// A [`Navigator`] that counts redirects.
#[derive(Default)]
struct RecordingNavigator {
    hits: AtomicUsize,
}

impl RecordingNavigator {
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn to_login(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

/// Millisecond-scale reconnect delays so tests don't wait real backoffs.
fn fast_config() -> ChannelConfig {
    ChannelConfig {
        reconnect_base: Duration::from_millis(5),
        reconnect_max: Duration::from_millis(20),
    }
}

struct Harness {
    session: SessionController<MemoryTransport>,
    store: Arc<MemoryTokenStore>,
    navigator: Arc<RecordingNavigator>,
    remote: MemoryRemote,
}

fn harness() -> Harness {
    let (transport, remote) = MemoryTransport::pair();
    let store = Arc::new(MemoryTokenStore::new());
    let navigator = Arc::new(RecordingNavigator::default());
    let session = SessionController::with_config(
        Arc::clone(&store) as Arc<dyn TokenStore>,
        Arc::new(transport),
        Arc::clone(&navigator) as Arc<dyn Navigator>,
        fast_config(),
    );
    Harness {
        session,
        store,
        navigator,
        remote,
    }
}

/// Polls `condition` until it holds or the deadline passes.
async fn eventually(what: &str, condition: impl Fn() -> bool) {
    let deadline = Duration::from_secs(2);
    let start = tokio::time::Instant::now();
    while !condition() {
        assert!(
            start.elapsed() < deadline,
            "timed out waiting for: {what}"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Asserts that no connection attempt reaches the remote within a grace
/// window.
async fn assert_no_connection(remote: &MemoryRemote) {
    let attempt = tokio::time::timeout(
        Duration::from_millis(100),
        remote.next_connection(),
    )
    .await;
    assert!(attempt.is_err(), "no connection should be attempted");
}

// =========================================================================
// Login / logout lifecycle
// =========================================================================

#[tokio::test]
async fn test_login_persists_credential_and_connects_channel() {
    let h = harness();
    let token = live_token();

    assert!(!h.session.is_authenticated());
    h.session.login(token.clone()).await.unwrap();

    assert!(h.session.is_authenticated());
    assert_eq!(h.store.load().unwrap(), Some(token.clone()));

    let peer = h.remote.next_connection().await.unwrap();
    assert_eq!(peer.credential(), &token);
    assert!(h.session.channel().await.is_some());
}

#[tokio::test]
async fn test_logout_clears_credential_and_tears_down_channel() {
    let h = harness();
    h.session.login(live_token()).await.unwrap();
    let peer = h.remote.next_connection().await.unwrap();

    h.session.logout().await.unwrap();

    assert!(!h.session.is_authenticated());
    assert_eq!(h.store.load().unwrap(), None);
    assert!(h.session.channel().await.is_none());
    assert!(peer.is_client_closed());
    // Voluntary logout does not redirect; the caller decides where to go.
    assert_eq!(h.navigator.hits(), 0);
}

#[tokio::test]
async fn test_logout_twice_is_idempotent() {
    let h = harness();
    h.session.login(live_token()).await.unwrap();
    let _peer = h.remote.next_connection().await.unwrap();

    h.session.logout().await.unwrap();
    h.session.logout().await.unwrap();

    assert!(!h.session.is_authenticated());
    assert_eq!(h.store.load().unwrap(), None);
}

#[tokio::test]
async fn test_logout_without_login_succeeds() {
    let h = harness();

    h.session.logout().await.unwrap();

    assert!(!h.session.is_authenticated());
    assert!(h.session.channel().await.is_none());
}

#[tokio::test]
async fn test_login_over_login_replaces_credential_and_channel() {
    let h = harness();
    let first = live_token();
    let second = token_expiring_at(unix_now() + 7200);

    h.session.login(first).await.unwrap();
    let old_peer = h.remote.next_connection().await.unwrap();

    h.session.login(second.clone()).await.unwrap();

    assert!(old_peer.is_client_closed());
    let new_peer = h.remote.next_connection().await.unwrap();
    assert_eq!(new_peer.credential(), &second);
    assert_eq!(h.store.load().unwrap(), Some(second));
}

// =========================================================================
// Restore
// =========================================================================

#[tokio::test]
async fn test_restore_with_empty_store_stays_unauthenticated() {
    let h = harness();

    assert!(!h.session.restore().await);

    assert!(!h.session.is_authenticated());
    assert_no_connection(&h.remote).await;
}

#[tokio::test]
async fn test_restore_with_valid_credential_resumes_session() {
    let h = harness();
    let token = live_token();
    h.store.save(&token).unwrap();

    assert!(h.session.restore().await);

    assert!(h.session.is_authenticated());
    let peer = h.remote.next_connection().await.unwrap();
    assert_eq!(peer.credential(), &token);
}

#[tokio::test]
async fn test_restore_with_expired_credential_logs_out_without_connecting() {
    let h = harness();
    h.store.save(&expired_token()).unwrap();

    assert!(!h.session.restore().await);

    assert!(!h.session.is_authenticated());
    assert_eq!(h.store.load().unwrap(), None);
    assert_no_connection(&h.remote).await;
}

#[tokio::test]
async fn test_restore_with_malformed_credential_clears_slot() {
    let h = harness();
    h.store.save(&Credential::new("not-a-jwt")).unwrap();

    assert!(!h.session.restore().await);

    assert!(!h.session.is_authenticated());
    assert_eq!(h.store.load().unwrap(), None);
    assert_no_connection(&h.remote).await;
}

// =========================================================================
// Forced logout
// =========================================================================

#[tokio::test]
async fn test_kicked_push_ends_session_and_redirects() {
    let h = harness();
    h.session.login(live_token()).await.unwrap();
    let peer = h.remote.next_connection().await.unwrap();

    peer.push(&PushEvent::Kicked);

    eventually("session ended after kick", || {
        !h.session.is_authenticated() && h.navigator.hits() == 1
    })
    .await;
    assert_eq!(h.store.load().unwrap(), None);
    assert!(h.session.channel().await.is_none());
    assert!(peer.is_client_closed());
}

#[tokio::test]
async fn test_server_close_ends_session_and_redirects() {
    let h = harness();
    h.session.login(live_token()).await.unwrap();
    let peer = h.remote.next_connection().await.unwrap();

    peer.close();

    eventually("session ended after server close", || {
        !h.session.is_authenticated() && h.navigator.hits() == 1
    })
    .await;
    assert_eq!(h.store.load().unwrap(), None);
    assert!(h.session.channel().await.is_none());
}

#[tokio::test]
async fn test_transient_loss_keeps_session_and_reconnects() {
    let h = harness();
    let token = live_token();
    h.session.login(token.clone()).await.unwrap();
    let first = h.remote.next_connection().await.unwrap();

    // The network blips; the server never said goodbye.
    first.sever();

    let second = h.remote.next_connection().await.unwrap();
    assert_eq!(second.credential(), &token);

    assert!(h.session.is_authenticated());
    assert_eq!(h.store.load().unwrap(), Some(token));
    assert_eq!(h.navigator.hits(), 0);
    assert!(h.session.channel().await.is_some());
}

#[tokio::test]
async fn test_kick_on_replaced_channel_does_not_end_new_session() {
    // A kick aimed at a previous login must not tear down the session
    // that replaced it.
    let h = harness();
    h.session.login(live_token()).await.unwrap();
    let old_peer = h.remote.next_connection().await.unwrap();

    let token = token_expiring_at(unix_now() + 7200);
    h.session.login(token.clone()).await.unwrap();
    let _new_peer = h.remote.next_connection().await.unwrap();

    // The old connection is already closed; even if a frame slipped in
    // before teardown, its epoch is stale.
    old_peer.push(&PushEvent::Kicked);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(h.session.is_authenticated());
    assert_eq!(h.store.load().unwrap(), Some(token));
    assert_eq!(h.navigator.hits(), 0);
}

#[tokio::test]
async fn test_end_session_is_idempotent() {
    let h = harness();
    h.session.login(live_token()).await.unwrap();
    let _peer = h.remote.next_connection().await.unwrap();

    h.session.end_session().await;
    h.session.end_session().await;

    assert!(!h.session.is_authenticated());
    assert_eq!(h.store.load().unwrap(), None);
    assert_eq!(h.navigator.hits(), 2);
}

// =========================================================================
// Races
// =========================================================================

#[tokio::test]
async fn test_concurrent_logins_leave_exactly_one_session() {
    let h = harness();
    let a = token_expiring_at(unix_now() + 1000);
    let b = token_expiring_at(unix_now() + 2000);

    let (ra, rb) =
        tokio::join!(h.session.login(a.clone()), h.session.login(b.clone()));
    ra.unwrap();
    rb.unwrap();

    // Whichever login ran second won wholesale: one stored credential,
    // and the surviving channel is bound to that same credential.
    let stored = h.store.load().unwrap().expect("one credential stored");
    assert!(stored == a || stored == b);

    let channel = h.session.channel().await.expect("one channel live");
    assert_eq!(channel.credential(), &stored);

    // The loser's connection was torn down.
    let first = h.remote.next_connection().await.unwrap();
    let second = h.remote.next_connection().await.unwrap();
    eventually("losing connection closed", || {
        first.is_client_closed() || second.is_client_closed()
    })
    .await;
}

#[tokio::test]
async fn test_login_racing_logout_settles_on_one_state() {
    let h = harness();
    h.session.login(live_token()).await.unwrap();
    let _first = h.remote.next_connection().await.unwrap();

    let token = token_expiring_at(unix_now() + 7200);
    let (login, logout) =
        tokio::join!(h.session.login(token.clone()), h.session.logout());
    login.unwrap();
    logout.unwrap();

    // The transitions serialized; the store and the channel handle agree
    // on whichever ran last.
    let stored = h.store.load().unwrap();
    let channel = h.session.channel().await;
    match stored {
        Some(stored) => {
            assert_eq!(stored, token);
            assert_eq!(
                channel.expect("channel matches stored state").credential(),
                &stored
            );
        }
        None => assert!(channel.is_none()),
    }
}
