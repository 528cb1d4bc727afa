//! Authenticated REST client for the Wavedeck admin backend.
//!
//! Every call goes through one pipeline:
//!
//! ```text
//! endpoint method
//!     │  read credential from the token store (just-in-time)
//!     ▼
//! attach `Authorization: Bearer <token>` if present
//!     │  send
//!     ▼
//! 401?  → clear store, fire the unauthorized hook, Err(Unauthorized)
//! other non-success → Err(Status { code, message })
//! success → decode JSON payload
//! ```
//!
//! The credential is read from the durable store immediately before each
//! send, never cached on the client — a logout between two requests
//! takes effect on the very next request.
//!
//! The 401 path is the REST half of forced logout: the app wires
//! [`AdminApi::set_unauthorized_hook`] to the session controller's
//! `end_session`, so a rejected credential ends the session exactly like
//! a `kicked` push does.

mod error;

pub use error::ApiError;

use std::sync::{Arc, Mutex};

use reqwest::{RequestBuilder, Response, StatusCode};

use wavedeck_protocol::{
    AdminStats, AdminUser, AnalyticsPoint, BetRecord, Credential,
    LoginRequest, LoginResponse, UserId,
};
use wavedeck_store::TokenStore;

/// Default page size for the bets feed.
pub const DEFAULT_BETS_LIMIT: u32 = 100;

type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// The admin backend's REST surface.
///
/// Cheap to clone; clones share the HTTP connection pool, the store
/// handle, and the unauthorized hook.
#[derive(Clone)]
pub struct AdminApi {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
    on_unauthorized: Arc<Mutex<Option<UnauthorizedHook>>>,
}

impl AdminApi {
    /// Creates a client for the backend at `base_url` (scheme + host +
    /// port, no trailing slash), reading credentials from `store`.
    pub fn new(base_url: impl Into<String>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            store,
            on_unauthorized: Arc::new(Mutex::new(None)),
        }
    }

    /// Installs the global 401 hook.
    ///
    /// Called at most once per rejected request, after the store has
    /// been cleared. Must be cheap and non-blocking; spawn a task for
    /// anything async.
    pub fn set_unauthorized_hook(
        &self,
        hook: impl Fn() + Send + Sync + 'static,
    ) {
        let mut slot =
            self.on_unauthorized.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Arc::new(hook));
    }

    // -- Endpoints --------------------------------------------------------

    /// Exchanges admin credentials for a bearer token.
    ///
    /// The token is returned, not stored: persisting it is the session
    /// controller's job.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Credential, ApiError> {
        let body = LoginRequest {
            username: username.to_owned(),
            password: password.to_owned(),
        };
        let response = self
            .send(self.http.post(self.url("/api/admin/login")).json(&body))
            .await?;
        let payload: LoginResponse = response.json().await?;
        Ok(payload.token)
    }

    /// Platform-wide dashboard totals.
    pub async fn stats(&self) -> Result<AdminStats, ApiError> {
        let response =
            self.send(self.http.get(self.url("/api/admin/stats"))).await?;
        Ok(response.json().await?)
    }

    /// Per-day, per-game aggregates. `day` narrows to one day
    /// (`YYYY-MM-DD`); `None` returns the backend's default window.
    pub async fn analytics(
        &self,
        day: Option<&str>,
    ) -> Result<Vec<AnalyticsPoint>, ApiError> {
        let mut request = self.http.get(self.url("/api/admin/analytics"));
        if let Some(day) = day {
            request = request.query(&[("day", day)]);
        }
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// The full user roster.
    pub async fn users(&self) -> Result<Vec<AdminUser>, ApiError> {
        let response =
            self.send(self.http.get(self.url("/api/admin/users"))).await?;
        Ok(response.json().await?)
    }

    /// Bans a user. Takes effect server-side immediately; the roster
    /// push that follows tells every console to refetch.
    pub async fn ban_user(&self, id: &UserId) -> Result<(), ApiError> {
        let path = format!("/api/admin/users/{}/ban", id.0);
        self.send(self.http.patch(self.url(&path))).await?;
        Ok(())
    }

    /// Lifts a ban.
    pub async fn unban_user(&self, id: &UserId) -> Result<(), ApiError> {
        let path = format!("/api/admin/users/{}/unban", id.0);
        self.send(self.http.patch(self.url(&path))).await?;
        Ok(())
    }

    /// The most recent bets, newest first. `limit` caps the page size
    /// (default [`DEFAULT_BETS_LIMIT`]).
    pub async fn bets(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<BetRecord>, ApiError> {
        let limit = limit.unwrap_or(DEFAULT_BETS_LIMIT);
        let response = self
            .send(
                self.http
                    .get(self.url("/api/admin/bets"))
                    .query(&[("limit", limit)]),
            )
            .await?;
        Ok(response.json().await?)
    }

    // -- Pipeline ---------------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attaches the stored credential, sends, and applies the global
    /// status policy.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let request = match self.store.load() {
            Ok(Some(credential)) => request.bearer_auth(credential.as_str()),
            Ok(None) => request,
            Err(e) => {
                // An unreadable store is not fatal to the request; the
                // backend will answer 401 if auth was actually required.
                tracing::warn!(error = %e, "credential slot unreadable");
                request
            }
        };

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            tracing::info!("backend rejected credential, clearing it");
            if let Err(e) = self.store.clear() {
                tracing::warn!(error = %e, "failed to clear rejected credential");
            }
            let hook = self
                .on_unauthorized
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone();
            if let Some(hook) = hook {
                hook();
            }
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let message = extract_message(response).await;
            return Err(ApiError::Status {
                code: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

/// Pulls a human-readable message out of an error response: the JSON
/// `message` field when the backend sent one, the raw body otherwise.
async fn extract_message(response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => value
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_owned)
            .unwrap_or(body),
        Err(_) => body,
    }
}
