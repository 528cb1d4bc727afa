//! Push-invalidated caches for the console's data views.
//!
//! Each screen of the console keeps its REST payload in a [`ViewCache`]
//! and subscribes to the push event that invalidates it:
//!
//! ```text
//! StatsView  ──  analytics_updated  ──  GET stats + analytics
//! UsersView  ──  users_updated      ──  GET users
//! BetsView   ──  bet_placed         ──  GET bets
//! ```
//!
//! A push never carries the new dataset into the cache — even
//! `bet_placed`, whose payload is a full record, only triggers a
//! discard-and-refetch. The REST response is the sole source of cache
//! contents, so a cache is always a whole server-rendered snapshot,
//! never a client-side merge that could drift.
//!
//! # Staleness
//!
//! Refetches run as spawned tasks, so a fetch can still be in flight
//! when the next invalidation (or an unmount) arrives. [`ViewCache`]
//! tags each refresh with the generation it started from and drops the
//! result if the generation moved on — late responses never clobber a
//! newer invalidation.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use wavedeck_api::{AdminApi, ApiError};
use wavedeck_channel::{PushTransport, RealtimeChannel, SubscriptionId};
use wavedeck_protocol::{
    AdminStats, AdminUser, AnalyticsPoint, BetRecord, EventKind, UserId,
};

// ---------------------------------------------------------------------------
// Generic cache
// ---------------------------------------------------------------------------

/// A single view's cached payload, with staleness tracking.
///
/// The full replace discipline: `refresh` swaps the whole value on
/// success, `invalidate` discards it and marks any in-flight refresh
/// stale, `close` does the same permanently (unmount).
pub struct ViewCache<T> {
    data: Mutex<Option<T>>,
    generation: AtomicU64,
    open: AtomicBool,
}

impl<T: Clone> ViewCache<T> {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(None),
            generation: AtomicU64::new(0),
            open: AtomicBool::new(true),
        }
    }

    /// The current snapshot, if one is cached.
    pub fn get(&self) -> Option<T> {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Runs `fetch` and installs its result, unless the cache was
    /// invalidated or closed while the fetch was in flight.
    ///
    /// Returns `Ok(true)` if the result was installed, `Ok(false)` if it
    /// was dropped as stale.
    ///
    /// # Errors
    /// Propagates the fetch error; the cache is left untouched.
    pub async fn refresh<F, Fut>(&self, fetch: F) -> Result<bool, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let generation = self.generation.load(Ordering::SeqCst);
        let value = fetch().await?;

        // Staleness check and store under one lock, so an invalidation
        // is either seen here or ordered strictly after the store.
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        if !self.open.load(Ordering::SeqCst)
            || self.generation.load(Ordering::SeqCst) != generation
        {
            tracing::debug!("dropping stale view refresh");
            return Ok(false);
        }
        *data = Some(value);
        Ok(true)
    }

    /// Discards the snapshot and marks any in-flight refresh stale.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        *data = None;
    }

    /// Unmounts the cache: discards the snapshot and silences every
    /// in-flight and future refresh.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.invalidate();
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl<T: Clone> Default for ViewCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Dashboard / analytics
// ---------------------------------------------------------------------------

/// The dashboard view: platform totals plus the analytics series.
///
/// Both datasets answer to the same `analytics_updated` push, so they
/// live behind one view with one subscription.
#[derive(Clone)]
pub struct StatsView {
    api: AdminApi,
    inner: Arc<StatsInner>,
}

struct StatsInner {
    day: Mutex<Option<String>>,
    totals: ViewCache<AdminStats>,
    analytics: ViewCache<Vec<AnalyticsPoint>>,
}

impl StatsView {
    pub fn new(api: AdminApi) -> Self {
        Self {
            api,
            inner: Arc::new(StatsInner {
                day: Mutex::new(None),
                totals: ViewCache::new(),
                analytics: ViewCache::new(),
            }),
        }
    }

    /// Narrows the analytics series to one day (`YYYY-MM-DD`), or clears
    /// the filter. Takes effect on the next refresh.
    pub fn set_day(&self, day: Option<String>) {
        let mut slot =
            self.inner.day.lock().unwrap_or_else(|e| e.into_inner());
        *slot = day;
    }

    /// Fetches both datasets and installs them.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let api = self.api.clone();
        self.inner
            .totals
            .refresh(move || async move { api.stats().await })
            .await?;

        let day = self
            .inner
            .day
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let api = self.api.clone();
        self.inner
            .analytics
            .refresh(move || async move { api.analytics(day.as_deref()).await })
            .await?;
        Ok(())
    }

    pub fn totals(&self) -> Option<AdminStats> {
        self.inner.totals.get()
    }

    pub fn analytics(&self) -> Option<Vec<AnalyticsPoint>> {
        self.inner.analytics.get()
    }

    /// Subscribes this view to `analytics_updated`: every push discards
    /// both datasets and refetches.
    pub fn mount<T: PushTransport>(
        &self,
        channel: &RealtimeChannel<T>,
    ) -> SubscriptionId {
        let view = self.clone();
        channel.subscribe(EventKind::AnalyticsUpdated, move |_| {
            let view = view.clone();
            tokio::spawn(async move {
                view.inner.totals.invalidate();
                view.inner.analytics.invalidate();
                if let Err(e) = view.refresh().await {
                    tracing::warn!(error = %e, "dashboard refetch failed");
                }
            });
        })
    }

    /// Unmounts: drops the subscription and silences in-flight fetches.
    pub fn unmount<T: PushTransport>(
        &self,
        channel: &RealtimeChannel<T>,
        id: SubscriptionId,
    ) {
        channel.unsubscribe(EventKind::AnalyticsUpdated, id);
        self.inner.totals.close();
        self.inner.analytics.close();
    }
}

// ---------------------------------------------------------------------------
// User roster
// ---------------------------------------------------------------------------

/// The moderation view: the user roster plus ban/unban actions.
#[derive(Clone)]
pub struct UsersView {
    api: AdminApi,
    cache: Arc<ViewCache<Vec<AdminUser>>>,
}

impl UsersView {
    pub fn new(api: AdminApi) -> Self {
        Self {
            api,
            cache: Arc::new(ViewCache::new()),
        }
    }

    pub async fn refresh(&self) -> Result<(), ApiError> {
        let api = self.api.clone();
        self.cache
            .refresh(move || async move { api.users().await })
            .await?;
        Ok(())
    }

    pub fn current(&self) -> Option<Vec<AdminUser>> {
        self.cache.get()
    }

    /// Bans `id`, then refetches the roster so the cache reflects the
    /// server's view rather than a local edit.
    ///
    /// # Errors
    /// Surfaces the moderation call's failure to the caller; a denied
    /// ban has no global side effects.
    pub async fn ban(&self, id: &UserId) -> Result<(), ApiError> {
        self.api.ban_user(id).await?;
        self.cache.invalidate();
        self.refresh().await
    }

    /// Lifts the ban on `id`, then refetches.
    pub async fn unban(&self, id: &UserId) -> Result<(), ApiError> {
        self.api.unban_user(id).await?;
        self.cache.invalidate();
        self.refresh().await
    }

    /// Subscribes this view to `users_updated`.
    pub fn mount<T: PushTransport>(
        &self,
        channel: &RealtimeChannel<T>,
    ) -> SubscriptionId {
        let view = self.clone();
        channel.subscribe(EventKind::UsersUpdated, move |_| {
            let view = view.clone();
            tokio::spawn(async move {
                view.cache.invalidate();
                if let Err(e) = view.refresh().await {
                    tracing::warn!(error = %e, "roster refetch failed");
                }
            });
        })
    }

    pub fn unmount<T: PushTransport>(
        &self,
        channel: &RealtimeChannel<T>,
        id: SubscriptionId,
    ) {
        channel.unsubscribe(EventKind::UsersUpdated, id);
        self.cache.close();
    }
}

// ---------------------------------------------------------------------------
// Bets feed
// ---------------------------------------------------------------------------

/// The live bets feed, newest first.
#[derive(Clone)]
pub struct BetsView {
    api: AdminApi,
    limit: Option<u32>,
    cache: Arc<ViewCache<Vec<BetRecord>>>,
}

impl BetsView {
    /// A feed with the backend's default page size.
    pub fn new(api: AdminApi) -> Self {
        Self::with_limit(api, None)
    }

    pub fn with_limit(api: AdminApi, limit: Option<u32>) -> Self {
        Self {
            api,
            limit,
            cache: Arc::new(ViewCache::new()),
        }
    }

    pub async fn refresh(&self) -> Result<(), ApiError> {
        let api = self.api.clone();
        let limit = self.limit;
        self.cache
            .refresh(move || async move { api.bets(limit).await })
            .await?;
        Ok(())
    }

    pub fn current(&self) -> Option<Vec<BetRecord>> {
        self.cache.get()
    }

    /// Subscribes this view to `bet_placed`.
    ///
    /// The push carries the new bet, but the record is deliberately not
    /// prepended: the cache is refetched whole, like every other view.
    pub fn mount<T: PushTransport>(
        &self,
        channel: &RealtimeChannel<T>,
    ) -> SubscriptionId {
        let view = self.clone();
        channel.subscribe(EventKind::BetPlaced, move |_| {
            let view = view.clone();
            tokio::spawn(async move {
                view.cache.invalidate();
                if let Err(e) = view.refresh().await {
                    tracing::warn!(error = %e, "bets refetch failed");
                }
            });
        })
    }

    pub fn unmount<T: PushTransport>(
        &self,
        channel: &RealtimeChannel<T>,
        id: SubscriptionId,
    ) {
        channel.unsubscribe(EventKind::BetPlaced, id);
        self.cache.close();
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_refresh_installs_the_fetched_value() {
        let cache = ViewCache::<u32>::new();

        let installed = cache.refresh(|| async { Ok(7) }).await.unwrap();

        assert!(installed);
        assert_eq!(cache.get(), Some(7));
    }

    #[tokio::test]
    async fn test_refresh_error_leaves_cache_untouched() {
        let cache = ViewCache::<u32>::new();
        cache.refresh(|| async { Ok(7) }).await.unwrap();

        let result = cache
            .refresh(|| async { Err(ApiError::Unauthorized) })
            .await;

        assert!(result.is_err());
        assert_eq!(cache.get(), Some(7));
    }

    #[tokio::test]
    async fn test_invalidate_discards_the_snapshot() {
        let cache = ViewCache::<u32>::new();
        cache.refresh(|| async { Ok(7) }).await.unwrap();

        cache.invalidate();

        assert_eq!(cache.get(), None);
        assert!(cache.is_open());
    }

    #[tokio::test]
    async fn test_invalidate_during_refresh_drops_the_late_result() {
        let cache = ViewCache::<u32>::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<u32>();

        // join! polls the refresh first, so it captures its generation
        // before the driver invalidates and releases the fetch.
        let refresh = cache.refresh(|| async {
            Ok(rx.await.expect("driver sends a value"))
        });
        let driver = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cache.invalidate();
            tx.send(7).expect("refresh is waiting");
        };
        let (installed, ()) = tokio::join!(refresh, driver);

        assert!(!installed.unwrap());
        assert_eq!(cache.get(), None);
    }

    #[tokio::test]
    async fn test_close_silences_an_in_flight_refresh() {
        let cache = ViewCache::<u32>::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<u32>();

        let refresh = cache.refresh(|| async {
            Ok(rx.await.expect("driver sends a value"))
        });
        let driver = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cache.close();
            tx.send(7).expect("refresh is waiting");
        };
        let (installed, ()) = tokio::join!(refresh, driver);

        assert!(!installed.unwrap());
        assert_eq!(cache.get(), None);
        assert!(!cache.is_open());
    }

    #[tokio::test]
    async fn test_refresh_after_close_is_dropped() {
        let cache = ViewCache::<u32>::new();
        cache.close();

        let installed = cache.refresh(|| async { Ok(7) }).await.unwrap();

        assert!(!installed);
        assert_eq!(cache.get(), None);
    }
}
