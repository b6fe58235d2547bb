use crate::core::rates::{RateFetcher, RateSource, RateTable};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_BASE_CURRENCY: &str = "USD";

/// The cached table together with when, and for which base, it was loaded.
#[derive(Debug, Clone)]
pub struct RateCacheState {
    pub table: Arc<RateTable>,
    pub last_refreshed_at: DateTime<Utc>,
    pub base_currency: String,
}

impl RateCacheState {
    fn empty(base_currency: &str) -> Self {
        Self {
            table: Arc::new(RateTable::new(base_currency, RateSource::Empty)),
            last_refreshed_at: DateTime::<Utc>::UNIX_EPOCH,
            base_currency: base_currency.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheStatus {
    pub base_currency: String,
    pub entries: usize,
    pub source: RateSource,
    pub last_refreshed_at: DateTime<Utc>,
    pub fresh: bool,
}

/// In-memory, single-base exchange rate cache.
///
/// The whole table is swapped on refresh, so readers only ever see a complete
/// table. Refreshes are single-flight: concurrent callers that find the cache
/// stale wait for one fetch instead of issuing their own.
pub struct RateStore {
    fetcher: Arc<dyn RateFetcher>,
    base_currency: String,
    ttl: TimeDelta,
    state: RwLock<RateCacheState>,
    refresh_lock: Mutex<()>,
}

impl RateStore {
    pub fn new(fetcher: Arc<dyn RateFetcher>, base_currency: &str, ttl: Duration) -> Self {
        Self {
            fetcher,
            base_currency: base_currency.to_string(),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            state: RwLock::new(RateCacheState::empty(base_currency)),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Creates a store for USD with a one hour TTL.
    pub fn with_defaults(fetcher: Arc<dyn RateFetcher>) -> Self {
        Self::new(fetcher, DEFAULT_BASE_CURRENCY, DEFAULT_TTL)
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    pub fn snapshot(&self) -> RateCacheState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn install(&self, state: RateCacheState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn is_stale(&self, state: &RateCacheState, now: DateTime<Utc>) -> bool {
        state.table.is_empty() || now - state.last_refreshed_at > self.ttl
    }

    /// True when the cached table is empty or older than the TTL.
    pub fn needs_update(&self) -> bool {
        self.is_stale(&self.snapshot(), Utc::now())
    }

    /// Current rates for the configured base currency.
    pub async fn get_rates(&self) -> Arc<RateTable> {
        self.get_rates_for(&self.base_currency).await
    }

    /// Current rates for `base_currency`, refreshing first if the cache is
    /// stale or holds another base.
    pub async fn get_rates_for(&self, base_currency: &str) -> Arc<RateTable> {
        let needs_refresh = |state: &RateCacheState| {
            state.base_currency != base_currency || self.is_stale(state, Utc::now())
        };

        let state = self.snapshot();
        if !needs_refresh(&state) {
            debug!(base = base_currency, "Rate cache HIT");
            return state.table;
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited
        let state = self.snapshot();
        if !needs_refresh(&state) {
            debug!(base = base_currency, "Rate cache refreshed by concurrent caller");
            return state.table;
        }

        debug!(base = base_currency, "Rate cache MISS");
        self.fetch_and_install(base_currency).await
    }

    /// Fetches and installs a new table regardless of staleness.
    pub async fn refresh(&self, base_currency: &str) -> Arc<RateTable> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_and_install(base_currency).await
    }

    #[instrument(name = "RateRefresh", skip(self))]
    async fn fetch_and_install(&self, base_currency: &str) -> Arc<RateTable> {
        let table = Arc::new(self.fetcher.fetch(base_currency).await);
        info!(
            entries = table.len(),
            source = %table.source(),
            "Installed exchange rate table"
        );
        self.install(RateCacheState {
            table: Arc::clone(&table),
            last_refreshed_at: Utc::now(),
            base_currency: base_currency.to_string(),
        });
        table
    }

    /// Installs `table` as if it had been fetched at `refreshed_at`.
    pub fn prime(&self, table: RateTable, refreshed_at: DateTime<Utc>) {
        let base_currency = table.base().to_string();
        self.install(RateCacheState {
            table: Arc::new(table),
            last_refreshed_at: refreshed_at,
            base_currency,
        });
    }

    pub fn status(&self) -> CacheStatus {
        let state = self.snapshot();
        CacheStatus {
            fresh: !self.is_stale(&state, Utc::now()),
            entries: state.table.len(),
            source: state.table.source(),
            last_refreshed_at: state.last_refreshed_at,
            base_currency: state.base_currency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::exchange_rate_api::ExchangeRateApiFetcher;
    use crate::providers::fallback::fallback_rates;
    use async_trait::async_trait;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct CountingFetcher {
        call_count: AtomicUsize,
        delay: Duration,
    }

    impl CountingFetcher {
        fn new(delay: Duration) -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                delay,
            }
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateFetcher for CountingFetcher {
        async fn fetch(&self, base_currency: &str) -> RateTable {
            let n = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            // Each fetch yields a distinct table so replacement is observable
            let mut table = RateTable::new(base_currency, RateSource::Provider);
            table.insert(base_currency, "KES", 130.0 + n as f64);
            if n == 1 {
                table.insert(base_currency, "UGX", 3700.0);
            }
            table
        }
    }

    fn usd_table(kes: f64) -> RateTable {
        RateTable::from_base_rates("USD", RateSource::Provider, [("KES", kes)])
    }

    #[test]
    fn test_new_store_needs_update() {
        let store = RateStore::with_defaults(Arc::new(CountingFetcher::new(Duration::ZERO)));
        let state = store.snapshot();
        assert!(state.table.is_empty());
        assert_eq!(state.last_refreshed_at, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(state.base_currency, "USD");
        assert!(store.needs_update());
    }

    #[test]
    fn test_staleness_follows_ttl() {
        let store = RateStore::with_defaults(Arc::new(CountingFetcher::new(Duration::ZERO)));

        store.prime(usd_table(130.0), Utc::now() - TimeDelta::hours(2));
        assert!(store.needs_update());
        assert!(!store.status().fresh);

        store.prime(usd_table(130.0), Utc::now());
        assert!(!store.needs_update());
        assert!(store.status().fresh);
    }

    #[test]
    fn test_empty_table_is_stale_even_when_recent() {
        let store = RateStore::with_defaults(Arc::new(CountingFetcher::new(Duration::ZERO)));
        store.prime(RateTable::new("USD", RateSource::Provider), Utc::now());
        assert!(store.needs_update());
    }

    #[tokio::test]
    async fn test_fresh_cache_is_served_without_fetching() {
        let fetcher = Arc::new(CountingFetcher::new(Duration::ZERO));
        let store = RateStore::with_defaults(fetcher.clone());
        store.prime(usd_table(125.0), Utc::now());

        let table = store.get_rates().await;
        assert_eq!(table.get("USD", "KES"), Some(125.0));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_stale_cache_refreshes_and_replaces_table() {
        let fetcher = Arc::new(CountingFetcher::new(Duration::ZERO));
        let store = RateStore::with_defaults(fetcher.clone());

        let first = store.get_rates().await;
        assert_eq!(first.get("USD", "KES"), Some(131.0));
        assert_eq!(first.get("USD", "UGX"), Some(3700.0));
        assert!(!store.needs_update());

        let second = store.refresh("USD").await;
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(second.get("USD", "KES"), Some(132.0));
        // Entries from the previous table do not survive
        assert!(second.get("USD", "UGX").is_none());
        assert!(store.snapshot().table.get("USD", "UGX").is_none());

        // Old snapshot held by a reader is untouched
        assert_eq!(first.get("USD", "UGX"), Some(3700.0));
    }

    #[tokio::test]
    async fn test_base_change_triggers_refresh() {
        let fetcher = Arc::new(CountingFetcher::new(Duration::ZERO));
        let store = RateStore::with_defaults(fetcher.clone());
        store.prime(usd_table(130.0), Utc::now());

        let table = store.get_rates_for("EUR").await;
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(table.base(), "EUR");
        assert_eq!(store.status().base_currency, "EUR");

        store.get_rates_for("EUR").await;
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_are_coalesced() {
        let fetcher = Arc::new(CountingFetcher::new(Duration::from_millis(50)));
        let store = Arc::new(RateStore::with_defaults(fetcher.clone()));

        let tasks = (0..16).map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.get_rates().await })
        });
        let tables = join_all(tasks).await;

        assert_eq!(fetcher.calls(), 1);
        for table in tables {
            let table = table.expect("task should not panic");
            assert_eq!(table.get("USD", "KES"), Some(131.0));
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_installs_fallback() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let fetcher =
            ExchangeRateApiFetcher::new(&mock_server.uri(), Some("key"), Duration::from_secs(1))
                .unwrap();
        let store = RateStore::with_defaults(Arc::new(fetcher));

        let table = store.get_rates().await;
        assert!(!table.is_empty());
        assert!(table.contains("USD", "KES"));
        assert!(table.contains("USD", "UGX"));
        assert_eq!(*table, fallback_rates("USD"));

        let status = store.status();
        assert!(status.fresh);
        assert_eq!(status.source, RateSource::Fallback);
        assert_eq!(status.entries, table.len());
    }

    #[tokio::test]
    async fn test_unreachable_provider_installs_fallback() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher =
            ExchangeRateApiFetcher::new(&format!("http://{addr}"), None, Duration::from_secs(1))
                .unwrap();
        let store = RateStore::with_defaults(Arc::new(fetcher));

        let table = store.get_rates().await;
        assert_eq!(*table, fallback_rates("USD"));
        assert_eq!(store.status().source, RateSource::Fallback);
        assert!(!store.needs_update());
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let store = RateStore::new(
            Arc::new(CountingFetcher::new(Duration::ZERO)),
            "USD",
            Duration::MAX,
        );
        store.prime(usd_table(130.0), DateTime::<Utc>::UNIX_EPOCH);
        assert!(!store.needs_update());
    }
}
