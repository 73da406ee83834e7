use std::time::Duration;

/// How long a settled result is served from the cache before a read refetches.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);

/// Upper bound on cached keys before idle entries are evicted.
pub const DEFAULT_MAX_ENTRIES: usize = 1_000;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// Configuration for the [`QueryCache`](crate::QueryCache).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Stale time applied when a read does not set its own.
    pub stale_time: Duration,
    /// Maximum number of cached keys. Entries with live subscribers or an
    /// in-flight fetch are never evicted. `None` disables the bound.
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: DEFAULT_STALE_TIME,
            max_entries: Some(DEFAULT_MAX_ENTRIES),
        }
    }
}

impl CacheConfig {
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries;
        self
    }
}

/// Configuration for the [`HttpTransport`](crate::HttpTransport).
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    /// Route handed to the session-expired hook after a `401`.
    pub login_route: String,
}

impl TransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }
}

/// Per-read options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// When false the read never fetches and returns whatever is cached.
    pub enabled: bool,
    /// Overrides [`CacheConfig::stale_time`] for this read.
    pub stale_time: Option<Duration>,
    /// Refetch on [`QueryCache::focus`](crate::QueryCache::focus) while subscribed.
    pub refetch_on_focus: bool,
    /// When false a cached, non-invalidated result is reused even if stale.
    pub refetch_on_mount: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            stale_time: None,
            refetch_on_focus: true,
            refetch_on_mount: true,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    pub fn refetch_on_focus(mut self, refetch: bool) -> Self {
        self.refetch_on_focus = refetch;
        self
    }

    pub fn refetch_on_mount(mut self, refetch: bool) -> Self {
        self.refetch_on_mount = refetch;
        self
    }
}
