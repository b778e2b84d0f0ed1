use std::sync::LazyLock;
use std::time::Duration;

/// Global HTTP client instance shared by the voice and SMS gateways.
///
/// Initialized lazily on first access and reused across the application:
/// connection pooling, DNS caching and HTTP/2 keep-alive come for free,
/// and providers never pay per-request client setup.
pub static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        // Timeouts
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        // Connection pooling
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        // HTTP/2 settings
        .http2_adaptive_window(true)
        .http2_keep_alive_interval(Duration::from_secs(10))
        .http2_keep_alive_timeout(Duration::from_secs(20))
        .use_rustls_tls()
        .user_agent(concat!("dialflow/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to build HTTP client")
});
