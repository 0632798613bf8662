#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address geocoding for the restaurant map.
//!
//! Turns a free-text street address into WGS84 coordinates through an
//! external provider configured via TOML files in `services/`. The
//! [`Geocoder`] wraps a [`GeocodeProvider`] with:
//!
//! - a process-wide minimum spacing between outbound requests
//!   (the public Nominatim instance allows **1 request per second**),
//! - a per-request deadline,
//! - an in-process cache keyed by the normalised address, with concurrent
//!   requests for the same address sharing one provider call.
//!
//! Provider misses are cached. Timeouts and provider errors are not, so the
//! next request for that address retries.

pub mod address;
pub mod cache;
pub mod nominatim;
pub mod rate_limit;
pub mod service_registry;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::cache::{GeocodeCache, Resolution};
use crate::nominatim::NominatimProvider;
use crate::rate_limit::RateLimiter;
use crate::service_registry::{GeocodingService, ProviderConfig};

/// A geocoding result.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// The matched/canonical address returned by the provider.
    pub matched_address: Option<String>,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The provider did not answer in time.
    #[error("Geocoding timed out after {after:?}")]
    Timeout {
        /// The deadline that elapsed.
        after: Duration,
    },

    /// Service configuration is invalid or missing.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },
}

/// A single-address geocoding backend.
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    /// Short provider name used in log messages.
    fn name(&self) -> &str;

    /// Looks up one fully-qualified query string.
    ///
    /// Returns `Ok(None)` when the provider answered but found no match.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] on transport, parse, or rate-limit failures.
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedAddress>, GeocodeError>;
}

/// Tunables for [`Geocoder`].
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    /// Minimum spacing between outbound requests.
    pub min_delay: Duration,
    /// Deadline for a single provider call.
    pub timeout: Duration,
    /// Maximum cached addresses, `None` for unbounded.
    pub cache_capacity: Option<usize>,
    /// Appended to every query unless already present.
    pub locality_suffix: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(1000),
            timeout: Duration::from_secs(10),
            cache_capacity: Some(1024),
            locality_suffix: "New York, NY".to_string(),
        }
    }
}

impl From<&GeocodingService> for GeocoderConfig {
    fn from(service: &GeocodingService) -> Self {
        Self {
            min_delay: service.min_delay(),
            timeout: service.timeout(),
            cache_capacity: service.cache_bound(),
            locality_suffix: service.locality_suffix().to_string(),
        }
    }
}

/// Rate-limited, cached geocoder shared across request handlers.
pub struct Geocoder {
    provider: Arc<dyn GeocodeProvider>,
    config: GeocoderConfig,
    cache: GeocodeCache,
    limiter: RateLimiter,
}

impl Geocoder {
    /// Wraps `provider` with the given configuration.
    #[must_use]
    pub fn new(provider: Arc<dyn GeocodeProvider>, config: GeocoderConfig) -> Self {
        Self {
            provider,
            cache: GeocodeCache::new(config.cache_capacity),
            limiter: RateLimiter::new(config.min_delay),
            config,
        }
    }

    /// Builds a geocoder for one registry service.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the provider's HTTP client cannot
    /// be built.
    pub fn from_service(service: &GeocodingService) -> Result<Self, GeocodeError> {
        let provider: Arc<dyn GeocodeProvider> = match &service.provider {
            ProviderConfig::Nominatim {
                base_url,
                user_agent,
                ..
            } => Arc::new(NominatimProvider::new(base_url, user_agent)?),
        };

        log::info!(
            "Using geocoding service '{}' ({}), min delay {:?}, timeout {:?}",
            service.id,
            service.name,
            service.min_delay(),
            service.timeout(),
        );

        Ok(Self::new(provider, GeocoderConfig::from(service)))
    }

    /// Builds a geocoder for the highest-priority enabled service.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Config`] if the registry is malformed or no
    /// service is enabled.
    pub fn from_registry() -> Result<Self, GeocodeError> {
        let service = service_registry::enabled_services()?
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::Config {
                message: "No enabled geocoding service".to_string(),
            })?;
        Self::from_service(&service)
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &GeocoderConfig {
        &self.config
    }

    /// Number of addresses currently held in the cache.
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Resolves `address` to coordinates.
    ///
    /// Returns `None` for a blank address, a provider miss, a provider
    /// error, or a timeout. Failures are logged, never raised.
    pub async fn resolve(&self, address: &str) -> Option<GeocodedAddress> {
        let key = address::normalize(address);
        if key.is_empty() {
            return None;
        }

        let slot = self.cache.slot(&key);
        let resolution = slot.get_or_init(|| self.lookup(&key)).await.clone();

        match resolution {
            Resolution::Found(found) => Some(found),
            Resolution::NotFound => None,
            Resolution::Failed => {
                self.cache.forget(&key, &slot);
                None
            }
        }
    }

    async fn lookup(&self, key: &str) -> Resolution {
        let query = address::with_locality(key, &self.config.locality_suffix);

        self.limiter.acquire().await;

        let outcome = tokio::time::timeout(self.config.timeout, self.provider.geocode(&query))
            .await
            .unwrap_or(Err(GeocodeError::Timeout {
                after: self.config.timeout,
            }));

        match outcome {
            Ok(Some(found)) => {
                log::debug!(
                    "{}: '{query}' -> ({}, {})",
                    self.provider.name(),
                    found.latitude,
                    found.longitude
                );
                Resolution::Found(found)
            }
            Ok(None) => {
                log::info!("{}: no match for '{query}'", self.provider.name());
                Resolution::NotFound
            }
            Err(e) => {
                log::warn!("{}: geocoding '{query}' failed: {e}", self.provider.name());
                Resolution::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    #[derive(Clone, Copy)]
    enum Reply {
        Hit,
        Miss,
        Fail,
    }

    struct FakeProvider {
        calls: AtomicUsize,
        queries: Mutex<Vec<String>>,
        delay: Duration,
        reply: Reply,
    }

    impl FakeProvider {
        fn new(reply: Reply, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
                delay,
                reply,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GeocodeProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn geocode(&self, query: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.to_string());
            tokio::time::sleep(self.delay).await;
            match self.reply {
                Reply::Hit => Ok(Some(GeocodedAddress {
                    latitude: 40.7484,
                    longitude: -73.9857,
                    matched_address: Some(query.to_string()),
                })),
                Reply::Miss => Ok(None),
                Reply::Fail => Err(GeocodeError::RateLimited),
            }
        }
    }

    fn fast_config() -> GeocoderConfig {
        GeocoderConfig {
            min_delay: Duration::ZERO,
            timeout: Duration::from_secs(2),
            cache_capacity: None,
            locality_suffix: "New York, NY".to_string(),
        }
    }

    fn geocoder(provider: &Arc<FakeProvider>, config: GeocoderConfig) -> Arc<Geocoder> {
        Arc::new(Geocoder::new(
            Arc::clone(provider) as Arc<dyn GeocodeProvider>,
            config,
        ))
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_provider_call() {
        let provider = FakeProvider::new(Reply::Hit, Duration::from_millis(100));
        let geocoder = geocoder(&provider, fast_config());

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let geocoder = Arc::clone(&geocoder);
                tokio::spawn(async move { geocoder.resolve("350 5th Ave").await })
            })
            .collect();

        for handle in handles {
            let found = handle.await.unwrap().unwrap();
            assert!((found.latitude - 40.7484).abs() < 1e-9);
        }
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn repeated_requests_hit_the_cache() {
        let provider = FakeProvider::new(Reply::Hit, Duration::ZERO);
        let geocoder = geocoder(&provider, fast_config());

        let first = geocoder.resolve("350 5th Ave").await;
        let second = geocoder.resolve("  350   5th Ave ").await;

        assert_eq!(first, second);
        assert_eq!(provider.calls(), 1);
        assert_eq!(geocoder.cached_entries(), 1);
    }

    #[tokio::test]
    async fn distinct_addresses_are_looked_up_separately() {
        let provider = FakeProvider::new(Reply::Hit, Duration::ZERO);
        let geocoder = geocoder(&provider, fast_config());

        geocoder.resolve("350 5th Ave").await;
        geocoder.resolve("1 Wall St").await;

        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn misses_are_cached() {
        let provider = FakeProvider::new(Reply::Miss, Duration::ZERO);
        let geocoder = geocoder(&provider, fast_config());

        assert!(geocoder.resolve("nowhere at all").await.is_none());
        assert!(geocoder.resolve("nowhere at all").await.is_none());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let provider = FakeProvider::new(Reply::Fail, Duration::ZERO);
        let geocoder = geocoder(&provider, fast_config());

        assert!(geocoder.resolve("350 5th Ave").await.is_none());
        assert!(geocoder.resolve("350 5th Ave").await.is_none());
        assert_eq!(provider.calls(), 2);
        assert_eq!(geocoder.cached_entries(), 0);
    }

    #[tokio::test]
    async fn timeout_returns_none_without_caching() {
        let provider = FakeProvider::new(Reply::Hit, Duration::from_secs(30));
        let config = GeocoderConfig {
            timeout: Duration::from_millis(50),
            ..fast_config()
        };
        let geocoder = geocoder(&provider, config);

        let started = Instant::now();
        assert!(geocoder.resolve("350 5th Ave").await.is_none());
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(geocoder.cached_entries(), 0);

        geocoder.resolve("350 5th Ave").await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn appends_locality_suffix_to_query() {
        let provider = FakeProvider::new(Reply::Hit, Duration::ZERO);
        let geocoder = geocoder(&provider, fast_config());

        geocoder.resolve("350 5th Ave").await;

        let queries = provider.queries.lock().unwrap().clone();
        assert_eq!(queries, vec!["350 5th Ave, New York, NY".to_string()]);
    }

    #[tokio::test]
    async fn blank_address_never_reaches_provider() {
        let provider = FakeProvider::new(Reply::Hit, Duration::ZERO);
        let geocoder = geocoder(&provider, fast_config());

        assert!(geocoder.resolve("   ").await.is_none());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn spaces_outbound_requests() {
        let provider = FakeProvider::new(Reply::Hit, Duration::ZERO);
        let config = GeocoderConfig {
            min_delay: Duration::from_millis(100),
            ..fast_config()
        };
        let geocoder = geocoder(&provider, config);

        let started = Instant::now();
        geocoder.resolve("a").await;
        geocoder.resolve("b").await;
        geocoder.resolve("c").await;

        assert!(started.elapsed() >= Duration::from_millis(200));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn bounded_cache_evicts_old_addresses() {
        let provider = FakeProvider::new(Reply::Hit, Duration::ZERO);
        let config = GeocoderConfig {
            cache_capacity: Some(1),
            ..fast_config()
        };
        let geocoder = geocoder(&provider, config);

        geocoder.resolve("a").await;
        geocoder.resolve("b").await;
        geocoder.resolve("a").await;

        assert_eq!(provider.calls(), 3);
        assert_eq!(geocoder.cached_entries(), 1);
    }

    #[tokio::test]
    async fn bounded_cache_keeps_in_flight_lookups() {
        let provider = FakeProvider::new(Reply::Hit, Duration::from_millis(200));
        let config = GeocoderConfig {
            cache_capacity: Some(1),
            ..fast_config()
        };
        let geocoder = geocoder(&provider, config);

        let first = {
            let geocoder = Arc::clone(&geocoder);
            tokio::spawn(async move { geocoder.resolve("350 5th Ave").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let other = {
            let geocoder = Arc::clone(&geocoder);
            tokio::spawn(async move { geocoder.resolve("1 Wall St").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = geocoder.resolve("350 5th Ave").await;

        assert_eq!(first.await.unwrap(), second);
        assert!(other.await.unwrap().is_some());
        assert_eq!(provider.calls(), 2);
    }

    #[test]
    fn config_from_registry_service() {
        let services = service_registry::enabled_services().unwrap();
        let config = GeocoderConfig::from(&services[0]);
        assert_eq!(config.min_delay, Duration::from_millis(1000));
        assert_eq!(config.cache_capacity, Some(1024));
        assert_eq!(config.locality_suffix, "New York, NY");
    }
}
