//! Compile-time registry of geocoding service configurations.
//!
//! Each geocoding provider is defined in a TOML file under `services/`.
//! The registry embeds these at compile time and exposes them via
//! [`all_services`] and [`enabled_services`].

use std::time::Duration;

use serde::Deserialize;

use crate::GeocodeError;

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service may be used.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Selection order, lowest first.
    pub priority: u32,
    /// Maximum number of cached addresses. `0` means unbounded.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Nominatim / `OpenStreetMap` geocoder.
    Nominatim {
        /// API base URL (e.g., `"https://nominatim.openstreetmap.org/search"`).
        base_url: String,
        /// Minimum delay between requests in milliseconds.
        rate_limit_ms: u64,
        /// Per-request deadline in milliseconds.
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
        /// `User-Agent` header sent with every request (required by the
        /// public instance's usage policy).
        user_agent: String,
        /// Appended to every query (e.g., `"New York, NY"`).
        #[serde(default)]
        locality_suffix: String,
    },
}

const fn default_true() -> bool {
    true
}

const fn default_cache_capacity() -> usize {
    1024
}

const fn default_timeout_ms() -> u64 {
    10_000
}

impl GeocodingService {
    /// Returns the provider's base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Nominatim { base_url, .. } => base_url,
        }
    }

    /// Minimum delay between outbound requests.
    #[must_use]
    pub const fn min_delay(&self) -> Duration {
        match &self.provider {
            ProviderConfig::Nominatim { rate_limit_ms, .. } => Duration::from_millis(*rate_limit_ms),
        }
    }

    /// Per-request deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        match &self.provider {
            ProviderConfig::Nominatim { timeout_ms, .. } => Duration::from_millis(*timeout_ms),
        }
    }

    /// Suffix appended to every query.
    #[must_use]
    pub fn locality_suffix(&self) -> &str {
        match &self.provider {
            ProviderConfig::Nominatim {
                locality_suffix, ..
            } => locality_suffix,
        }
    }

    /// Cache bound, or `None` when unbounded.
    #[must_use]
    pub const fn cache_bound(&self) -> Option<usize> {
        if self.cache_capacity == 0 {
            None
        } else {
            Some(self.cache_capacity)
        }
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[("nominatim", include_str!("../services/nominatim.toml"))];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 1;

/// Returns all geocoding service configurations (enabled and disabled).
///
/// # Errors
///
/// Returns [`GeocodeError::Config`] if an embedded TOML file is malformed.
pub fn all_services() -> Result<Vec<GeocodingService>, GeocodeError> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str).map_err(|e| GeocodeError::Config {
                message: format!("Failed to parse geocoding service '{name}': {e}"),
            })
        })
        .collect()
}

/// Returns only enabled services, sorted by priority (ascending).
///
/// # Errors
///
/// Returns [`GeocodeError::Config`] if an embedded TOML file is malformed.
pub fn enabled_services() -> Result<Vec<GeocodingService>, GeocodeError> {
    let mut services: Vec<GeocodingService> =
        all_services()?.into_iter().filter(|s| s.enabled).collect();
    services.sort_by_key(|s| s.priority);
    Ok(services)
}
