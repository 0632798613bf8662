#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Restaurant proximity search.
//!
//! Resolves a free-text address with the shared [`Geocoder`], collects
//! candidate rows from the dataset's point index, confirms each candidate by
//! exact geodesic distance, and reduces the survivors to the latest
//! inspection per establishment, nearest first.

use std::collections::BTreeMap;
use std::sync::Arc;

use restaurant_map_dataset::{Dataset, DatasetHandle, recency_order};
use restaurant_map_geocoder::{GeocodedAddress, Geocoder};
use restaurant_map_inspection_models::{EstablishmentSummary, RowSkipped};
use restaurant_map_search_models::{InspectionEntry, RestaurantResult, SearchLocation, SearchResult};
use restaurant_map_spatial::{geodesic_distance_miles, miles_to_degrees};
use thiserror::Error;

/// Errors returned to search callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The address was empty or whitespace only.
    #[error("Address is empty")]
    EmptyAddress,

    /// The address could not be resolved (no match, provider error, or
    /// timeout).
    #[error("Could not geocode address '{address}'")]
    GeocodeFailure {
        /// The address as submitted, trimmed.
        address: String,
    },
}

impl SearchError {
    /// Short user-facing explanation.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::EmptyAddress => "Please enter an address.",
            Self::GeocodeFailure { .. } => {
                "Address not found. Please check the address and try again."
            }
        }
    }
}

/// Per-request search parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Search radius in miles. Negative or non-finite values search a
    /// zero radius.
    pub radius_miles: f64,
    /// Maximum establishments returned, `None` for all.
    pub limit: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            radius_miles: 1.0,
            limit: Some(10),
        }
    }
}

impl SearchOptions {
    fn effective_radius(&self) -> f64 {
        if self.radius_miles.is_finite() && self.radius_miles > 0.0 {
            self.radius_miles
        } else {
            0.0
        }
    }
}

/// Geocoder + dataset composition serving proximity searches.
pub struct SearchEngine {
    dataset: Arc<DatasetHandle>,
    geocoder: Arc<Geocoder>,
}

impl SearchEngine {
    #[must_use]
    pub const fn new(dataset: Arc<DatasetHandle>, geocoder: Arc<Geocoder>) -> Self {
        Self { dataset, geocoder }
    }

    /// Shared dataset handle (for reloads).
    #[must_use]
    pub const fn dataset(&self) -> &Arc<DatasetHandle> {
        &self.dataset
    }

    /// Finds establishments within `options.radius_miles` of `address`.
    ///
    /// The dataset snapshot is taken once per call, so a concurrent reload
    /// never mixes rows from two datasets into one response.
    ///
    /// # Errors
    ///
    /// * [`SearchError::EmptyAddress`] if `address` is blank
    /// * [`SearchError::GeocodeFailure`] if the address cannot be resolved
    pub async fn search(
        &self,
        address: &str,
        options: SearchOptions,
    ) -> Result<SearchResult, SearchError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(SearchError::EmptyAddress);
        }

        let location = self
            .geocoder
            .resolve(address)
            .await
            .filter(|loc| loc.latitude.is_finite() && loc.longitude.is_finite())
            .ok_or_else(|| SearchError::GeocodeFailure {
                address: address.to_string(),
            })?;

        let dataset = self.dataset.current();
        let result = search_dataset(&dataset, address, &location, options);

        log::info!(
            "Search '{address}' ({}, {}) within {} mi: {} establishments",
            location.latitude,
            location.longitude,
            options.effective_radius(),
            result.restaurants.len()
        );

        Ok(result)
    }
}

/// Runs the spatial part of a search around an already-resolved location.
///
/// `address` is echoed back as the location label.
#[must_use]
pub fn search_dataset(
    dataset: &Dataset,
    address: &str,
    location: &GeocodedAddress,
    options: SearchOptions,
) -> SearchResult {
    let center = (location.latitude, location.longitude);
    let radius = options.effective_radius();

    let candidates = dataset.index().query_radius(center, miles_to_degrees(radius));
    log::debug!("{} coarse candidates within {radius} mi", candidates.len());

    // CAMIS → (representative row, its distance)
    let mut representatives: BTreeMap<&str, (usize, f64)> = BTreeMap::new();

    for position in candidates {
        let Some(record) = dataset.record(position) else {
            log::warn!("{}", RowSkipped::new(position, "not present in dataset"));
            continue;
        };

        let distance = geodesic_distance_miles(center, (record.latitude, record.longitude));
        if !distance.is_finite() {
            log::warn!("{}", RowSkipped::new(position, "distance is not finite"));
            continue;
        }
        if distance > radius {
            continue;
        }

        representatives
            .entry(record.camis.as_str())
            .and_modify(|current| {
                let current_record = &dataset.records()[current.0];
                if recency_order((position, record), (current.0, current_record)).is_lt() {
                    *current = (position, distance);
                }
            })
            .or_insert((position, distance));
    }

    let mut nearby: Vec<(&str, usize, f64)> = representatives
        .into_iter()
        .map(|(camis, (position, distance))| (camis, position, distance))
        .collect();
    nearby.sort_by(|a, b| a.2.total_cmp(&b.2).then_with(|| a.0.cmp(b.0)));
    if let Some(limit) = options.limit {
        nearby.truncate(limit);
    }

    let mut restaurants = Vec::with_capacity(nearby.len());
    let mut inspection_history = BTreeMap::new();

    for (camis, position, distance) in nearby {
        let summary = EstablishmentSummary::from(&dataset.records()[position]);
        restaurants.push(RestaurantResult::new(&summary, distance));

        let history: Vec<InspectionEntry> = dataset
            .history(camis)
            .iter()
            .filter_map(|&row| dataset.record(row))
            .map(InspectionEntry::from)
            .collect();
        inspection_history.insert(camis.to_string(), history);
    }

    SearchResult {
        search_location: Some(SearchLocation {
            lat: location.latitude,
            lon: location.longitude,
            label: address.to_string(),
            matched_address: location.matched_address.clone(),
        }),
        restaurants,
        inspection_history,
    }
}
