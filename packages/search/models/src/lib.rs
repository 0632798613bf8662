#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types for restaurant proximity search.
//!
//! These are serialized straight to JSON clients. Every optional field is an
//! `Option` and serializes as an explicit `null`; no field ever carries a
//! sentinel such as `NaN`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use restaurant_map_inspection_models::{EstablishmentSummary, Grade, InspectionRecord};
use serde::{Deserialize, Serialize};

/// The resolved search center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchLocation {
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lon: f64,
    /// The address as submitted, trimmed.
    pub label: String,
    /// Provider's canonical form of the address, when it returned one.
    pub matched_address: Option<String>,
}

/// One establishment near the search center, described by its latest
/// inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantResult {
    pub camis: String,
    pub name: String,
    pub borough: Option<String>,
    pub building: Option<String>,
    pub street: Option<String>,
    pub zipcode: Option<u32>,
    pub phone: Option<String>,
    pub cuisine: Option<String>,
    pub grade: Option<Grade>,
    pub score: Option<i32>,
    pub latitude: f64,
    pub longitude: f64,
    /// Date of the latest inspection.
    pub inspection_date: NaiveDate,
    /// Distance from the search center in miles, rounded to two decimals.
    pub distance: f64,
}

impl RestaurantResult {
    /// Builds a result from an establishment's latest state and its
    /// distance in miles.
    #[must_use]
    pub fn new(summary: &EstablishmentSummary, distance_miles: f64) -> Self {
        Self {
            camis: summary.camis.clone(),
            name: summary.name.clone(),
            borough: summary.borough.clone(),
            building: summary.building.clone(),
            street: summary.street.clone(),
            zipcode: summary.zipcode,
            phone: summary.phone.clone(),
            cuisine: summary.cuisine.clone(),
            grade: summary.grade,
            score: summary.score,
            latitude: summary.latitude,
            longitude: summary.longitude,
            inspection_date: summary.latest_inspection_date,
            distance: round_to_cents(distance_miles),
        }
    }
}

/// One row of an establishment's inspection history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionEntry {
    pub date: NaiveDate,
    pub grade: Option<Grade>,
    pub score: Option<i32>,
    pub violation: Option<String>,
}

impl From<&InspectionRecord> for InspectionEntry {
    fn from(record: &InspectionRecord) -> Self {
        Self {
            date: record.inspection_date,
            grade: record.grade,
            score: record.score,
            violation: record.violation.clone(),
        }
    }
}

/// Response of a proximity search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Where the address resolved to. `None` only when geocoding failed.
    pub search_location: Option<SearchLocation>,
    /// Nearby establishments, nearest first.
    pub restaurants: Vec<RestaurantResult>,
    /// CAMIS → inspections, most recent first, for every listed
    /// establishment.
    pub inspection_history: BTreeMap<String, Vec<InspectionEntry>>,
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
