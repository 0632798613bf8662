#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the restaurant map server.
//!
//! Search results are embedded unchanged from the search crate; the types
//! here only add the HTTP envelope around them.

use restaurant_map_search_models::SearchResult;
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Always `true` when the server is responding.
    pub healthy: bool,
    /// Server version string.
    pub version: String,
}

/// Body of `POST /api/search`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Free-text street address.
    #[serde(default)]
    pub address: String,
    /// Search radius in miles (default 1).
    pub radius: Option<f64>,
    /// Maximum establishments returned (default 10). `0` returns every
    /// establishment in the radius.
    pub limit: Option<usize>,
}

/// Response of `POST /api/search`.
///
/// A failed geocode still produces this shape: an empty result plus an
/// `error` reason.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    #[serde(flatten)]
    pub result: SearchResult,
    /// User-facing reason when the search could not run.
    pub error: Option<String>,
}

impl SearchResponse {
    #[must_use]
    pub const fn ok(result: SearchResult) -> Self {
        Self {
            result,
            error: None,
        }
    }

    /// An empty result carrying `reason`.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            result: SearchResult::default(),
            error: Some(reason.into()),
        }
    }
}

/// Generic error body.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub error: String,
}

/// Response of `POST /api/reload`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReload {
    /// Inspection rows in the new dataset.
    pub rows: usize,
    /// Distinct establishments in the new dataset.
    pub establishments: usize,
    /// Zipcodes with an average grade after re-aggregation.
    pub zipcodes: usize,
}
