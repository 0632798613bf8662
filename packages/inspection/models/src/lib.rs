#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Restaurant inspection types shared across the restaurant map.
//!
//! An [`InspectionRecord`] is one row of the cleaned inspection extract
//! (one row per violation occurrence, so a single inspection visit may span
//! several rows). An [`EstablishmentSummary`] is the per-restaurant view
//! derived from that restaurant's most recent row.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Geographic bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude bound.
    pub west: f64,
    /// Southern latitude bound.
    pub south: f64,
    /// Eastern longitude bound.
    pub east: f64,
    /// Northern latitude bound.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Returns `true` if the point lies inside the box (bounds inclusive).
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.south..=self.north).contains(&latitude)
            && (self.west..=self.east).contains(&longitude)
    }
}

/// Rows with coordinates outside this box are not New York City
/// restaurants and are dropped at load time.
pub const NYC_BOUNDS: BoundingBox = BoundingBox::new(-74.5, 40.4, -73.5, 41.0);

/// Letter grade assigned at an inspection.
///
/// Only `A`, `B` and `C` are final grades. The remaining codes mark
/// inspections that have not produced a letter grade yet.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Grade {
    /// Score of 0-13.
    A,
    /// Score of 14-27.
    B,
    /// Score of 28 or more.
    C,
    /// Not yet graded.
    N,
    /// Grade pending.
    Z,
    /// Grade pending issued on re-opening after closure.
    P,
}

impl Grade {
    /// Numeric value used for zipcode averaging: `A=1`, `B=2`, `C=3`.
    ///
    /// Lower is better. Pending codes have no value.
    #[must_use]
    pub const fn numeric_value(self) -> Option<u8> {
        match self {
            Self::A => Some(1),
            Self::B => Some(2),
            Self::C => Some(3),
            Self::N | Self::Z | Self::P => None,
        }
    }
}

/// One cleaned row of the inspection extract.
///
/// `name`, the coordinates and `inspection_date` are always present; rows
/// missing any of them never make it into a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionRecord {
    /// Establishment identity key (`CAMIS`).
    pub camis: String,
    /// Doing-business-as name.
    pub name: String,
    /// Borough name.
    pub borough: Option<String>,
    /// Building number.
    pub building: Option<String>,
    /// Street name.
    pub street: Option<String>,
    /// Five-digit zipcode.
    pub zipcode: Option<u32>,
    /// Cuisine description.
    pub cuisine: Option<String>,
    /// Phone number as given.
    pub phone: Option<String>,
    /// Date of the inspection visit.
    pub inspection_date: NaiveDate,
    /// Letter grade, if one was issued.
    pub grade: Option<Grade>,
    /// Numeric inspection score (lower is better).
    pub score: Option<i32>,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Violation text for this row.
    pub violation: Option<String>,
}

/// The most recent state of a single establishment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstablishmentSummary {
    /// Establishment identity key (`CAMIS`).
    pub camis: String,
    /// Doing-business-as name.
    pub name: String,
    /// Borough name.
    pub borough: Option<String>,
    /// Building number.
    pub building: Option<String>,
    /// Street name.
    pub street: Option<String>,
    /// Five-digit zipcode.
    pub zipcode: Option<u32>,
    /// Cuisine description.
    pub cuisine: Option<String>,
    /// Phone number as given.
    pub phone: Option<String>,
    /// Date of the latest inspection.
    pub latest_inspection_date: NaiveDate,
    /// Grade at the latest inspection.
    pub grade: Option<Grade>,
    /// Score at the latest inspection.
    pub score: Option<i32>,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
}

impl From<&InspectionRecord> for EstablishmentSummary {
    fn from(record: &InspectionRecord) -> Self {
        Self {
            camis: record.camis.clone(),
            name: record.name.clone(),
            borough: record.borough.clone(),
            building: record.building.clone(),
            street: record.street.clone(),
            zipcode: record.zipcode,
            cuisine: record.cuisine.clone(),
            phone: record.phone.clone(),
            latest_inspection_date: record.inspection_date,
            grade: record.grade,
            score: record.score,
            latitude: record.latitude,
            longitude: record.longitude,
        }
    }
}

/// A single data row excluded while iterating a dataset.
///
/// Always logged and dropped by the caller; a skipped row never fails the
/// enclosing request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("row {row} skipped: {reason}")]
pub struct RowSkipped {
    /// Row position in the dataset.
    pub row: usize,
    /// Why the row was excluded.
    pub reason: String,
}

impl RowSkipped {
    /// Creates a new skipped-row diagnostic.
    #[must_use]
    pub fn new(row: usize, reason: impl Into<String>) -> Self {
        Self {
            row,
            reason: reason.into(),
        }
    }
}
