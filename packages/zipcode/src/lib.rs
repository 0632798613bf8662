#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-zipcode inspection grade aggregation.
//!
//! Reduces every graded inspection (`A`, `B`, `C`) to one mean numeric
//! grade per zipcode, assigns each mean a display color, and left-joins the
//! result into a zipcode boundary `FeatureCollection`. Aggregation is a pure
//! function of its inputs; persisting the merged collection is left to the
//! caller ([`artifact::write_geometry`]).

pub mod artifact;
pub mod color;

use std::collections::BTreeMap;

use geojson::{Feature, FeatureCollection, JsonValue};
use restaurant_map_dataset::Dataset;
use restaurant_map_inspection_models::{InspectionRecord, RowSkipped};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use color::gradient_color;

/// Boundary property holding the postal code in the NYC MODZCTA layer.
pub const DEFAULT_JOIN_PROPERTY: &str = "modzcta";

/// Merged property names.
pub const AVERAGE_GRADE_PROPERTY: &str = "average_grade";
pub const COLOR_PROPERTY: &str = "color";

/// Errors from boundary artifact I/O.
#[derive(Debug, Error)]
pub enum ZipcodeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    GeoJson(#[from] Box<geojson::Error>),

    /// The file parsed as GeoJSON but is not a `FeatureCollection`.
    #[error("GeoJSON document is not a FeatureCollection")]
    NotFeatureCollection,
}

/// Mean grade for one zipcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZipcodeGrade {
    pub zipcode: u32,
    /// Arithmetic mean of `A=1`, `B=2`, `C=3` over the zipcode's graded
    /// inspections. Lower is better.
    pub average_grade: f64,
    /// `#rrggbb` display color from [`gradient_color`].
    pub color: String,
}

/// Output of one aggregation run.
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// One entry per zipcode with graded inspections, ordered by zipcode.
    pub grades: Vec<ZipcodeGrade>,
    /// The input boundaries with `average_grade` and `color` set on every
    /// feature (`null` where no grade matched).
    pub geometry: FeatureCollection,
}

/// Aggregates `dataset` and joins the result into `geometry` on
/// [`DEFAULT_JOIN_PROPERTY`].
#[must_use]
pub fn aggregate(dataset: &Dataset, geometry: &FeatureCollection) -> Aggregation {
    aggregate_with(dataset, geometry, DEFAULT_JOIN_PROPERTY)
}

/// Aggregates `dataset` and joins the result into `geometry` on
/// `join_property`.
#[must_use]
pub fn aggregate_with(
    dataset: &Dataset,
    geometry: &FeatureCollection,
    join_property: &str,
) -> Aggregation {
    let grades = zipcode_grades(dataset.records());
    let geometry = merge_grades(geometry, &grades, join_property);
    Aggregation { grades, geometry }
}

/// Computes the mean grade per zipcode over every graded inspection row.
///
/// Rows without a final letter grade are ignored. Graded rows without a
/// zipcode are excluded and logged.
#[must_use]
pub fn zipcode_grades(records: &[InspectionRecord]) -> Vec<ZipcodeGrade> {
    // zipcode → (sum, count)
    let mut totals: BTreeMap<u32, (u64, u64)> = BTreeMap::new();

    for (row, record) in records.iter().enumerate() {
        let Some(value) = record.grade.and_then(|g| g.numeric_value()) else {
            continue;
        };
        let Some(zipcode) = record.zipcode else {
            log::debug!("{}", RowSkipped::new(row, "graded row has no zipcode"));
            continue;
        };

        let entry = totals.entry(zipcode).or_insert((0, 0));
        entry.0 += u64::from(value);
        entry.1 += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let grades: Vec<ZipcodeGrade> = totals
        .into_iter()
        .map(|(zipcode, (sum, count))| {
            let average_grade = sum as f64 / count as f64;
            ZipcodeGrade {
                zipcode,
                average_grade,
                color: gradient_color(average_grade),
            }
        })
        .collect();

    log::info!("Computed average grades for {} zipcodes", grades.len());
    grades
}

/// Left-joins `grades` into a copy of `geometry`.
///
/// Every feature gets both merged properties. Features whose
/// `join_property` is missing, unparseable, or has no matching grade get
/// `null` values.
#[must_use]
pub fn merge_grades(
    geometry: &FeatureCollection,
    grades: &[ZipcodeGrade],
    join_property: &str,
) -> FeatureCollection {
    let by_zipcode: BTreeMap<u32, &ZipcodeGrade> =
        grades.iter().map(|g| (g.zipcode, g)).collect();

    let mut merged = geometry.clone();
    let mut matched = 0_usize;

    for feature in &mut merged.features {
        let grade = feature_zipcode(feature, join_property).and_then(|z| by_zipcode.get(&z));

        let (average, color) = match grade {
            Some(grade) => {
                matched += 1;
                (
                    serde_json::Number::from_f64(grade.average_grade)
                        .map_or(JsonValue::Null, JsonValue::Number),
                    JsonValue::String(grade.color.clone()),
                )
            }
            None => (JsonValue::Null, JsonValue::Null),
        };

        feature.set_property(AVERAGE_GRADE_PROPERTY, average);
        feature.set_property(COLOR_PROPERTY, color);
    }

    log::info!(
        "Joined grades into {matched} of {} zipcode features",
        merged.features.len()
    );
    merged
}

/// Reads the postal code of `feature`, accepting string or numeric values.
fn feature_zipcode(feature: &Feature, join_property: &str) -> Option<u32> {
    match feature.property(join_property)? {
        JsonValue::String(s) => {
            let s = s.trim();
            s.parse::<u32>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0)
                    .and_then(zipcode_from_f64)
            })
        }
        JsonValue::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).and_then(zipcode_from_f64)),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn zipcode_from_f64(value: f64) -> Option<u32> {
    (value.is_finite() && (0.0..=f64::from(u32::MAX)).contains(&value)).then(|| value as u32)
}
