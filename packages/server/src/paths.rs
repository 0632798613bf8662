#![allow(clippy::module_name_repetitions)]
//! Canonical file paths under the data directory.

use std::path::{Path, PathBuf};

/// Default data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Returns the default inspection extract path inside `data_dir`.
#[must_use]
pub fn inspections_csv_path(data_dir: &Path) -> PathBuf {
    data_dir.join("restaurant_data.csv")
}

/// Returns the default zipcode boundary GeoJSON path inside `data_dir`.
#[must_use]
pub fn zipcode_geojson_path(data_dir: &Path) -> PathBuf {
    data_dir.join("nyc_zipcode_borders.geojson")
}

/// Returns the `generated/` directory for output artifacts.
#[must_use]
pub fn generated_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("generated")
}

/// Returns the path of the boundary file merged with average grades.
#[must_use]
pub fn graded_zipcodes_path(data_dir: &Path) -> PathBuf {
    generated_dir(data_dir).join("nyc_zipcode_borders_with_grades.geojson")
}
