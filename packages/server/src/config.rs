//! Server configuration from process environment.

use std::path::PathBuf;

use crate::paths;

/// Settings read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `BIND_ADDR`, default `127.0.0.1`.
    pub bind_addr: String,
    /// `PORT`, default `8080`.
    pub port: u16,
    /// `DATA_DIR`, default `data`.
    pub data_dir: PathBuf,
    /// `INSPECTIONS_CSV`, default `<DATA_DIR>/restaurant_data.csv`.
    pub inspections_csv: PathBuf,
    /// `ZIPCODE_GEOJSON`, default `<DATA_DIR>/nyc_zipcode_borders.geojson`.
    pub zipcode_geojson: PathBuf,
    /// Where the graded boundary artifact is written.
    pub graded_zipcodes: PathBuf,
}

impl ServerConfig {
    /// Reads the configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let port: u16 = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let data_dir =
            PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| paths::DEFAULT_DATA_DIR.to_string()));

        let inspections_csv = lookup("INSPECTIONS_CSV")
            .map_or_else(|| paths::inspections_csv_path(&data_dir), PathBuf::from);
        let zipcode_geojson = lookup("ZIPCODE_GEOJSON")
            .map_or_else(|| paths::zipcode_geojson_path(&data_dir), PathBuf::from);
        let graded_zipcodes = paths::graded_zipcodes_path(&data_dir);

        Self {
            bind_addr,
            port,
            data_dir,
            inspections_csv,
            zipcode_geojson,
            graded_zipcodes,
        }
    }
}
