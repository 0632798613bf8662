#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory restaurant inspection dataset.
//!
//! Loads the open-data inspection extract (CSV), coerces each row into a
//! typed [`InspectionRecord`], drops rows that cannot be placed on the map,
//! and derives the latest-inspection [`EstablishmentSummary`] per
//! restaurant. A point index over every row's coordinates is built as part
//! of the same load, so a [`Dataset`] and its index always describe the
//! same rows.
//!
//! Cleaned tables are cached in a columnar file next to the source (see
//! [`cache`]) so that process restarts skip CSV parsing while the source is
//! unchanged. [`DatasetHandle`] provides atomic whole-dataset reloads.

pub mod cache;
pub mod columns;
pub mod handle;
pub mod load;
pub mod parsing;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use restaurant_map_inspection_models::{EstablishmentSummary, InspectionRecord};
use restaurant_map_spatial::PointIndex;

pub use handle::DatasetHandle;

/// Errors that can occur while loading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// The source (or cache) file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV header could not be decoded.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The source is missing required columns.
    #[error("Missing required columns: {}", .missing.join(", "))]
    Schema {
        /// Normalised names of the missing columns.
        missing: Vec<String>,
    },

    /// The cache could not be encoded.
    #[error("Cache encode error: {0}")]
    CacheEncode(#[from] rmp_serde::encode::Error),

    /// The cache could not be decoded.
    #[error("Cache decode error: {0}")]
    CacheDecode(#[from] rmp_serde::decode::Error),

    /// The cache is from an incompatible layout or is corrupt.
    #[error("Stale cache: {message}")]
    StaleCache {
        /// Description of the mismatch.
        message: String,
    },
}

impl DatasetError {
    /// Returns `true` if the source data is missing required columns.
    #[must_use]
    pub const fn is_schema_failure(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }

    /// Returns `true` if the source could not be read.
    #[must_use]
    pub const fn is_io_failure(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Csv(_))
    }
}

/// Row counts from a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Data rows read from the source.
    pub total_rows: usize,
    /// Rows the CSV reader could not decode.
    pub unreadable: usize,
    /// Rows with no `CAMIS`.
    pub missing_identity: usize,
    /// Rows with no `DBA`.
    pub missing_name: usize,
    /// Rows with missing or unparseable coordinates.
    pub missing_coordinates: usize,
    /// Rows with a missing, unparseable, or placeholder inspection date.
    pub missing_date: usize,
    /// Rows outside the NYC bounding box.
    pub out_of_bounds: usize,
    /// Rows kept.
    pub kept: usize,
    /// Whether the rows came from the columnar cache.
    pub from_cache: bool,
}

impl LoadStats {
    /// Total rows dropped by cleaning.
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.unreadable
            + self.missing_identity
            + self.missing_name
            + self.missing_coordinates
            + self.missing_date
            + self.out_of_bounds
    }
}

/// Load-time behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Read from and write to the columnar cache.
    pub use_cache: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { use_cache: true }
    }
}

/// Orders two rows most recent first. Rows with the same date keep their
/// dataset order, so the earliest row position wins a tie.
#[must_use]
pub fn recency_order(
    a: (usize, &InspectionRecord),
    b: (usize, &InspectionRecord),
) -> Ordering {
    b.1.inspection_date
        .cmp(&a.1.inspection_date)
        .then_with(|| a.0.cmp(&b.0))
}

/// A fully loaded, read-only inspection dataset.
pub struct Dataset {
    records: Vec<InspectionRecord>,
    /// CAMIS → row positions, most recent first.
    history: BTreeMap<String, Vec<usize>>,
    summaries: BTreeMap<String, EstablishmentSummary>,
    index: PointIndex,
    stats: LoadStats,
}

impl Dataset {
    /// Builds a dataset (and its point index) from cleaned records.
    #[must_use]
    pub fn from_records(records: Vec<InspectionRecord>, stats: LoadStats) -> Self {
        let mut history: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (row, record) in records.iter().enumerate() {
            history.entry(record.camis.clone()).or_default().push(row);
        }
        for rows in history.values_mut() {
            rows.sort_by(|&a, &b| recency_order((a, &records[a]), (b, &records[b])));
        }

        let summaries = history
            .iter()
            .filter_map(|(camis, rows)| {
                let latest = rows.first()?;
                Some((camis.clone(), EstablishmentSummary::from(&records[*latest])))
            })
            .collect();

        let index = PointIndex::build(records.iter().map(|r| (r.latitude, r.longitude)));

        Self {
            records,
            history,
            summaries,
            index,
            stats,
        }
    }

    /// All cleaned rows, in source order.
    #[must_use]
    pub fn records(&self) -> &[InspectionRecord] {
        &self.records
    }

    /// The row at `position`.
    #[must_use]
    pub fn record(&self, position: usize) -> Option<&InspectionRecord> {
        self.records.get(position)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Latest-snapshot view: one summary per establishment, ordered by CAMIS.
    pub fn summaries(&self) -> impl Iterator<Item = &EstablishmentSummary> {
        self.summaries.values()
    }

    /// Latest summary for one establishment.
    #[must_use]
    pub fn summary(&self, camis: &str) -> Option<&EstablishmentSummary> {
        self.summaries.get(camis)
    }

    /// Number of distinct establishments.
    #[must_use]
    pub fn establishment_count(&self) -> usize {
        self.summaries.len()
    }

    /// Row positions for one establishment, most recent inspection first.
    #[must_use]
    pub fn history(&self, camis: &str) -> &[usize] {
        self.history.get(camis).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Point index over every row, keyed by row position.
    #[must_use]
    pub const fn index(&self) -> &PointIndex {
        &self.index
    }

    /// Row counts from the load that produced this dataset.
    #[must_use]
    pub const fn stats(&self) -> &LoadStats {
        &self.stats
    }
}

/// Loads a dataset from a CSV extract, using the columnar cache.
///
/// # Errors
///
/// Returns [`DatasetError`] if the source cannot be read or is missing
/// required columns.
pub fn load(source: &Path) -> Result<Dataset, DatasetError> {
    load_with(source, LoadOptions::default())
}

/// Loads a dataset from a CSV extract.
///
/// When caching is enabled, a fresh cache is read instead of the CSV. A
/// stale, missing, or unreadable cache is rebuilt from the CSV; failure to
/// write the new cache is logged and does not fail the load.
///
/// # Errors
///
/// Returns [`DatasetError`] if the source cannot be read or is missing
/// required columns.
pub fn load_with(source: &Path, options: LoadOptions) -> Result<Dataset, DatasetError> {
    let cache_file = cache::cache_path(source);

    if options.use_cache && cache::is_fresh(source, &cache_file) {
        match cache::read(&cache_file) {
            Ok(records) => {
                log::info!(
                    "Loaded {} inspection rows from cache {}",
                    records.len(),
                    cache_file.display()
                );
                let stats = LoadStats {
                    total_rows: records.len(),
                    kept: records.len(),
                    from_cache: true,
                    ..LoadStats::default()
                };
                return Ok(Dataset::from_records(records, stats));
            }
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable cache {}: {e}; re-parsing source",
                    cache_file.display()
                );
            }
        }
    }

    log::info!("Parsing inspection extract {}", source.display());
    let reader = BufReader::new(File::open(source)?);
    let (records, stats) = load::read_csv(reader)?;

    log::info!(
        "Kept {} of {} rows ({} unreadable, {} without CAMIS, {} without name, \
         {} without coordinates, {} without date, {} outside NYC)",
        stats.kept,
        stats.total_rows,
        stats.unreadable,
        stats.missing_identity,
        stats.missing_name,
        stats.missing_coordinates,
        stats.missing_date,
        stats.out_of_bounds,
    );

    if options.use_cache {
        match cache::write(&cache_file, &records) {
            Ok(()) => log::info!("Wrote columnar cache {}", cache_file.display()),
            Err(e) => log::warn!("Failed to write cache {}: {e}", cache_file.display()),
        }
    }

    let dataset = Dataset::from_records(records, stats);
    log::info!(
        "Dataset ready: {} rows, {} establishments",
        dataset.len(),
        dataset.establishment_count()
    );
    Ok(dataset)
}
