//! Columnar on-disk cache of the cleaned inspection table.
//!
//! The cleaned rows are stored struct-of-arrays in `MessagePack` next to the
//! source extract (`restaurant_data.csv` → `restaurant_data.csv.cache.msgpack`).
//! A cache is only used while it is strictly newer than its source.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write as _};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use restaurant_map_inspection_models::{Grade, InspectionRecord};
use serde::{Deserialize, Serialize};

use crate::DatasetError;

/// Bump when the columnar layout changes.
const CACHE_VERSION: u32 = 1;

const CACHE_SUFFIX: &str = "cache.msgpack";

/// Returns the cache path for a source extract.
#[must_use]
pub fn cache_path(source: &Path) -> PathBuf {
    let file_name = source
        .file_name()
        .map_or_else(|| "inspections".into(), |n| n.to_string_lossy());
    source.with_file_name(format!("{file_name}.{CACHE_SUFFIX}"))
}

/// Returns `true` if the cache exists and is newer than the source.
///
/// A cache with no readable source next to it is considered fresh.
#[must_use]
pub fn is_fresh(source: &Path, cache: &Path) -> bool {
    let Ok(cache_time) = fs::metadata(cache).and_then(|m| m.modified()) else {
        return false;
    };
    match fs::metadata(source).and_then(|m| m.modified()) {
        Ok(source_time) => source_time < cache_time,
        Err(_) => true,
    }
}

/// Struct-of-arrays layout of a cleaned table.
#[derive(Debug, Serialize, Deserialize)]
struct ColumnarTable {
    version: u32,
    camis: Vec<String>,
    name: Vec<String>,
    borough: Vec<Option<String>>,
    building: Vec<Option<String>>,
    street: Vec<Option<String>>,
    zipcode: Vec<Option<u32>>,
    cuisine: Vec<Option<String>>,
    phone: Vec<Option<String>>,
    inspection_date: Vec<NaiveDate>,
    grade: Vec<Option<Grade>>,
    score: Vec<Option<i32>>,
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    violation: Vec<Option<String>>,
}

impl ColumnarTable {
    fn from_records(records: &[InspectionRecord]) -> Self {
        let n = records.len();
        let mut table = Self {
            version: CACHE_VERSION,
            camis: Vec::with_capacity(n),
            name: Vec::with_capacity(n),
            borough: Vec::with_capacity(n),
            building: Vec::with_capacity(n),
            street: Vec::with_capacity(n),
            zipcode: Vec::with_capacity(n),
            cuisine: Vec::with_capacity(n),
            phone: Vec::with_capacity(n),
            inspection_date: Vec::with_capacity(n),
            grade: Vec::with_capacity(n),
            score: Vec::with_capacity(n),
            latitude: Vec::with_capacity(n),
            longitude: Vec::with_capacity(n),
            violation: Vec::with_capacity(n),
        };

        for r in records {
            table.camis.push(r.camis.clone());
            table.name.push(r.name.clone());
            table.borough.push(r.borough.clone());
            table.building.push(r.building.clone());
            table.street.push(r.street.clone());
            table.zipcode.push(r.zipcode);
            table.cuisine.push(r.cuisine.clone());
            table.phone.push(r.phone.clone());
            table.inspection_date.push(r.inspection_date);
            table.grade.push(r.grade);
            table.score.push(r.score);
            table.latitude.push(r.latitude);
            table.longitude.push(r.longitude);
            table.violation.push(r.violation.clone());
        }

        table
    }

    fn into_records(self) -> Result<Vec<InspectionRecord>, DatasetError> {
        if self.version != CACHE_VERSION {
            return Err(DatasetError::StaleCache {
                message: format!(
                    "cache version {} does not match {CACHE_VERSION}",
                    self.version
                ),
            });
        }

        let n = self.camis.len();
        let lengths = [
            self.name.len(),
            self.borough.len(),
            self.building.len(),
            self.street.len(),
            self.zipcode.len(),
            self.cuisine.len(),
            self.phone.len(),
            self.inspection_date.len(),
            self.grade.len(),
            self.score.len(),
            self.latitude.len(),
            self.longitude.len(),
            self.violation.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(DatasetError::StaleCache {
                message: "cache columns have mismatched lengths".to_string(),
            });
        }

        let mut borough = self.borough.into_iter();
        let mut building = self.building.into_iter();
        let mut street = self.street.into_iter();
        let mut zipcode = self.zipcode.into_iter();
        let mut cuisine = self.cuisine.into_iter();
        let mut phone = self.phone.into_iter();
        let mut inspection_date = self.inspection_date.into_iter();
        let mut grade = self.grade.into_iter();
        let mut score = self.score.into_iter();
        let mut latitude = self.latitude.into_iter();
        let mut longitude = self.longitude.into_iter();
        let mut violation = self.violation.into_iter();

        let records = self
            .camis
            .into_iter()
            .zip(self.name)
            .filter_map(|(camis, name)| {
                Some(InspectionRecord {
                    camis,
                    name,
                    borough: borough.next()?,
                    building: building.next()?,
                    street: street.next()?,
                    zipcode: zipcode.next()?,
                    cuisine: cuisine.next()?,
                    phone: phone.next()?,
                    inspection_date: inspection_date.next()?,
                    grade: grade.next()?,
                    score: score.next()?,
                    latitude: latitude.next()?,
                    longitude: longitude.next()?,
                    violation: violation.next()?,
                })
            })
            .collect();

        Ok(records)
    }
}

/// Reads cleaned records from a cache file.
///
/// # Errors
///
/// Returns [`DatasetError`] if the file cannot be read or decoded, or if
/// it was written by an incompatible version.
pub fn read(path: &Path) -> Result<Vec<InspectionRecord>, DatasetError> {
    let reader = BufReader::new(File::open(path)?);
    let table: ColumnarTable = rmp_serde::from_read(reader)?;
    table.into_records()
}

/// Writes cleaned records to a cache file, replacing any existing one.
///
/// # Errors
///
/// Returns [`DatasetError`] if the file cannot be written.
pub fn write(path: &Path, records: &[InspectionRecord]) -> Result<(), DatasetError> {
    let tmp = path.with_extension("msgpack.tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        rmp_serde::encode::write_named(&mut writer, &ColumnarTable::from_records(records))?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
