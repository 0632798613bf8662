//! Header resolution for the inspection extract.
//!
//! Header names are compared after normalisation: lowercased, with every
//! run of non-alphanumeric characters collapsed to a single `_`. So
//! `"CUISINE DESCRIPTION"`, `"cuisine_description"` and
//! `"Cuisine-Description"` all name the same column.

use crate::DatasetError;

/// A column the loader knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Camis,
    Name,
    Borough,
    Building,
    Street,
    Zipcode,
    Phone,
    Cuisine,
    InspectionDate,
    Violation,
    Grade,
    Score,
    Latitude,
    Longitude,
}

impl Column {
    /// Columns that must be present in the header row.
    pub const REQUIRED: &[Self] = &[
        Self::Camis,
        Self::Name,
        Self::Borough,
        Self::Zipcode,
        Self::Cuisine,
        Self::InspectionDate,
        Self::Grade,
        Self::Score,
        Self::Latitude,
        Self::Longitude,
    ];

    /// Columns read when present.
    pub const OPTIONAL: &[Self] = &[
        Self::Building,
        Self::Street,
        Self::Phone,
        Self::Violation,
    ];

    /// Normalised header name in the open-data extract.
    #[must_use]
    pub const fn header(self) -> &'static str {
        match self {
            Self::Camis => "camis",
            Self::Name => "dba",
            Self::Borough => "boro",
            Self::Building => "building",
            Self::Street => "street",
            Self::Zipcode => "zipcode",
            Self::Phone => "phone",
            Self::Cuisine => "cuisine_description",
            Self::InspectionDate => "inspection_date",
            Self::Violation => "violation_description",
            Self::Grade => "grade",
            Self::Score => "score",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
        }
    }

    const fn slot(self) -> usize {
        self as usize
    }
}

const COLUMN_COUNT: usize = Column::Longitude as usize + 1;

/// Normalises a raw header cell for comparison.
#[must_use]
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Maps each known [`Column`] to its position in a CSV row.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    positions: [Option<usize>; COLUMN_COUNT],
}

impl ColumnMap {
    /// Resolves column positions from a header row.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Schema`] listing every missing required
    /// column.
    pub fn from_headers<'a, I>(headers: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let normalized: Vec<String> = headers.into_iter().map(normalize_header).collect();

        let mut positions = [None; COLUMN_COUNT];
        for column in Column::REQUIRED.iter().chain(Column::OPTIONAL) {
            positions[column.slot()] = normalized.iter().position(|h| h == column.header());
        }

        let missing: Vec<String> = Column::REQUIRED
            .iter()
            .filter(|c| positions[c.slot()].is_none())
            .map(|c| c.header().to_string())
            .collect();

        if !missing.is_empty() {
            return Err(DatasetError::Schema { missing });
        }

        for column in Column::OPTIONAL {
            if positions[column.slot()].is_none() {
                log::warn!("Optional column '{}' not present", column.header());
            }
        }

        Ok(Self { positions })
    }

    /// Returns the cell for `column`, or `""` when the column is absent
    /// or the row is short.
    #[must_use]
    pub fn get<'r>(&self, record: &'r csv::StringRecord, column: Column) -> &'r str {
        self.positions[column.slot()]
            .and_then(|i| record.get(i))
            .unwrap_or("")
    }
}
