//! Cell-level parsing for the inspection extract.
//!
//! Every function here maps a raw CSV cell to a typed value, returning
//! `None` for blank or unparseable input rather than failing the row.

use chrono::{NaiveDate, NaiveDateTime};

/// Inspection dates before this are placeholders (the open-data extract
/// uses `1900-01-01` for establishments that have not been inspected).
const EARLIEST_REAL_INSPECTION: (i32, u32, u32) = (2000, 1, 1);

/// Returns the trimmed cell, or `None` if it is blank.
#[must_use]
pub fn non_blank(cell: &str) -> Option<&str> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Returns an owned non-blank cell.
#[must_use]
pub fn text(cell: &str) -> Option<String> {
    non_blank(cell).map(str::to_owned)
}

/// Parses an integer that may have been written as a float (`"10001.0"`).
///
/// Fractional values and values outside `i64` are rejected.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn lenient_int(cell: &str) -> Option<i64> {
    let s = non_blank(cell)?;
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        Some(f as i64)
    } else {
        None
    }
}

/// Parses a zipcode into a five-digit integer.
#[must_use]
pub fn zipcode(cell: &str) -> Option<u32> {
    lenient_int(cell)
        .filter(|z| (1..=99_999).contains(z))
        .and_then(|z| u32::try_from(z).ok())
}

/// Parses an inspection score.
#[must_use]
pub fn score(cell: &str) -> Option<i32> {
    lenient_int(cell).and_then(|s| i32::try_from(s).ok())
}

/// Parses a finite coordinate.
#[must_use]
pub fn coordinate(cell: &str) -> Option<f64> {
    non_blank(cell)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parses an inspection date in `MM/DD/YYYY`, `YYYY-MM-DD`, or Socrata
/// ISO timestamp form. Placeholder dates are reported as `None`.
#[must_use]
pub fn inspection_date(cell: &str) -> Option<NaiveDate> {
    let s = non_blank(cell)?;

    let date = NaiveDate::parse_from_str(s, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
                .ok()
                .map(|dt| dt.date())
        })?;

    let (y, m, d) = EARLIEST_REAL_INSPECTION;
    let earliest = NaiveDate::from_ymd_opt(y, m, d)?;
    (date >= earliest).then_some(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cells_are_none() {
        assert_eq!(non_blank("   "), None);
        assert_eq!(text(""), None);
        assert_eq!(text(" PIZZA "), Some("PIZZA".to_string()));
    }

    #[test]
    fn parses_zip_written_as_float() {
        assert_eq!(zipcode("10001"), Some(10001));
        assert_eq!(zipcode("10001.0"), Some(10001));
        assert_eq!(zipcode("N/A"), None);
        assert_eq!(zipcode("0"), None);
    }

    #[test]
    fn rejects_fractional_score() {
        assert_eq!(score("12"), Some(12));
        assert_eq!(score("12.0"), Some(12));
        assert_eq!(score("12.5"), None);
        assert_eq!(score("abc"), None);
    }

    #[test]
    fn parses_coordinates() {
        assert_eq!(coordinate("40.7580"), Some(40.7580));
        assert_eq!(coordinate("NaN"), None);
        assert_eq!(coordinate(""), None);
    }

    #[test]
    fn parses_us_style_date() {
        assert_eq!(
            inspection_date("07/21/2023"),
            NaiveDate::from_ymd_opt(2023, 7, 21)
        );
    }

    #[test]
    fn parses_iso_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(inspection_date("2024-01-15"), expected);
        assert_eq!(inspection_date("2024-01-15T00:00:00.000"), expected);
        assert_eq!(inspection_date("2024-01-15T00:00:00"), expected);
    }

    #[test]
    fn placeholder_date_is_none() {
        assert_eq!(inspection_date("01/01/1900"), None);
    }

    #[test]
    fn garbage_date_is_none() {
        assert_eq!(inspection_date("yesterday"), None);
    }
}
