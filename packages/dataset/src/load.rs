//! CSV extract → cleaned [`InspectionRecord`]s.

use std::io::Read;

use restaurant_map_inspection_models::{Grade, InspectionRecord, NYC_BOUNDS};

use crate::columns::{Column, ColumnMap};
use crate::{DatasetError, LoadStats, parsing};

/// Why a row was dropped during cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropReason {
    MissingIdentity,
    MissingName,
    MissingCoordinates,
    MissingDate,
    OutOfBounds,
}

/// Reads and cleans every row of a CSV extract.
///
/// Rows that cannot be decoded or fail a cleaning rule are counted in the
/// returned [`LoadStats`] and dropped.
///
/// # Errors
///
/// Returns [`DatasetError::Schema`] if the header row is missing a
/// required column, or [`DatasetError::Csv`] if the header row cannot be
/// read.
pub fn read_csv<R: Read>(reader: R) -> Result<(Vec<InspectionRecord>, LoadStats), DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let columns = ColumnMap::from_headers(reader.headers()?.iter())?;

    let mut stats = LoadStats::default();
    let mut records = Vec::new();

    for (i, result) in reader.records().enumerate() {
        stats.total_rows += 1;

        let row = match result {
            Ok(row) => row,
            Err(e) => {
                log::warn!("Unreadable CSV row {}: {e}", i + 1);
                stats.unreadable += 1;
                continue;
            }
        };

        match clean_row(&columns, &row) {
            Ok(record) => records.push(record),
            Err(reason) => match reason {
                DropReason::MissingIdentity => stats.missing_identity += 1,
                DropReason::MissingName => stats.missing_name += 1,
                DropReason::MissingCoordinates => stats.missing_coordinates += 1,
                DropReason::MissingDate => stats.missing_date += 1,
                DropReason::OutOfBounds => stats.out_of_bounds += 1,
            },
        }
    }

    stats.kept = records.len();
    Ok((records, stats))
}

fn clean_row(columns: &ColumnMap, row: &csv::StringRecord) -> Result<InspectionRecord, DropReason> {
    let cell = |column| columns.get(row, column);

    let camis = parsing::text(cell(Column::Camis)).ok_or(DropReason::MissingIdentity)?;
    let name = parsing::text(cell(Column::Name)).ok_or(DropReason::MissingName)?;

    let (Some(latitude), Some(longitude)) = (
        parsing::coordinate(cell(Column::Latitude)),
        parsing::coordinate(cell(Column::Longitude)),
    ) else {
        return Err(DropReason::MissingCoordinates);
    };

    let inspection_date =
        parsing::inspection_date(cell(Column::InspectionDate)).ok_or(DropReason::MissingDate)?;

    if !NYC_BOUNDS.contains(latitude, longitude) {
        return Err(DropReason::OutOfBounds);
    }

    Ok(InspectionRecord {
        camis,
        name,
        borough: parsing::text(cell(Column::Borough)),
        building: parsing::text(cell(Column::Building)),
        street: parsing::text(cell(Column::Street)),
        zipcode: parsing::zipcode(cell(Column::Zipcode)),
        cuisine: parsing::text(cell(Column::Cuisine)),
        phone: parsing::text(cell(Column::Phone)),
        inspection_date,
        grade: parse_grade(cell(Column::Grade)),
        score: parsing::score(cell(Column::Score)),
        latitude,
        longitude,
        violation: parsing::text(cell(Column::Violation)),
    })
}

fn parse_grade(cell: &str) -> Option<Grade> {
    let code = parsing::non_blank(cell)?;
    code.parse::<Grade>().map_or_else(
        |_| {
            log::debug!("Unknown grade code '{code}', treating as absent");
            None
        },
        Some,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "CAMIS,DBA,BORO,BUILDING,STREET,ZIPCODE,PHONE,CUISINE DESCRIPTION,\
                          INSPECTION DATE,VIOLATION DESCRIPTION,SCORE,GRADE,Latitude,Longitude\n";

    fn parse(rows: &str) -> (Vec<InspectionRecord>, LoadStats) {
        read_csv(format!("{HEADER}{rows}").as_bytes()).unwrap()
    }

    #[test]
    fn parses_a_clean_row() {
        let (records, stats) = parse(
            "40356018,RIVIERA CATERERS,Brooklyn,2780,STILLWELL AVENUE,11224.0,7183723031,\
             American,06/15/2023,Food not protected,12,A,40.579505,-73.982065\n",
        );
        assert_eq!(stats.kept, 1);
        let r = &records[0];
        assert_eq!(r.camis, "40356018");
        assert_eq!(r.zipcode, Some(11224));
        assert_eq!(r.grade, Some(Grade::A));
        assert_eq!(r.score, Some(12));
        assert_eq!(r.violation.as_deref(), Some("Food not protected"));
    }

    #[test]
    fn keeps_unparseable_score_and_missing_grade_as_null() {
        let (records, _) = parse(
            "1,CAFE,Manhattan,1,BROADWAY,10001,,Cafe,06/15/2023,,abc,,40.75,-73.99\n",
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].score, None);
        assert_eq!(records[0].grade, None);
        assert_eq!(records[0].phone, None);
    }

    #[test]
    fn drops_rows_missing_mandatory_fields() {
        let (records, stats) = parse(
            "1,,Manhattan,1,BROADWAY,10001,,Cafe,06/15/2023,,10,A,40.75,-73.99\n\
             2,CAFE,Manhattan,1,BROADWAY,10001,,Cafe,06/15/2023,,10,A,,-73.99\n\
             3,CAFE,Manhattan,1,BROADWAY,10001,,Cafe,01/01/1900,,10,A,40.75,-73.99\n\
             ,CAFE,Manhattan,1,BROADWAY,10001,,Cafe,06/15/2023,,10,A,40.75,-73.99\n",
        );
        assert!(records.is_empty());
        assert_eq!(stats.missing_name, 1);
        assert_eq!(stats.missing_coordinates, 1);
        assert_eq!(stats.missing_date, 1);
        assert_eq!(stats.missing_identity, 1);
        assert_eq!(stats.total_rows, 4);
    }

    #[test]
    fn drops_rows_outside_nyc() {
        let (records, stats) = parse(
            "1,CAFE,Manhattan,1,BROADWAY,10001,,Cafe,06/15/2023,,10,A,0,0\n\
             2,CAFE,Manhattan,1,BROADWAY,10001,,Cafe,06/15/2023,,10,A,42.36,-71.06\n",
        );
        assert!(records.is_empty());
        assert_eq!(stats.out_of_bounds, 2);
    }

    #[test]
    fn unknown_grade_is_absent() {
        let (records, _) = parse(
            "1,CAFE,Manhattan,1,BROADWAY,10001,,Cafe,06/15/2023,,10,G,40.75,-73.99\n",
        );
        assert_eq!(records[0].grade, None);
    }

    #[test]
    fn missing_column_is_schema_failure() {
        let err = read_csv("CAMIS,DBA\n1,CAFE\n".as_bytes()).unwrap_err();
        assert!(err.is_schema_failure());
    }
}
