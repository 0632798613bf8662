//! Reading and writing zipcode boundary GeoJSON files.

use std::fs;
use std::path::Path;

use geojson::{FeatureCollection, GeoJson};

use crate::ZipcodeError;

/// Reads a GeoJSON `FeatureCollection` from `path`.
///
/// # Errors
///
/// Returns [`ZipcodeError`] if the file cannot be read, is not valid
/// GeoJSON, or holds something other than a feature collection.
pub fn read_geometry(path: &Path) -> Result<FeatureCollection, ZipcodeError> {
    let text = fs::read_to_string(path)?;
    let parsed: GeoJson = text.parse().map_err(Box::new)?;

    match parsed {
        GeoJson::FeatureCollection(collection) => {
            log::info!(
                "Loaded {} zipcode boundaries from {}",
                collection.features.len(),
                path.display()
            );
            Ok(collection)
        }
        GeoJson::Feature(_) | GeoJson::Geometry(_) => Err(ZipcodeError::NotFeatureCollection),
    }
}

/// Writes `collection` to `path`, creating parent directories as needed.
///
/// The file is written to a temporary sibling and renamed into place, so
/// readers never see a half-written artifact.
///
/// # Errors
///
/// Returns [`ZipcodeError`] if serialization or any filesystem step fails.
pub fn write_geometry(path: &Path, collection: &FeatureCollection) -> Result<(), ZipcodeError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let body = serde_json::to_string(collection)?;
    let tmp = path.with_extension("geojson.tmp");
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)?;

    log::info!(
        "Wrote {} zipcode features to {}",
        collection.features.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("restaurant_map_zipcode_{name}"));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn writes_then_reads_collection() {
        let dir = temp_dir("artifact_round_trip");
        let path = dir.join("generated").join("borders.geojson");

        let collection: FeatureCollection = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"modzcta": "10001"},
                "geometry": {"type": "Point", "coordinates": [-73.99, 40.75]}
            }]
        }"#
        .parse()
        .unwrap();

        write_geometry(&path, &collection).unwrap();
        let read = read_geometry(&path).unwrap();

        assert_eq!(read.features.len(), 1);
        assert_eq!(
            read.features[0].property("modzcta"),
            Some(&serde_json::json!("10001"))
        );
        assert!(!path.with_extension("geojson.tmp").exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rejects_single_feature() {
        let dir = temp_dir("artifact_single_feature");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("feature.geojson");
        fs::write(
            &path,
            r#"{"type": "Feature", "properties": {}, "geometry": null}"#,
        )
        .unwrap();

        assert!(matches!(
            read_geometry(&path),
            Err(ZipcodeError::NotFeatureCollection)
        ));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = temp_dir("artifact_missing").join("absent.geojson");
        assert!(matches!(read_geometry(&path), Err(ZipcodeError::Io(_))));
    }
}
