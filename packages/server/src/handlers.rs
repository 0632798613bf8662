//! HTTP handler functions for the restaurant map API.

use actix_web::{HttpResponse, web};
use restaurant_map_search::{SearchError, SearchOptions};
use restaurant_map_server_models::{ApiError, ApiHealth, SearchRequest, SearchResponse};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /api/search`
///
/// Finds establishments near an address. A blank address is a `400`; an
/// address that cannot be located is a `200` with an empty result and an
/// `error` reason. A `limit` of `0` lifts the result cap.
pub async fn search(state: web::Data<AppState>, body: web::Json<SearchRequest>) -> HttpResponse {
    let defaults = SearchOptions::default();
    let options = SearchOptions {
        radius_miles: body.radius.unwrap_or(defaults.radius_miles),
        limit: match body.limit {
            Some(0) => None,
            Some(limit) => Some(limit),
            None => defaults.limit,
        },
    };

    match state.engine.search(&body.address, options).await {
        Ok(result) => HttpResponse::Ok().json(SearchResponse::ok(result)),
        Err(e @ SearchError::EmptyAddress) => {
            HttpResponse::BadRequest().json(SearchResponse::failed(e.reason()))
        }
        Err(e @ SearchError::GeocodeFailure { .. }) => {
            log::info!("{e}");
            HttpResponse::Ok().json(SearchResponse::failed(e.reason()))
        }
    }
}

/// `GET /api/zipcodes/grades`
///
/// Returns the average grade and color of every zipcode.
pub async fn zipcode_grades(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.aggregation().grades)
}

/// `GET /api/zipcodes/geojson`
///
/// Returns the zipcode boundaries merged with average grades.
pub async fn zipcode_geojson(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/geo+json")
        .json(&state.aggregation().geometry)
}

/// `POST /api/reload`
///
/// Reloads the inspection extract and re-runs the zipcode aggregation.
/// Searches in flight keep the dataset they started with.
pub async fn reload(state: web::Data<AppState>) -> HttpResponse {
    let state = state.into_inner();
    match web::block(move || state.reload()).await {
        Ok(Ok(summary)) => {
            log::info!(
                "Reloaded {} rows ({} establishments, {} zipcodes)",
                summary.rows,
                summary.establishments,
                summary.zipcodes
            );
            HttpResponse::Ok().json(summary)
        }
        Ok(Err(e)) => {
            log::error!("Reload failed: {e}");
            HttpResponse::InternalServerError().json(ApiError {
                error: format!("Reload failed: {e}"),
            })
        }
        Err(e) => {
            log::error!("Reload task failed: {e}");
            HttpResponse::InternalServerError().json(ApiError {
                error: "Reload failed".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::{App, http::StatusCode, test};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use restaurant_map_dataset::{Dataset, DatasetHandle, LoadOptions, LoadStats};
    use restaurant_map_geocoder::{
        GeocodeError, GeocodeProvider, GeocodedAddress, Geocoder, GeocoderConfig,
    };
    use restaurant_map_inspection_models::{Grade, InspectionRecord};
    use restaurant_map_search::SearchEngine;
    use serde_json::Value;

    use crate::{AppState, configure};

    struct MidtownOnly;

    #[async_trait]
    impl GeocodeProvider for MidtownOnly {
        fn name(&self) -> &str {
            "midtown"
        }

        async fn geocode(&self, query: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
            Ok(query.starts_with("350 5th Ave").then(|| GeocodedAddress {
                latitude: 40.7484,
                longitude: -73.9857,
                matched_address: Some("Empire State Building".to_string()),
            }))
        }
    }

    fn record(camis: &str, grade: Grade) -> InspectionRecord {
        InspectionRecord {
            camis: camis.to_string(),
            name: format!("Restaurant {camis}"),
            borough: Some("Manhattan".to_string()),
            building: Some("350".to_string()),
            street: Some("5 AVENUE".to_string()),
            zipcode: Some(10118),
            cuisine: Some("Coffee/Tea".to_string()),
            phone: Some("2125551234".to_string()),
            inspection_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            grade: Some(grade),
            score: Some(9),
            latitude: 40.7485,
            longitude: -73.9856,
            violation: None,
        }
    }

    fn state(source: PathBuf) -> AppState {
        let dataset = Dataset::from_records(
            vec![record("1", Grade::A), record("2", Grade::C)],
            LoadStats::default(),
        );
        let handle = DatasetHandle::from_dataset(&source, LoadOptions { use_cache: false }, dataset);
        let geocoder = Geocoder::new(
            Arc::new(MidtownOnly),
            GeocoderConfig {
                min_delay: Duration::ZERO,
                ..GeocoderConfig::default()
            },
        );
        let boundaries = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"modzcta": "10118"}, "geometry": null},
                {"type": "Feature", "properties": {"modzcta": "10001"}, "geometry": null}
            ]
        }"#
        .parse()
        .unwrap();

        AppState::new(
            SearchEngine::new(Arc::new(handle), Arc::new(geocoder)),
            boundaries,
            None,
        )
    }

    fn missing_source() -> PathBuf {
        std::env::temp_dir()
            .join("restaurant_map_server_handlers")
            .join("absent.csv")
    }

    #[actix_web::test]
    async fn search_returns_nearby_restaurants() {
        let app = test::init_service(
            App::new()
                .app_data(actix_web::web::Data::new(state(missing_source())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(serde_json::json!({"address": "350 5th Ave", "radius": 0.5}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert!(body["error"].is_null());
        assert_eq!(body["search_location"]["label"], "350 5th Ave");
        assert_eq!(
            body["search_location"]["matched_address"],
            "Empire State Building"
        );
        assert_eq!(body["restaurants"].as_array().unwrap().len(), 2);
        assert_eq!(body["inspection_history"]["1"][0]["grade"], "A");
    }

    #[actix_web::test]
    async fn zero_limit_returns_every_nearby_restaurant() {
        let app = test::init_service(
            App::new()
                .app_data(actix_web::web::Data::new(state(missing_source())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(serde_json::json!({"address": "350 5th Ave", "limit": 1}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["restaurants"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(serde_json::json!({"address": "350 5th Ave", "limit": 0}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["restaurants"].as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn blank_address_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(actix_web::web::Data::new(state(missing_source())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(serde_json::json!({"address": "   "}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn unknown_address_is_empty_result_with_reason() {
        let app = test::init_service(
            App::new()
                .app_data(actix_web::web::Data::new(state(missing_source())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/search")
            .set_json(serde_json::json!({"address": "1 Nowhere Lane"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().is_some_and(|s| !s.is_empty()));
        assert_eq!(body["restaurants"], serde_json::json!([]));
    }

    #[actix_web::test]
    async fn zipcode_grades_and_geojson() {
        let app = test::init_service(
            App::new()
                .app_data(actix_web::web::Data::new(state(missing_source())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/zipcodes/grades")
            .to_request();
        let grades: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            grades,
            serde_json::json!([{"zipcode": 10118, "average_grade": 2.0, "color": "#008000"}])
        );

        let req = test::TestRequest::get()
            .uri("/api/zipcodes/geojson")
            .to_request();
        let geojson: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(geojson["features"][0]["properties"]["color"], "#008000");
        assert!(geojson["features"][1]["properties"]["color"].is_null());
    }

    #[actix_web::test]
    async fn failed_reload_keeps_serving_previous_data() {
        let app = test::init_service(
            App::new()
                .app_data(actix_web::web::Data::new(state(missing_source())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/reload").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let req = test::TestRequest::get()
            .uri("/api/zipcodes/grades")
            .to_request();
        let grades: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(grades.as_array().unwrap().len(), 1);
    }
}
