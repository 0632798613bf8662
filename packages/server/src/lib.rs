#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the restaurant map application.
//!
//! Loads the inspection extract and the zipcode boundaries once at startup,
//! writes the graded boundary artifact, and serves proximity search and
//! zipcode grade queries. Startup data errors are fatal; per-request errors
//! are returned as JSON.

pub mod config;
mod handlers;
pub mod paths;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use geojson::FeatureCollection;
use restaurant_map_dataset::{DatasetError, DatasetHandle, LoadOptions};
use restaurant_map_geocoder::{GeocodeError, Geocoder};
use restaurant_map_search::SearchEngine;
use restaurant_map_server_models::ApiReload;
use restaurant_map_zipcode::{Aggregation, ZipcodeError, aggregate, artifact};
use thiserror::Error;

use crate::config::ServerConfig;

/// Startup and reload failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Zipcode(#[from] ZipcodeError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// Search engine (owns the dataset handle and the geocoder).
    pub engine: SearchEngine,
    /// Zipcode boundaries as loaded at startup.
    pub boundaries: FeatureCollection,
    /// Latest aggregation, swapped whole on reload.
    aggregation: RwLock<Arc<Aggregation>>,
    /// Where the merged boundary file is written, if anywhere.
    graded_zipcodes: Option<PathBuf>,
    /// Held for the whole of [`AppState::reload`].
    reload_lock: Mutex<()>,
}

impl AppState {
    /// Builds the state and runs the first aggregation.
    ///
    /// When `graded_zipcodes` is set, the merged boundaries are written
    /// there; a failed write is logged and does not fail startup.
    #[must_use]
    pub fn new(
        engine: SearchEngine,
        boundaries: FeatureCollection,
        graded_zipcodes: Option<PathBuf>,
    ) -> Self {
        let aggregation = aggregate(&engine.dataset().current(), &boundaries);
        let state = Self {
            engine,
            boundaries,
            aggregation: RwLock::new(Arc::new(aggregation)),
            graded_zipcodes,
            reload_lock: Mutex::new(()),
        };
        state.persist(&state.aggregation());
        state
    }

    /// The current aggregation snapshot.
    #[must_use]
    pub fn aggregation(&self) -> Arc<Aggregation> {
        Arc::clone(
            &self
                .aggregation
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Reloads the dataset from its source and re-runs the aggregation.
    ///
    /// On failure the previous dataset and aggregation stay in service.
    /// Concurrent reloads run one at a time, so the dataset and aggregation
    /// always come from the same load.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Dataset`] if the source cannot be loaded.
    pub fn reload(&self) -> Result<ApiReload, ServerError> {
        let _guard = self
            .reload_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let dataset = self.engine.dataset().reload()?;
        let aggregation = Arc::new(aggregate(&dataset, &self.boundaries));

        *self
            .aggregation
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::clone(&aggregation);
        self.persist(&aggregation);

        Ok(ApiReload {
            rows: dataset.len(),
            establishments: dataset.establishment_count(),
            zipcodes: aggregation.grades.len(),
        })
    }

    fn persist(&self, aggregation: &Aggregation) {
        let Some(path) = &self.graded_zipcodes else {
            return;
        };
        if let Err(e) = artifact::write_geometry(path, &aggregation.geometry) {
            log::error!("Failed to write {}: {e}", path.display());
        }
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/search", web::post().to(handlers::search))
            .route("/zipcodes/grades", web::get().to(handlers::zipcode_grades))
            .route("/zipcodes/geojson", web::get().to(handlers::zipcode_geojson))
            .route("/reload", web::post().to(handlers::reload)),
    );
}

/// Loads all startup data described by `config`.
///
/// # Errors
///
/// Returns [`ServerError`] if the inspection extract or the boundary file
/// cannot be loaded, or no geocoding service is configured.
pub fn build_state(config: &ServerConfig) -> Result<AppState, ServerError> {
    log::info!("Loading inspections from {}...", config.inspections_csv.display());
    let dataset = DatasetHandle::open(&config.inspections_csv, LoadOptions::default())?;

    log::info!("Loading zipcode boundaries from {}...", config.zipcode_geojson.display());
    let boundaries = artifact::read_geometry(&config.zipcode_geojson)?;

    let geocoder = Geocoder::from_registry()?;
    let engine = SearchEngine::new(Arc::new(dataset), Arc::new(geocoder));

    Ok(AppState::new(
        engine,
        boundaries,
        Some(config.graded_zipcodes.clone()),
    ))
}

/// Starts the restaurant map API server.
///
/// This is a regular async function; the caller provides the runtime (e.g.
/// via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError`] if startup data cannot be loaded or the HTTP
/// server fails to bind.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let state = web::Data::new(build_state(&config)?);

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
