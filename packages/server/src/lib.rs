#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for GeoMetrics.
//!
//! Serves land-lot browsing, parcel risk assessment, user accounts, saved
//! lots and stored reports. Reference layers come from `PostGIS`, or from
//! `GeoJSON` files indexed in memory when `GEOMETRICS_LAYERS_DIR` is set.
//! Accounts always live in Postgres.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use geometrics_database::{PostgisLayers, db, run_migrations};
use geometrics_layers::{HazardLayers, KoDirectory, LotStore};
use geometrics_spatial::LayerIndex;
use switchy_database::Database;

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::handlers::{map, reports, saved_lots, users};

/// Reference data shared by the map handlers.
pub struct MapState {
    /// Land lot lookups.
    pub lots: Arc<dyn LotStore>,
    /// Hazard layer lookups.
    pub layers: Arc<dyn HazardLayers>,
    /// Cadastral municipality names, loaded once at startup.
    pub ko: KoDirectory,
}

/// Shared state of the account handlers.
pub struct AccountState {
    /// Postgres connection holding users, saved lots and reports.
    pub db: Arc<dyn Database>,
}

/// Registers every API route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::bad_request(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ApiError::bad_request(err.to_string()).into()),
    )
    .route("/health", web::get().to(handlers::health))
    .service(
        web::scope("/map")
            .route("/query/{bbox_data}", web::get().to(map::query))
            .route("/find/{land_lot_id}", web::get().to(map::find))
            .route("/find/{land_lot_id}/{ko_id}", web::get().to(map::find_in_ko))
            .route("/assess", web::post().to(map::assess))
            .route("/assess/details", web::post().to(map::assess_details)),
    )
    .service(
        web::scope("/users")
            .route("/register", web::post().to(users::register))
            .route("/login", web::post().to(users::login))
            .route("/profile", web::get().to(users::profile))
            .route("/profile", web::put().to(users::update_profile))
            .route("/profile", web::delete().to(users::delete_account))
            .route("/profile/password", web::put().to(users::change_password))
            .route("/saved-lots", web::get().to(saved_lots::list))
            .route("/saved-lots", web::post().to(saved_lots::save))
            .route("/saved-lots/{id}", web::delete().to(saved_lots::remove)),
    )
    .service(
        web::scope("/reports")
            .route("", web::get().to(reports::list))
            .route("", web::post().to(reports::create))
            .route("/{id}", web::get().to(reports::get))
            .route("/{id}", web::delete().to(reports::remove)),
    );
}

/// Starts the GeoMetrics API server.
///
/// Reads the environment, connects to Postgres, runs migrations, picks the
/// reference layer backend, loads the KO directory and serves until
/// shut down. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if startup fails, the HTTP server
/// fails to bind, or it encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env().map_err(std::io::Error::other)?;

    log::info!("Connecting to database...");
    let db_conn = db::connect_from_env()
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    log::info!("Running migrations...");
    run_migrations(db_conn.as_ref())
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let db: Arc<dyn Database> = Arc::from(db_conn);

    let (lots, layers): (Arc<dyn LotStore>, Arc<dyn HazardLayers>) =
        if let Some(dir) = &config.layers_dir {
            log::info!("Loading reference layers from {}...", dir.display());
            let fields = config.layer_fields().map_err(std::io::Error::other)?;
            let index = Arc::new(
                LayerIndex::load_dir(dir, &fields).map_err(std::io::Error::other)?,
            );
            (index.clone() as Arc<dyn LotStore>, index as Arc<dyn HazardLayers>)
        } else {
            log::info!("Serving reference layers from PostGIS");
            let postgis = Arc::new(PostgisLayers::new(db.clone()));
            (postgis.clone() as Arc<dyn LotStore>, postgis as Arc<dyn HazardLayers>)
        };

    log::info!("Loading cadastral municipalities...");
    let ko = KoDirectory::load(lots.as_ref())
        .await
        .map_err(std::io::Error::other)?;

    let map_state = web::Data::new(MapState { lots, layers, ko });
    let account_state = web::Data::new(AccountState { db });
    let auth_config = web::Data::new(config.auth.clone());

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(map_state.clone())
            .app_data(account_state.clone())
            .app_data(auth_config.clone())
            .configure(configure)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}
