#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database connection, queries, and migrations for GeoMetrics.
//!
//! Uses `switchy_database` for connections and `switchy_schema` for
//! embedded SQL migrations. `PostGIS` spatial queries use raw SQL via
//! `query_raw_params()`, with geometry passed in and out as `GeoJSON`.

pub mod accounts;
pub mod db;
pub mod load;
pub mod postgis;

use include_dir::{Dir, include_dir};
use switchy_database::Database;
use switchy_schema::discovery::embedded::EmbeddedMigrationSource;
use switchy_schema::runner::MigrationRunner;

pub use postgis::PostgisLayers;

/// Embedded SQL migrations from the `migrations/` directory.
static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/../../migrations");

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] switchy_schema::MigrationError),

    /// A unique value is already taken.
    #[error("{message}")]
    Conflict {
        /// Description of the conflicting value.
        message: String,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Runs all pending database migrations.
///
/// # Errors
///
/// Returns [`DbError`] if any migration fails to apply.
pub async fn run_migrations(db: &dyn Database) -> Result<(), DbError> {
    let source = EmbeddedMigrationSource::new(&MIGRATIONS_DIR);
    let runner = MigrationRunner::new(Box::new(source));
    runner.run(db).await?;
    log::info!("Database migrations completed successfully");
    Ok(())
}

/// Serializes a geometry as a `GeoJSON` geometry object for
/// `ST_GeomFromGeoJSON`.
///
/// # Errors
///
/// Returns [`DbError::Conversion`] if serialization fails.
pub fn geometry_json<'a, G>(geometry: &'a G) -> Result<String, DbError>
where
    geojson::Value: From<&'a G>,
{
    let geometry = geojson::Geometry::new(geojson::Value::from(geometry));
    serde_json::to_string(&geometry).map_err(|e| DbError::Conversion {
        message: format!("Failed to serialize geometry: {e}"),
    })
}
