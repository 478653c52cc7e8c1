#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Reference layer fetcher for GeoMetrics.
//!
//! Downloads the cadastral and hazard layers from an `ArcGIS` REST service
//! into `GeoJSON` files, then loads those files into `PostGIS`. The same
//! files can be served directly by the in-memory layer index.

pub mod arcgis;
pub mod config;

use std::path::Path;

use geometrics_database::DbError;
use geometrics_database::load::{LoadOutcome, load_layer};
use geometrics_layers::LayerError;
use geometrics_layers::records::{FieldMap, LayerKind, read_layer};
use switchy_database::Database;

use crate::arcgis::{DownloadOptions, download_layer};
use crate::config::FetchConfig;

/// Errors that can occur while fetching or loading layers.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration is inconsistent.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// The `ArcGIS` service returned an error body.
    #[error("ArcGIS service error: {message}")]
    Service {
        /// Message reported by the service.
        message: String,
    },

    /// A downloaded layer could not be parsed.
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// Database error.
    #[error(transparent)]
    Database(#[from] DbError),
}

/// Downloads `kinds` into the configured output directory. A failing layer
/// is logged and the remaining layers are still fetched.
///
/// Returns the number of layers that downloaded successfully.
///
/// # Errors
///
/// Returns [`FetchError`] if no ArcGIS server is configured or the output
/// directory cannot be created.
pub async fn fetch_layers(
    config: &FetchConfig,
    kinds: &[LayerKind],
    limit: Option<u64>,
) -> Result<usize, FetchError> {
    config.require_base_url()?;
    std::fs::create_dir_all(&config.out_dir)?;

    let client = reqwest::Client::new();
    let options = DownloadOptions {
        limit,
        output_dir: config.out_dir.clone(),
    };

    let mut succeeded = 0;
    for &kind in kinds {
        let Some(source) = config.layers.get(&kind) else {
            log::warn!("{kind}: not configured, skipping");
            continue;
        };

        let query_url = source.query_url(&config.base_url);
        match download_layer(
            &client,
            kind.as_ref(),
            &query_url,
            source,
            &kind.file_name(),
            &options,
        )
        .await
        {
            Ok((path, count)) => {
                log::info!("{kind}: wrote {count} features to {}", path.display());
                succeeded += 1;
            }
            Err(e) => log::error!("{kind}: download failed: {e}"),
        }
    }

    Ok(succeeded)
}

/// Parses the downloaded files for `kinds` and loads them into the
/// database, in the order given.
///
/// # Errors
///
/// Returns [`FetchError`] on the first layer that cannot be read or
/// inserted.
pub async fn load_layers(
    db: &dyn Database,
    dir: &Path,
    kinds: &[LayerKind],
    fields: &FieldMap,
    force: bool,
) -> Result<Vec<(LayerKind, LoadOutcome)>, FetchError> {
    let mut outcomes = Vec::with_capacity(kinds.len());

    for &kind in kinds {
        let records = read_layer(dir, kind, fields)?;
        log::info!("{kind}: parsed {} records", records.len());
        let outcome = load_layer(db, &records, force).await?;
        outcomes.push((kind, outcome));
    }

    Ok(outcomes)
}
