//! `ArcGIS` REST layer downloads.
//!
//! Pages through a layer's `query` endpoint with `f=geojson` and writes
//! all features into a single `FeatureCollection` file.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::FetchError;
use crate::config::LayerSource;

/// Options for one download.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Maximum number of features to fetch.
    pub limit: Option<u64>,
    /// Directory to store downloaded files.
    pub output_dir: PathBuf,
}

/// Whether the server reported more features beyond this page.
///
/// With `f=json` the flag sits at the top level; with `f=geojson` some
/// server versions put it under `properties`.
#[must_use]
pub fn exceeded_transfer_limit(body: &Value) -> bool {
    body.get("exceededTransferLimit")
        .or_else(|| body.pointer("/properties/exceededTransferLimit"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn take_features(body: &mut Value) -> Result<Vec<Value>, FetchError> {
    if let Some(error) = body.get("error") {
        return Err(FetchError::Service {
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }

    Ok(match body.get_mut("features").map(Value::take) {
        Some(Value::Array(features)) => features,
        _ => Vec::new(),
    })
}

/// Writes `features` as a `GeoJSON` `FeatureCollection`.
///
/// # Errors
///
/// Returns [`FetchError`] if serialization or the write fails.
pub fn write_feature_collection(path: &Path, features: Vec<Value>) -> Result<(), FetchError> {
    let collection = serde_json::json!({
        "type": "FeatureCollection",
        "features": features,
    });
    std::fs::write(path, serde_json::to_string(&collection)?)?;
    Ok(())
}

/// Downloads every feature of one layer into `<output_dir>/<file_name>`,
/// returning the output path and feature count.
///
/// # Errors
///
/// Returns [`FetchError`] if an HTTP request, the service, or file I/O
/// fails.
pub async fn download_layer(
    client: &reqwest::Client,
    label: &str,
    query_url: &str,
    source: &LayerSource,
    file_name: &str,
    options: &DownloadOptions,
) -> Result<(PathBuf, u64), FetchError> {
    std::fs::create_dir_all(&options.output_dir)?;
    let output_path = options.output_dir.join(file_name);

    let fetch_limit = options.limit.unwrap_or(u64::MAX);
    let where_clause = source.where_clause.as_deref().unwrap_or("1=1");
    let page_size = source.page_size.max(1);

    let mut all_features: Vec<Value> = Vec::new();
    let mut offset: u64 = 0;

    loop {
        let fetched = u64::try_from(all_features.len()).unwrap_or(u64::MAX);
        let remaining = fetch_limit.saturating_sub(fetched);
        if remaining == 0 {
            break;
        }
        let page_limit = remaining.min(page_size);

        log::info!("{label}: offset={offset}, limit={page_limit}");

        let mut body: Value = client
            .get(query_url)
            .query(&[
                ("where", where_clause.to_string()),
                ("outFields", "*".to_string()),
                ("outSR", "4326".to_string()),
                ("f", "geojson".to_string()),
                ("resultOffset", offset.to_string()),
                ("resultRecordCount", page_limit.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let features = take_features(&mut body)?;
        let count = features.len() as u64;
        if count == 0 {
            break;
        }

        all_features.extend(features);
        offset += count;

        // A short page is not a reliable end signal since servers cap pages
        // at their own maxRecordCount.
        if !exceeded_transfer_limit(&body) {
            break;
        }
    }

    let total = all_features.len() as u64;
    log::info!("{label}: download complete, {total} features");
    write_feature_collection(&output_path, all_features)?;

    Ok((output_path, total))
}
