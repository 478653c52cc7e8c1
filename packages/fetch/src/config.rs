//! Layer download configuration.
//!
//! The default configuration is embedded from `layers.toml` at compile
//! time; another file can be passed on the command line.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr as _;

use geometrics_layers::records::{FieldMap, LayerKind};
use serde::Deserialize;

use crate::FetchError;

/// Embedded default configuration.
pub const DEFAULT_LAYERS_TOML: &str = include_str!("../layers.toml");

/// Environment variable overriding [`FetchConfig::base_url`].
pub const BASE_URL_ENV: &str = "GEOMETRICS_ARCGIS_BASE_URL";

/// `base_url` of the embedded configuration. It names no real server.
const PLACEHOLDER_BASE_URL: &str = "https://localhost/arcgis/rest/services";

const fn default_page_size() -> u64 {
    1000
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("data/layers")
}

/// Where one layer is downloaded from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LayerSource {
    /// Layer path relative to the base URL, e.g. `Folder/Service/MapServer/0`.
    pub service: String,
    /// Max records per request.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Optional `where` clause. Defaults to `1=1`.
    #[serde(default)]
    pub where_clause: Option<String>,
}

impl LayerSource {
    /// Full URL of the layer's `query` endpoint.
    #[must_use]
    pub fn query_url(&self, base_url: &str) -> String {
        format!(
            "{}/{}/query",
            base_url.trim_end_matches('/'),
            self.service.trim_matches('/')
        )
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    base_url: String,
    #[serde(default = "default_out_dir")]
    out_dir: PathBuf,
    #[serde(default)]
    fields: FieldMap,
    #[serde(default)]
    layers: BTreeMap<String, LayerSource>,
}

/// Parsed `layers.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// ArcGIS REST services root.
    pub base_url: String,
    /// Directory the `GeoJSON` files are written to.
    pub out_dir: PathBuf,
    /// Attribute names used when parsing downloaded layers.
    pub fields: FieldMap,
    /// Configured layers.
    pub layers: BTreeMap<LayerKind, LayerSource>,
}

impl FetchConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the TOML is invalid or names an unknown
    /// layer.
    pub fn parse(text: &str) -> Result<Self, FetchError> {
        let raw: RawConfig = toml::de::from_str(text)?;

        let layers = raw
            .layers
            .into_iter()
            .map(|(name, source)| {
                LayerKind::from_str(&name)
                    .map(|kind| (kind, source))
                    .map_err(|_| FetchError::Config {
                        message: format!("Unknown layer: {name}"),
                    })
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self {
            base_url: raw.base_url,
            out_dir: raw.out_dir,
            fields: raw.fields,
            layers,
        })
    }

    /// Loads the configuration from `path`, or the embedded default, then
    /// applies the [`BASE_URL_ENV`] override.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, FetchError> {
        let mut config = match path {
            Some(path) => Self::parse(&std::fs::read_to_string(path)?)?,
            None => Self::parse(DEFAULT_LAYERS_TOML)?,
        };

        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            log::info!("Using ArcGIS base URL from {BASE_URL_ENV}: {base_url}");
            config.base_url = base_url;
        }

        Ok(config)
    }

    /// Checks that `base_url` names a real server.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Config`] while the embedded placeholder is
    /// still in place.
    pub fn require_base_url(&self) -> Result<(), FetchError> {
        if self.base_url.trim_end_matches('/') == PLACEHOLDER_BASE_URL {
            return Err(FetchError::Config {
                message: format!(
                    "No ArcGIS server configured: set {BASE_URL_ENV} or pass --config"
                ),
            });
        }
        Ok(())
    }

    /// Selects layers by a comma-separated list of names, or every
    /// configured layer when `None`, in load order.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Config`] for unknown or unconfigured names.
    pub fn select(&self, names: Option<&str>) -> Result<Vec<LayerKind>, FetchError> {
        let Some(names) = names else {
            return Ok(LayerKind::all()
                .iter()
                .copied()
                .filter(|kind| self.layers.contains_key(kind))
                .collect());
        };

        let mut kinds = names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                LayerKind::from_str(name)
                    .ok()
                    .filter(|kind| self.layers.contains_key(kind))
                    .ok_or_else(|| FetchError::Config {
                        message: format!("Layer not configured: {name}"),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        kinds.sort_unstable();
        kinds.dedup();
        Ok(kinds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_lists_every_layer() {
        let config = FetchConfig::parse(DEFAULT_LAYERS_TOML).unwrap();
        for kind in LayerKind::all() {
            assert!(config.layers.contains_key(kind), "missing {kind}");
        }
        assert_eq!(config.fields, FieldMap::default());
        assert_eq!(config.layers[&LayerKind::LandLots].page_size, 2000);
        assert_eq!(config.layers[&LayerKind::Floods].page_size, 1000);
    }

    #[test]
    fn embedded_base_url_must_be_overridden() {
        let mut config = FetchConfig::parse(DEFAULT_LAYERS_TOML).unwrap();
        assert!(matches!(
            config.require_base_url(),
            Err(FetchError::Config { .. })
        ));

        config.base_url = "https://gis.example.si/arcgis/rest/services".to_string();
        assert!(config.require_base_url().is_ok());
    }

    #[test]
    fn query_url_joins_cleanly() {
        let source = LayerSource {
            service: "/Hazards/MapServer/0/".to_string(),
            page_size: 1000,
            where_clause: None,
        };
        assert_eq!(
            source.query_url("https://gis.example.com/arcgis/rest/services/"),
            "https://gis.example.com/arcgis/rest/services/Hazards/MapServer/0/query"
        );
    }

    #[test]
    fn unknown_layer_is_rejected() {
        let result = FetchConfig::parse(
            r#"
            base_url = "https://gis.example.com"
            [layers.rivers]
            service = "Hydro/MapServer/0"
            "#,
        );
        assert!(matches!(result, Err(FetchError::Config { .. })));
    }

    #[test]
    fn select_keeps_load_order() {
        let config = FetchConfig::parse(DEFAULT_LAYERS_TOML).unwrap();
        let kinds = config.select(Some("floods, land_lots,floods")).unwrap();
        assert_eq!(kinds, vec![LayerKind::LandLots, LayerKind::Floods]);
        assert_eq!(config.select(None).unwrap().len(), LayerKind::all().len());
        assert!(config.select(Some("rivers")).is_err());
    }
}
