//! Server configuration from environment variables.

use std::path::{Path, PathBuf};

use geometrics_layers::records::FieldMap;
use serde::Deserialize;
use thiserror::Error;

/// Secret used by debug builds when `JWT_SECRET` is unset.
const DEV_JWT_SECRET: &str = "geometrics-development-secret";

/// Errors in the server environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `JWT_SECRET` must be set in release builds.
    #[error("JWT_SECRET must be set")]
    MissingJwtSecret,

    /// A variable holds an unusable value.
    #[error("Invalid value for {name}: {value}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The layers configuration file could not be read or parsed.
    #[error("Invalid layers configuration {path}: {message}")]
    LayersConfig {
        /// File that was read.
        path: String,
        /// Description of what went wrong.
        message: String,
    },
}

/// Token and password hashing settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens.
    pub jwt_secret: String,
    /// Token lifetime in hours.
    pub token_ttl_hours: i64,
    /// Bcrypt work factor.
    pub bcrypt_cost: u32,
}

/// Everything the server reads from its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
    /// Authentication settings.
    pub auth: AuthConfig,
    /// Serve reference layers from `GeoJSON` files in this directory instead
    /// of `PostGIS`.
    pub layers_dir: Option<PathBuf>,
    /// `layers.toml` whose `[fields]` table names the attributes of the
    /// files in `layers_dir`.
    pub layers_config: Option<PathBuf>,
}

/// The part of `layers.toml` the server reads.
#[derive(Debug, Deserialize)]
struct LayersToml {
    #[serde(default)]
    fields: FieldMap,
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is invalid or a required one is
    /// missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is invalid or a required one is
    /// missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None if cfg!(debug_assertions) => {
                log::warn!("JWT_SECRET is not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
            None => return Err(ConfigError::MissingJwtSecret),
        };

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            auth: AuthConfig {
                jwt_secret,
                token_ttl_hours: parse_or(&lookup, "TOKEN_TTL_HOURS", 24)?,
                bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            },
            layers_dir: lookup("GEOMETRICS_LAYERS_DIR")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            layers_config: lookup("GEOMETRICS_LAYERS_CONFIG")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        })
    }

    /// Attribute names of the in-memory layer files: the `[fields]` table of
    /// `layers_config`, or the defaults when none is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::LayersConfig`] if the file cannot be read or
    /// is not valid TOML.
    pub fn layer_fields(&self) -> Result<FieldMap, ConfigError> {
        let Some(path) = &self.layers_config else {
            return Ok(FieldMap::default());
        };

        let text = std::fs::read_to_string(path).map_err(|e| layers_config_error(path, &e))?;
        parse_layer_fields(&text).map_err(|e| layers_config_error(path, &e))
    }
}

fn parse_layer_fields(text: &str) -> Result<FieldMap, toml::de::Error> {
    toml::de::from_str::<LayersToml>(text).map(|config| config.fields)
}

fn layers_config_error(path: &Path, error: &impl std::fmt::Display) -> ConfigError {
    ConfigError::LayersConfig {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.auth.token_ttl_hours, 24);
        assert_eq!(config.auth.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.layers_dir, None);
        assert_eq!(config.layers_config, None);
        assert_eq!(config.layer_fields(), Ok(FieldMap::default()));
    }

    #[test]
    fn layer_fields_come_from_the_fields_table() {
        let fields = parse_layer_fields(
            r#"
            base_url = "https://gis.example.si/arcgis/rest/services"

            [fields]
            parcel = "PARCELA"
            land_use = "VRSTA_RABE"

            [layers.land_lots]
            service = "Kataster/MapServer/0"
            "#,
        )
        .unwrap();

        assert_eq!(fields.parcel, "PARCELA");
        assert_eq!(fields.land_use, "VRSTA_RABE");
        assert_eq!(fields.object_id, FieldMap::default().object_id);
        assert_eq!(parse_layer_fields("").unwrap(), FieldMap::default());
    }

    #[test]
    fn unreadable_layers_config_is_an_error() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("GEOMETRICS_LAYERS_CONFIG", "/nonexistent/geometrics/layers.toml"),
        ]))
        .unwrap();

        assert_eq!(
            config.layers_config,
            Some(PathBuf::from("/nonexistent/geometrics/layers.toml"))
        );
        assert!(matches!(
            config.layer_fields(),
            Err(ConfigError::LayersConfig { .. })
        ));
    }

    #[test]
    fn reads_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("PORT", "9000"),
            ("BCRYPT_COST", "4"),
            ("GEOMETRICS_LAYERS_DIR", "data/layers"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.auth.bcrypt_cost, 4);
        assert_eq!(config.layers_dir, Some(PathBuf::from("data/layers")));
    }

    #[test]
    fn rejects_bad_port() {
        let result = ServerConfig::from_lookup(lookup(&[("JWT_SECRET", "x"), ("PORT", "http")]));
        assert_eq!(
            result,
            Err(ConfigError::Invalid {
                name: "PORT",
                value: "http".to_string(),
            })
        );
    }

    #[test]
    fn debug_builds_fall_back_to_development_secret() {
        if cfg!(debug_assertions) {
            let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
            assert_eq!(config.auth.jwt_secret, DEV_JWT_SECRET);
        } else {
            assert_eq!(
                ServerConfig::from_lookup(lookup(&[])),
                Err(ConfigError::MissingJwtSecret)
            );
        }
    }
}
