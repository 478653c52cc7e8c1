//! Typed records parsed from `GeoJSON` layer files.
//!
//! The fetcher stores every layer as a `GeoJSON` `FeatureCollection`. This
//! module turns those collections into typed records, reading attributes
//! through a configurable [`FieldMap`]. Attribute values may be JSON
//! numbers or numeric strings.

use std::path::Path;

use geojson::{Feature, GeoJson};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::{
    CadastralMunicipality, CodedPolygon, EarthquakeZone, LandLot, LayerError, WaterBody,
    geometry_to_multipolygon,
};

/// The reference layers GeoMetrics works with.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LayerKind {
    /// Cadastral municipality names (attributes only)
    CadastralMunicipalities,
    /// Cadastral land lots
    LandLots,
    /// Flood hazard zones
    Floods,
    /// Landslide susceptibility zones
    LandSlides,
    /// Actual land use polygons
    LandUses,
    /// Rivers, lakes and sea
    WaterBodies,
    /// Seismic design acceleration zones
    Earthquakes,
}

impl LayerKind {
    /// Returns all variants of this enum, in load order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::CadastralMunicipalities,
            Self::LandLots,
            Self::Floods,
            Self::LandSlides,
            Self::LandUses,
            Self::WaterBodies,
            Self::Earthquakes,
        ]
    }

    /// File name of this layer inside a layers directory.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.geojson", self.as_ref())
    }
}

/// Names of the attributes read from each layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    /// Parcel `OBJECTID`.
    pub object_id: String,
    /// Parcel number.
    pub parcel: String,
    /// Cadastral municipality id.
    pub ko_id: String,
    /// Cadastral municipality name.
    pub ko_name: String,
    /// Flood recurrence class.
    pub flood_type: String,
    /// Landslide susceptibility class.
    pub landslide_type: String,
    /// Land use code.
    pub land_use: String,
    /// Water body name.
    pub water_name: String,
    /// Design ground acceleration.
    pub pga: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            object_id: "OBJECTID".to_string(),
            parcel: "ST_PARCELE".to_string(),
            ko_id: "KO_ID".to_string(),
            ko_name: "NAZIV".to_string(),
            flood_type: "FloodType".to_string(),
            landslide_type: "LandSlideType".to_string(),
            land_use: "RABA_ID".to_string(),
            water_name: "IME".to_string(),
            pga: "PGA".to_string(),
        }
    }
}

/// Parsed contents of one layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerRecords {
    /// Cadastral municipalities.
    CadastralMunicipalities(Vec<CadastralMunicipality>),
    /// Land lots.
    LandLots(Vec<LandLot>),
    /// Flood zones keyed by flood type.
    Floods(Vec<CodedPolygon>),
    /// Landslide zones keyed by severity.
    LandSlides(Vec<CodedPolygon>),
    /// Land use polygons keyed by `RABA_ID`.
    LandUses(Vec<CodedPolygon>),
    /// Water bodies.
    WaterBodies(Vec<WaterBody>),
    /// Seismic zones.
    Earthquakes(Vec<EarthquakeZone>),
}

impl LayerRecords {
    /// Layer these records belong to.
    #[must_use]
    pub const fn kind(&self) -> LayerKind {
        match self {
            Self::CadastralMunicipalities(_) => LayerKind::CadastralMunicipalities,
            Self::LandLots(_) => LayerKind::LandLots,
            Self::Floods(_) => LayerKind::Floods,
            Self::LandSlides(_) => LayerKind::LandSlides,
            Self::LandUses(_) => LayerKind::LandUses,
            Self::WaterBodies(_) => LayerKind::WaterBodies,
            Self::Earthquakes(_) => LayerKind::Earthquakes,
        }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::CadastralMunicipalities(v) => v.len(),
            Self::LandLots(v) => v.len(),
            Self::Floods(v) | Self::LandSlides(v) | Self::LandUses(v) => v.len(),
            Self::WaterBodies(v) => v.len(),
            Self::Earthquakes(v) => v.len(),
        }
    }

    /// Whether there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reads and parses the layer file of `kind` inside `dir`.
///
/// # Errors
///
/// Returns [`LayerError`] if the file cannot be read or is not a `GeoJSON`
/// `FeatureCollection`.
pub fn read_layer(dir: &Path, kind: LayerKind, fields: &FieldMap) -> Result<LayerRecords, LayerError> {
    let text = std::fs::read_to_string(dir.join(kind.file_name()))?;
    parse_layer(&text, kind, fields)
}

/// Parses a `GeoJSON` `FeatureCollection` into records of `kind`.
///
/// Features with missing attributes or without polygon geometry are
/// skipped with a warning.
///
/// # Errors
///
/// Returns [`LayerError`] if the text is not a `GeoJSON` `FeatureCollection`.
pub fn parse_layer(text: &str, kind: LayerKind, fields: &FieldMap) -> Result<LayerRecords, LayerError> {
    let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>()? else {
        return Err(LayerError::Invalid {
            message: format!("{kind}: expected a FeatureCollection"),
        });
    };

    let features = collection.features;
    let total = features.len();

    let records = match kind {
        LayerKind::CadastralMunicipalities => LayerRecords::CadastralMunicipalities(
            features
                .iter()
                .filter_map(|f| {
                    Some(CadastralMunicipality {
                        ko_id: attr_i32(f, &fields.ko_id)?,
                        name: attr_string(f, &fields.ko_name)?,
                    })
                })
                .collect(),
        ),
        LayerKind::LandLots => LayerRecords::LandLots(
            features
                .into_iter()
                .filter_map(|f| {
                    Some(LandLot {
                        object_id: attr_i64(&f, &fields.object_id)?,
                        st_parcele: attr_string(&f, &fields.parcel)?,
                        ko_id: attr_i32(&f, &fields.ko_id)?,
                        geometry: geometry_to_multipolygon(f.geometry?)?,
                    })
                })
                .collect(),
        ),
        LayerKind::Floods => LayerRecords::Floods(coded(features, &fields.flood_type)),
        LayerKind::LandSlides => LayerRecords::LandSlides(coded(features, &fields.landslide_type)),
        LayerKind::LandUses => LayerRecords::LandUses(coded(features, &fields.land_use)),
        LayerKind::WaterBodies => LayerRecords::WaterBodies(
            features
                .into_iter()
                .filter_map(|f| {
                    let name = attr_string(&f, &fields.water_name);
                    Some(WaterBody {
                        name,
                        geometry: geometry_to_multipolygon(f.geometry?)?,
                    })
                })
                .collect(),
        ),
        LayerKind::Earthquakes => LayerRecords::Earthquakes(
            features
                .into_iter()
                .filter_map(|f| {
                    Some(EarthquakeZone {
                        pga: attr_f64(&f, &fields.pga)?,
                        geometry: geometry_to_multipolygon(f.geometry?)?,
                    })
                })
                .collect(),
        ),
    };

    if records.len() < total {
        log::warn!(
            "{kind}: skipped {} of {total} features with missing attributes or geometry",
            total - records.len()
        );
    }

    Ok(records)
}

fn coded(features: Vec<Feature>, field: &str) -> Vec<CodedPolygon> {
    features
        .into_iter()
        .filter_map(|f| {
            Some(CodedPolygon {
                code: attr_i32(&f, field)?,
                geometry: geometry_to_multipolygon(f.geometry?)?,
            })
        })
        .collect()
}

fn attr<'a>(feature: &'a Feature, key: &str) -> Option<&'a serde_json::Value> {
    feature.properties.as_ref()?.get(key)
}

fn attr_f64(feature: &Feature, key: &str) -> Option<f64> {
    let value = attr(feature, key)?;
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn attr_i64(feature: &Feature, key: &str) -> Option<i64> {
    let value = attr(feature, key)?;
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn attr_i32(feature: &Feature, key: &str) -> Option<i32> {
    attr_i64(feature, key).and_then(|v| i32::try_from(v).ok())
}

fn attr_string(feature: &Feature, key: &str) -> Option<String> {
    match attr(feature, key)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"{"type":"Polygon","coordinates":[[[14.50,46.05],[14.51,46.05],[14.51,46.06],[14.50,46.06],[14.50,46.05]]]}"#;

    fn collection(features: &[String]) -> String {
        format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, features.join(","))
    }

    fn feature(properties: &str, geometry: &str) -> String {
        format!(r#"{{"type":"Feature","properties":{properties},"geometry":{geometry}}}"#)
    }

    #[test]
    fn parses_land_lots_with_string_numbers() {
        let text = collection(&[
            feature(r#"{"OBJECTID":7,"ST_PARCELE":"1021/3","KO_ID":"1722"}"#, SQUARE),
            feature(r#"{"OBJECTID":8,"KO_ID":1722}"#, SQUARE),
        ]);
        let LayerRecords::LandLots(lots) =
            parse_layer(&text, LayerKind::LandLots, &FieldMap::default()).unwrap()
        else {
            panic!("expected land lots");
        };
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].object_id, 7);
        assert_eq!(lots[0].st_parcele, "1021/3");
        assert_eq!(lots[0].ko_id, 1722);
    }

    #[test]
    fn parses_coded_layers() {
        let text = collection(&[
            feature(r#"{"FloodType":0}"#, SQUARE),
            feature(r#"{"FloodType":2}"#, "null"),
        ]);
        let records = parse_layer(&text, LayerKind::Floods, &FieldMap::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records.kind(), LayerKind::Floods);
        let LayerRecords::Floods(floods) = records else {
            panic!("expected floods");
        };
        assert_eq!(floods[0].code, 0);
    }

    #[test]
    fn municipalities_do_not_need_geometry() {
        let text = collection(&[feature(r#"{"KO_ID":1737,"NAZIV":"Tabor"}"#, "null")]);
        let records =
            parse_layer(&text, LayerKind::CadastralMunicipalities, &FieldMap::default()).unwrap();
        assert_eq!(
            records,
            LayerRecords::CadastralMunicipalities(vec![CadastralMunicipality {
                ko_id: 1737,
                name: "Tabor".to_string(),
            }])
        );
    }

    #[test]
    fn custom_field_names() {
        let fields = FieldMap {
            pga: "AG".to_string(),
            ..FieldMap::default()
        };
        let text = collection(&[feature(r#"{"AG":"0.225"}"#, SQUARE)]);
        let LayerRecords::Earthquakes(zones) =
            parse_layer(&text, LayerKind::Earthquakes, &fields).unwrap()
        else {
            panic!("expected earthquakes");
        };
        assert!((zones[0].pga - 0.225).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_non_collections() {
        assert!(parse_layer(SQUARE, LayerKind::Floods, &FieldMap::default()).is_err());
    }

    #[test]
    fn layer_names() {
        assert_eq!(LayerKind::LandSlides.file_name(), "land_slides.geojson");
        assert_eq!("water_bodies".parse::<LayerKind>().unwrap(), LayerKind::WaterBodies);
    }
}
