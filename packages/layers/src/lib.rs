#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reference layers and the spatial lookups performed against them.
//!
//! The reference data (land lots, flood and landslide zones, land use,
//! water bodies, seismic zones and cadastral municipalities) is immutable
//! once loaded. Two traits describe every spatial query the application
//! needs:
//!
//! * [`HazardLayers`]: lookups used by the risk assessment.
//! * [`LotStore`]: land-lot browsing and search.
//!
//! Both are implemented over `PostGIS` (`geometrics_database`) and over
//! in-memory R-trees (`geometrics_spatial`).

pub mod ko;
pub mod records;

use async_trait::async_trait;
use geo::{BoundingRect, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use ko::KoDirectory;

/// Errors that can occur while reading or querying reference layers.
#[derive(Debug, Error)]
pub enum LayerError {
    /// I/O failure while reading a layer file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The layer file is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backing store failed to answer a query.
    #[error("Layer query failed: {message}")]
    Query {
        /// Description of what went wrong.
        message: String,
    },

    /// A layer record is malformed.
    #[error("Invalid layer data: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// A cadastral land lot (parcel).
#[derive(Debug, Clone, PartialEq)]
pub struct LandLot {
    /// Unique `OBJECTID` of the parcel in the source layer.
    pub object_id: i64,
    /// Parcel number (`ST_PARCELE`), unique within a cadastral municipality.
    pub st_parcele: String,
    /// Cadastral municipality id (`KO_ID`).
    pub ko_id: i32,
    /// Parcel outline in WGS84.
    pub geometry: MultiPolygon<f64>,
}

impl LandLot {
    /// Returns the parcel bounding box as `[minX, minY, maxX, maxY]`.
    #[must_use]
    pub fn bbox(&self) -> Option<[f64; 4]> {
        self.geometry
            .bounding_rect()
            .map(|rect| [rect.min().x, rect.min().y, rect.max().x, rect.max().y])
    }
}

/// A cadastral municipality (katastrska občina).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadastralMunicipality {
    /// `KO_ID`
    pub ko_id: i32,
    /// Municipality name.
    pub name: String,
}

/// A polygon carrying a single categorical code (flood type, landslide
/// severity or `RABA_ID`).
#[derive(Debug, Clone, PartialEq)]
pub struct CodedPolygon {
    /// Categorical code of the feature.
    pub code: i32,
    /// Feature outline in WGS84.
    pub geometry: MultiPolygon<f64>,
}

/// A water body polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterBody {
    /// Optional name of the river, lake or sea.
    pub name: Option<String>,
    /// Outline in WGS84.
    pub geometry: MultiPolygon<f64>,
}

/// A seismic hazard zone.
#[derive(Debug, Clone, PartialEq)]
pub struct EarthquakeZone {
    /// Design peak ground acceleration in g.
    pub pga: f64,
    /// Zone outline in WGS84.
    pub geometry: MultiPolygon<f64>,
}

/// How much of an assessed area one land-use polygon covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandUseOverlap {
    /// `RABA_ID` of the land-use polygon.
    pub raba_id: i32,
    /// Intersection area divided by the assessed area (0-1).
    pub fraction: f64,
}

/// Spatial lookups used by the risk assessment.
#[async_trait]
pub trait HazardLayers: Send + Sync {
    /// Land-use polygons overlapping `area`, with the covered fraction.
    async fn land_use_overlaps(
        &self,
        area: &Polygon<f64>,
    ) -> Result<Vec<LandUseOverlap>, LayerError>;

    /// Distances in meters from `origin` to every water body within
    /// `within_m` meters, nearest first.
    async fn water_distances(
        &self,
        origin: Point<f64>,
        within_m: f64,
    ) -> Result<Vec<f64>, LayerError>;

    /// Flood type codes of every flood zone intersecting `area`.
    async fn flood_types(&self, area: &Polygon<f64>) -> Result<Vec<i32>, LayerError>;

    /// Landslide severity codes of the zones intersecting `area`, most
    /// severe first, at most `limit` of them.
    async fn landslide_types(
        &self,
        area: &Polygon<f64>,
        limit: usize,
    ) -> Result<Vec<i32>, LayerError>;

    /// Highest design ground acceleration of the seismic zones covering
    /// `point`.
    async fn earthquake_pga(&self, point: Point<f64>) -> Result<Option<f64>, LayerError>;
}

/// Land-lot browsing and search.
#[async_trait]
pub trait LotStore: Send + Sync {
    /// Lots intersecting `region`.
    async fn lots_in_region(
        &self,
        region: &MultiPolygon<f64>,
    ) -> Result<Vec<LandLot>, LayerError>;

    /// Lots with the parcel number `st_parcele`, restricted to `ko_id`
    /// when given.
    async fn find_lots(
        &self,
        st_parcele: &str,
        ko_id: Option<i32>,
    ) -> Result<Vec<LandLot>, LayerError>;

    /// Lot with the given `OBJECTID`.
    async fn lot_by_object_id(&self, object_id: i64) -> Result<Option<LandLot>, LayerError>;

    /// Every cadastral municipality.
    async fn cadastral_municipalities(&self) -> Result<Vec<CadastralMunicipality>, LayerError>;
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
///
/// Handles both `Polygon` and `MultiPolygon` geometry types; anything else
/// yields `None`.
#[must_use]
pub fn geometry_to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Parses a `GeoJSON` geometry string into a [`MultiPolygon`].
#[must_use]
pub fn parse_geojson_to_multipolygon(geojson_str: &str) -> Option<MultiPolygon<f64>> {
    let geojson: geojson::GeoJson = geojson_str.parse().ok()?;
    if let geojson::GeoJson::Geometry(geom) = geojson {
        geometry_to_multipolygon(geom)
    } else {
        None
    }
}
