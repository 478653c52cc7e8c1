//! `PostGIS` implementation of the layer lookups.
//!
//! Every reference layer lives in its own table with a `geometry` column
//! (SRID 4326) and a GiST index. Query shapes are sent as `GeoJSON` and
//! lots come back through `ST_AsGeoJSON`.

use std::sync::Arc;

use async_trait::async_trait;
use geo::{MultiPolygon, Point, Polygon};
use geometrics_layers::{
    CadastralMunicipality, HazardLayers, LandLot, LandUseOverlap, LayerError, LotStore,
    parse_geojson_to_multipolygon,
};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};

use crate::{DbError, geometry_json};

const LOT_COLUMNS: &str = "object_id, st_parcele, ko_id, ST_AsGeoJSON(geometry) AS geojson";

/// Layer lookups backed by the `PostGIS` reference tables.
#[derive(Clone)]
pub struct PostgisLayers {
    db: Arc<dyn Database>,
}

impl std::fmt::Debug for PostgisLayers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgisLayers").finish_non_exhaustive()
    }
}

impl PostgisLayers {
    /// Wraps a database connection.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    async fn query(&self, sql: &str, params: &[DatabaseValue]) -> Result<Vec<Row>, LayerError> {
        self.db
            .query_raw_params(sql, params)
            .await
            .map_err(|e| query_error(&DbError::from(e)))
    }
}

fn query_error(e: &DbError) -> LayerError {
    LayerError::Query {
        message: e.to_string(),
    }
}

fn polygon_param(area: &Polygon<f64>) -> Result<DatabaseValue, LayerError> {
    geometry_json(area)
        .map(DatabaseValue::String)
        .map_err(|e| query_error(&e))
}

fn lot_from_row(row: &Row) -> Option<LandLot> {
    let geojson: String = row.to_value("geojson").unwrap_or_default();
    let Some(geometry) = parse_geojson_to_multipolygon(&geojson) else {
        log::warn!("Skipping land lot with unreadable geometry");
        return None;
    };

    Some(LandLot {
        object_id: row.to_value("object_id").ok()?,
        st_parcele: row.to_value("st_parcele").unwrap_or_default(),
        ko_id: row.to_value("ko_id").unwrap_or(0),
        geometry,
    })
}

fn codes(rows: &[Row], column: &str) -> Vec<i32> {
    rows.iter()
        .filter_map(|row| {
            let code: i32 = row.to_value(column).ok()?;
            Some(code)
        })
        .collect()
}

#[async_trait]
impl HazardLayers for PostgisLayers {
    async fn land_use_overlaps(
        &self,
        area: &Polygon<f64>,
    ) -> Result<Vec<LandUseOverlap>, LayerError> {
        let rows = self
            .query(
                "WITH area AS (SELECT ST_SetSRID(ST_GeomFromGeoJSON($1), 4326) AS geom)
                 SELECT lu.raba_id,
                        ST_Area(ST_Intersection(lu.geometry, area.geom))
                            / NULLIF(ST_Area(area.geom), 0) AS fraction
                 FROM land_uses lu, area
                 WHERE ST_Intersects(lu.geometry, area.geom)",
                &[polygon_param(area)?],
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let fraction: Option<f64> = row.to_value("fraction").unwrap_or(None);
                Some(LandUseOverlap {
                    raba_id: row.to_value("raba_id").ok()?,
                    fraction: fraction.unwrap_or(0.0),
                })
            })
            .collect())
    }

    async fn water_distances(
        &self,
        origin: Point<f64>,
        within_m: f64,
    ) -> Result<Vec<f64>, LayerError> {
        let rows = self
            .query(
                "WITH origin AS (
                     SELECT ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography AS geog
                 )
                 SELECT ST_Distance(w.geometry::geography, origin.geog) AS distance
                 FROM water_bodies w, origin
                 WHERE ST_DWithin(w.geometry::geography, origin.geog, $3)
                 ORDER BY distance",
                &[
                    DatabaseValue::Real64(origin.x()),
                    DatabaseValue::Real64(origin.y()),
                    DatabaseValue::Real64(within_m),
                ],
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let distance: f64 = row.to_value("distance").ok()?;
                Some(distance)
            })
            .collect())
    }

    async fn flood_types(&self, area: &Polygon<f64>) -> Result<Vec<i32>, LayerError> {
        let rows = self
            .query(
                "SELECT flood_type FROM floods
                 WHERE ST_Intersects(geometry, ST_SetSRID(ST_GeomFromGeoJSON($1), 4326))",
                &[polygon_param(area)?],
            )
            .await?;

        Ok(codes(&rows, "flood_type"))
    }

    async fn landslide_types(
        &self,
        area: &Polygon<f64>,
        limit: usize,
    ) -> Result<Vec<i32>, LayerError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self
            .query(
                "SELECT landslide_type FROM landslides
                 WHERE ST_Intersects(geometry, ST_SetSRID(ST_GeomFromGeoJSON($1), 4326))
                 ORDER BY landslide_type DESC
                 LIMIT $2",
                &[polygon_param(area)?, DatabaseValue::Int64(limit)],
            )
            .await?;

        Ok(codes(&rows, "landslide_type"))
    }

    async fn earthquake_pga(&self, point: Point<f64>) -> Result<Option<f64>, LayerError> {
        let rows = self
            .query(
                "SELECT MAX(pga) AS pga FROM earthquake_zones
                 WHERE ST_Intersects(geometry, ST_SetSRID(ST_MakePoint($1, $2), 4326))",
                &[
                    DatabaseValue::Real64(point.x()),
                    DatabaseValue::Real64(point.y()),
                ],
            )
            .await?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let pga: Option<f64> = row.to_value("pga").unwrap_or(None);
        Ok(pga)
    }
}

#[async_trait]
impl LotStore for PostgisLayers {
    async fn lots_in_region(
        &self,
        region: &MultiPolygon<f64>,
    ) -> Result<Vec<LandLot>, LayerError> {
        let region = geometry_json(region).map_err(|e| query_error(&e))?;
        let rows = self
            .query(
                &format!(
                    "SELECT {LOT_COLUMNS} FROM land_lots
                     WHERE ST_Intersects(geometry, ST_SetSRID(ST_GeomFromGeoJSON($1), 4326))"
                ),
                &[DatabaseValue::String(region)],
            )
            .await?;

        Ok(rows.iter().filter_map(lot_from_row).collect())
    }

    async fn find_lots(
        &self,
        st_parcele: &str,
        ko_id: Option<i32>,
    ) -> Result<Vec<LandLot>, LayerError> {
        let rows = if let Some(ko_id) = ko_id {
            self.query(
                &format!(
                    "SELECT {LOT_COLUMNS} FROM land_lots
                     WHERE st_parcele = $1 AND ko_id = $2
                     ORDER BY ko_id, object_id"
                ),
                &[
                    DatabaseValue::String(st_parcele.to_string()),
                    DatabaseValue::Int32(ko_id),
                ],
            )
            .await?
        } else {
            self.query(
                &format!(
                    "SELECT {LOT_COLUMNS} FROM land_lots
                     WHERE st_parcele = $1
                     ORDER BY ko_id, object_id"
                ),
                &[DatabaseValue::String(st_parcele.to_string())],
            )
            .await?
        };

        Ok(rows.iter().filter_map(lot_from_row).collect())
    }

    async fn lot_by_object_id(&self, object_id: i64) -> Result<Option<LandLot>, LayerError> {
        let rows = self
            .query(
                &format!("SELECT {LOT_COLUMNS} FROM land_lots WHERE object_id = $1"),
                &[DatabaseValue::Int64(object_id)],
            )
            .await?;

        Ok(rows.first().and_then(lot_from_row))
    }

    async fn cadastral_municipalities(&self) -> Result<Vec<CadastralMunicipality>, LayerError> {
        let rows = self
            .query(
                "SELECT ko_id, name FROM cadastral_municipalities ORDER BY ko_id",
                &[],
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                Some(CadastralMunicipality {
                    ko_id: row.to_value("ko_id").ok()?,
                    name: row.to_value("name").unwrap_or_default(),
                })
            })
            .collect())
    }
}
