//! Bulk loading of reference layers into `PostGIS`.

use geo::MultiPolygon;
use geometrics_layers::records::{LayerKind, LayerRecords};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::{DbError, geometry_json};

/// Outcome of loading one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Rows were inserted.
    Loaded(u64),
    /// The table already had rows and loading was not forced.
    Skipped(u64),
}

/// Table holding the records of `kind`.
#[must_use]
pub const fn table_name(kind: LayerKind) -> &'static str {
    match kind {
        LayerKind::CadastralMunicipalities => "cadastral_municipalities",
        LayerKind::LandLots => "land_lots",
        LayerKind::Floods => "floods",
        LayerKind::LandSlides => "landslides",
        LayerKind::LandUses => "land_uses",
        LayerKind::WaterBodies => "water_bodies",
        LayerKind::Earthquakes => "earthquake_zones",
    }
}

/// Column holding the categorical code of a coded polygon layer.
#[must_use]
pub const fn code_column(kind: LayerKind) -> Option<&'static str> {
    match kind {
        LayerKind::Floods => Some("flood_type"),
        LayerKind::LandSlides => Some("landslide_type"),
        LayerKind::LandUses => Some("raba_id"),
        LayerKind::CadastralMunicipalities
        | LayerKind::LandLots
        | LayerKind::WaterBodies
        | LayerKind::Earthquakes => None,
    }
}

/// Number of rows currently stored for `kind`.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn count_rows(db: &dyn Database, kind: LayerKind) -> Result<u64, DbError> {
    let rows = db
        .query_raw_params(
            &format!("SELECT COUNT(*) AS count FROM {}", table_name(kind)),
            &[],
        )
        .await?;

    let count: i64 = rows
        .first()
        .map_or(Ok(0), |row| row.to_value("count"))
        .map_err(|e| DbError::Conversion {
            message: format!("Failed to parse row count: {e}"),
        })?;

    Ok(u64::try_from(count).unwrap_or(0))
}

/// Loads `records` into their table.
///
/// A table that already has rows is left alone unless `force` is set, in
/// which case it is truncated first.
///
/// # Errors
///
/// Returns [`DbError`] if any database operation fails.
pub async fn load_layer(
    db: &dyn Database,
    records: &LayerRecords,
    force: bool,
) -> Result<LoadOutcome, DbError> {
    let kind = records.kind();
    let table = table_name(kind);
    let existing = count_rows(db, kind).await?;

    if existing > 0 {
        if !force {
            log::info!("{table}: {existing} rows already loaded, skipping (use --force to reload)");
            return Ok(LoadOutcome::Skipped(existing));
        }
        log::info!("{table}: truncating {existing} rows");
        db.exec_raw(&format!("TRUNCATE {table}")).await?;
    }

    let inserted = insert_records(db, records).await?;
    log::info!("{table}: inserted {inserted} of {} records", records.len());

    Ok(LoadOutcome::Loaded(inserted))
}

async fn insert_geometry_row(
    db: &dyn Database,
    sql: &str,
    mut params: Vec<DatabaseValue>,
    geometry: &MultiPolygon<f64>,
) -> Result<u64, DbError> {
    params.push(DatabaseValue::String(geometry_json(geometry)?));
    Ok(db.exec_raw_params(sql, &params).await?)
}

async fn insert_records(db: &dyn Database, records: &LayerRecords) -> Result<u64, DbError> {
    let mut inserted = 0u64;

    match records {
        LayerRecords::CadastralMunicipalities(items) => {
            for ko in items {
                inserted += db
                    .exec_raw_params(
                        "INSERT INTO cadastral_municipalities (ko_id, name)
                         VALUES ($1, $2)
                         ON CONFLICT (ko_id) DO UPDATE SET name = EXCLUDED.name",
                        &[
                            DatabaseValue::Int32(ko.ko_id),
                            DatabaseValue::String(ko.name.clone()),
                        ],
                    )
                    .await?;
            }
        }
        LayerRecords::LandLots(items) => {
            for lot in items {
                inserted += insert_geometry_row(
                    db,
                    "INSERT INTO land_lots (object_id, st_parcele, ko_id, geometry)
                     VALUES ($1, $2, $3, ST_Multi(ST_SetSRID(ST_GeomFromGeoJSON($4), 4326)))
                     ON CONFLICT (object_id) DO NOTHING",
                    vec![
                        DatabaseValue::Int64(lot.object_id),
                        DatabaseValue::String(lot.st_parcele.clone()),
                        DatabaseValue::Int32(lot.ko_id),
                    ],
                    &lot.geometry,
                )
                .await?;
            }
        }
        LayerRecords::Floods(items)
        | LayerRecords::LandSlides(items)
        | LayerRecords::LandUses(items) => {
            let kind = records.kind();
            let column = code_column(kind).ok_or_else(|| DbError::Conversion {
                message: format!("{kind} records carry no code column"),
            })?;
            let sql = format!(
                "INSERT INTO {} ({column}, geometry)
                 VALUES ($1, ST_Multi(ST_SetSRID(ST_GeomFromGeoJSON($2), 4326)))",
                table_name(kind)
            );
            for item in items {
                inserted += insert_geometry_row(
                    db,
                    &sql,
                    vec![DatabaseValue::Int32(item.code)],
                    &item.geometry,
                )
                .await?;
            }
        }
        LayerRecords::WaterBodies(items) => {
            for water in items {
                inserted += insert_geometry_row(
                    db,
                    "INSERT INTO water_bodies (name, geometry)
                     VALUES ($1, ST_Multi(ST_SetSRID(ST_GeomFromGeoJSON($2), 4326)))",
                    vec![
                        water
                            .name
                            .as_ref()
                            .map_or(DatabaseValue::Null, |n| DatabaseValue::String(n.clone())),
                    ],
                    &water.geometry,
                )
                .await?;
            }
        }
        LayerRecords::Earthquakes(items) => {
            for zone in items {
                inserted += insert_geometry_row(
                    db,
                    "INSERT INTO earthquake_zones (pga, geometry)
                     VALUES ($1, ST_Multi(ST_SetSRID(ST_GeomFromGeoJSON($2), 4326)))",
                    vec![DatabaseValue::Real64(zone.pga)],
                    &zone.geometry,
                )
                .await?;
            }
        }
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_layer_has_a_distinct_table() {
        let mut tables = LayerKind::all()
            .iter()
            .map(|&kind| table_name(kind))
            .collect::<Vec<_>>();
        tables.sort_unstable();
        tables.dedup();
        assert_eq!(tables.len(), LayerKind::all().len());
    }

    #[test]
    fn hazard_tables_match_migrations() {
        assert_eq!(table_name(LayerKind::LandSlides), "landslides");
        assert_eq!(table_name(LayerKind::Earthquakes), "earthquake_zones");
    }

    #[test]
    fn coded_layers_insert_into_their_own_table_and_column() {
        let schema = include_str!("../../../migrations/2026-01-10-000000_reference_layers/up.sql");

        for (kind, table, column) in [
            (LayerKind::Floods, "floods", "flood_type"),
            (LayerKind::LandSlides, "landslides", "landslide_type"),
            (LayerKind::LandUses, "land_uses", "raba_id"),
        ] {
            assert_eq!(table_name(kind), table);
            assert_eq!(code_column(kind), Some(column));

            let definition = schema
                .split(&format!("CREATE TABLE IF NOT EXISTS {table} ("))
                .nth(1)
                .and_then(|rest| rest.split(");").next())
                .unwrap();
            assert!(definition.contains(column), "{table} lacks {column}");
        }

        for kind in [
            LayerKind::CadastralMunicipalities,
            LayerKind::LandLots,
            LayerKind::WaterBodies,
            LayerKind::Earthquakes,
        ] {
            assert_eq!(code_column(kind), None);
        }
    }
}
