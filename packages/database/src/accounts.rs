//! Users, saved lots and reports.
//!
//! Every write is a single statement. Rows owned by a user are always
//! filtered by `user_id` so one account can never see or delete another's
//! data. Deleting a user cascades to its saved lots and reports.

use chrono::{DateTime, NaiveDateTime, Utc};
use geometrics_database_models::{
    NewReport, NewSavedLot, NewUser, ReportRow, SavedLotRow, UserRow, UserUpdate,
};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};

use crate::DbError;

const USER_COLUMNS: &str = "id, username, email, password_hash, display_name, created_at";
const SAVED_LOT_COLUMNS: &str = "id, user_id, object_id, ko_id, st_parcele, label, created_at";
const REPORT_COLUMNS: &str = "id, user_id, object_id, ko_id, st_parcele, \
     flood_risk, land_slide_risk, earthquake_risk, created_at";

fn optional_string(value: Option<&String>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |v| DatabaseValue::String(v.clone()))
}

fn created_at(row: &Row) -> DateTime<Utc> {
    let naive: NaiveDateTime = row.to_value("created_at").unwrap_or_default();
    DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
}

fn conversion(what: &str, e: impl std::fmt::Display) -> DbError {
    DbError::Conversion {
        message: format!("Failed to parse {what}: {e}"),
    }
}

fn user_from_row(row: &Row) -> Result<UserRow, DbError> {
    Ok(UserRow {
        id: row.to_value("id").map_err(|e| conversion("user id", e))?,
        username: row.to_value("username").unwrap_or_default(),
        email: row.to_value("email").unwrap_or_default(),
        password_hash: row.to_value("password_hash").unwrap_or_default(),
        display_name: row.to_value("display_name").unwrap_or(None),
        created_at: created_at(row),
    })
}

fn saved_lot_from_row(row: &Row) -> Result<SavedLotRow, DbError> {
    Ok(SavedLotRow {
        id: row.to_value("id").map_err(|e| conversion("saved lot id", e))?,
        user_id: row.to_value("user_id").unwrap_or(0),
        object_id: row.to_value("object_id").unwrap_or(0),
        ko_id: row.to_value("ko_id").unwrap_or(0),
        st_parcele: row.to_value("st_parcele").unwrap_or_default(),
        label: row.to_value("label").unwrap_or(None),
        created_at: created_at(row),
    })
}

fn report_from_row(row: &Row) -> Result<ReportRow, DbError> {
    Ok(ReportRow {
        id: row.to_value("id").map_err(|e| conversion("report id", e))?,
        user_id: row.to_value("user_id").unwrap_or(0),
        object_id: row.to_value("object_id").unwrap_or(0),
        ko_id: row.to_value("ko_id").unwrap_or(0),
        st_parcele: row.to_value("st_parcele").unwrap_or_default(),
        flood_risk: row.to_value("flood_risk").unwrap_or(0.0),
        land_slide_risk: row.to_value("land_slide_risk").unwrap_or(0.0),
        earthquake_risk: row.to_value("earthquake_risk").unwrap_or(0.0),
        created_at: created_at(row),
    })
}

/// Creates a user.
///
/// # Errors
///
/// Returns [`DbError::Conflict`] if the username or email is taken, or
/// [`DbError`] if the database operation fails.
pub async fn create_user(db: &dyn Database, user: &NewUser) -> Result<UserRow, DbError> {
    let rows = db
        .query_raw_params(
            &format!(
                "INSERT INTO users (username, email, password_hash, display_name)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT DO NOTHING
                 RETURNING {USER_COLUMNS}"
            ),
            &[
                DatabaseValue::String(user.username.clone()),
                DatabaseValue::String(user.email.clone()),
                DatabaseValue::String(user.password_hash.clone()),
                optional_string(user.display_name.as_ref()),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conflict {
        message: "Username or email already taken".to_string(),
    })?;

    user_from_row(row)
}

/// Looks up a user by username or email.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn find_user_by_login(db: &dyn Database, login: &str) -> Result<Option<UserRow>, DbError> {
    let rows = db
        .query_raw_params(
            &format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE username = $1 OR email = $1
                 ORDER BY (username = $1) DESC
                 LIMIT 1"
            ),
            &[DatabaseValue::String(login.to_string())],
        )
        .await?;

    rows.first().map(user_from_row).transpose()
}

/// Looks up a user by id.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_user(db: &dyn Database, user_id: i64) -> Result<Option<UserRow>, DbError> {
    let rows = db
        .query_raw_params(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"),
            &[DatabaseValue::Int64(user_id)],
        )
        .await?;

    rows.first().map(user_from_row).transpose()
}

/// Applies a profile update, returning the updated user if it exists.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails, including when the
/// new email is already taken.
pub async fn update_user(
    db: &dyn Database,
    user_id: i64,
    update: &UserUpdate,
) -> Result<Option<UserRow>, DbError> {
    let rows = db
        .query_raw_params(
            &format!(
                "UPDATE users SET
                     email = COALESCE($2, email),
                     display_name = CASE
                         WHEN $3::text IS NULL THEN display_name
                         ELSE NULLIF($3::text, '')
                     END
                 WHERE id = $1
                 RETURNING {USER_COLUMNS}"
            ),
            &[
                DatabaseValue::Int64(user_id),
                optional_string(update.email.as_ref()),
                match &update.display_name {
                    None => DatabaseValue::Null,
                    Some(name) => DatabaseValue::String(name.clone().unwrap_or_default()),
                },
            ],
        )
        .await?;

    rows.first().map(user_from_row).transpose()
}

/// Replaces a user's password hash. Returns whether the user exists.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn update_password_hash(
    db: &dyn Database,
    user_id: i64,
    password_hash: &str,
) -> Result<bool, DbError> {
    let updated = db
        .exec_raw_params(
            "UPDATE users SET password_hash = $2 WHERE id = $1",
            &[
                DatabaseValue::Int64(user_id),
                DatabaseValue::String(password_hash.to_string()),
            ],
        )
        .await?;

    Ok(updated > 0)
}

/// Deletes a user together with its saved lots and reports. Returns whether
/// the user existed.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn delete_user(db: &dyn Database, user_id: i64) -> Result<bool, DbError> {
    let deleted = db
        .exec_raw_params(
            "DELETE FROM users WHERE id = $1",
            &[DatabaseValue::Int64(user_id)],
        )
        .await?;

    Ok(deleted > 0)
}

/// Lists a user's saved lots, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_saved_lots(db: &dyn Database, user_id: i64) -> Result<Vec<SavedLotRow>, DbError> {
    let rows = db
        .query_raw_params(
            &format!(
                "SELECT {SAVED_LOT_COLUMNS} FROM saved_lots
                 WHERE user_id = $1
                 ORDER BY created_at DESC, id DESC"
            ),
            &[DatabaseValue::Int64(user_id)],
        )
        .await?;

    rows.iter().map(saved_lot_from_row).collect()
}

/// Saves a lot for a user. Saving the same lot again keeps the existing row
/// and only replaces its label when a new one is given.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn save_lot(
    db: &dyn Database,
    user_id: i64,
    lot: &NewSavedLot,
) -> Result<SavedLotRow, DbError> {
    let rows = db
        .query_raw_params(
            &format!(
                "INSERT INTO saved_lots (user_id, object_id, ko_id, st_parcele, label)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (user_id, object_id) DO UPDATE SET
                     label = COALESCE(EXCLUDED.label, saved_lots.label)
                 RETURNING {SAVED_LOT_COLUMNS}"
            ),
            &[
                DatabaseValue::Int64(user_id),
                DatabaseValue::Int64(lot.object_id),
                DatabaseValue::Int32(lot.ko_id),
                DatabaseValue::String(lot.st_parcele.clone()),
                optional_string(lot.label.as_ref()),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Failed to get saved lot from upsert".to_string(),
    })?;

    saved_lot_from_row(row)
}

/// Deletes one of a user's saved lots. Returns whether it existed.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn delete_saved_lot(db: &dyn Database, user_id: i64, id: i64) -> Result<bool, DbError> {
    let deleted = db
        .exec_raw_params(
            "DELETE FROM saved_lots WHERE id = $1 AND user_id = $2",
            &[DatabaseValue::Int64(id), DatabaseValue::Int64(user_id)],
        )
        .await?;

    Ok(deleted > 0)
}

/// Stores a report for a user.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn insert_report(
    db: &dyn Database,
    user_id: i64,
    report: &NewReport,
) -> Result<ReportRow, DbError> {
    let rows = db
        .query_raw_params(
            &format!(
                "INSERT INTO reports (
                     user_id, object_id, ko_id, st_parcele,
                     flood_risk, land_slide_risk, earthquake_risk
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING {REPORT_COLUMNS}"
            ),
            &[
                DatabaseValue::Int64(user_id),
                DatabaseValue::Int64(report.object_id),
                DatabaseValue::Int32(report.ko_id),
                DatabaseValue::String(report.st_parcele.clone()),
                DatabaseValue::Real64(report.flood_risk),
                DatabaseValue::Real64(report.land_slide_risk),
                DatabaseValue::Real64(report.earthquake_risk),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Failed to get report from insert".to_string(),
    })?;

    report_from_row(row)
}

/// Lists a user's reports, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_reports(db: &dyn Database, user_id: i64) -> Result<Vec<ReportRow>, DbError> {
    let rows = db
        .query_raw_params(
            &format!(
                "SELECT {REPORT_COLUMNS} FROM reports
                 WHERE user_id = $1
                 ORDER BY created_at DESC, id DESC"
            ),
            &[DatabaseValue::Int64(user_id)],
        )
        .await?;

    rows.iter().map(report_from_row).collect()
}

/// Looks up one of a user's reports.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_report(
    db: &dyn Database,
    user_id: i64,
    id: i64,
) -> Result<Option<ReportRow>, DbError> {
    let rows = db
        .query_raw_params(
            &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1 AND user_id = $2"),
            &[DatabaseValue::Int64(id), DatabaseValue::Int64(user_id)],
        )
        .await?;

    rows.first().map(report_from_row).transpose()
}

/// Deletes one of a user's reports. Returns whether it existed.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn delete_report(db: &dyn Database, user_id: i64, id: i64) -> Result<bool, DbError> {
    let deleted = db
        .exec_raw_params(
            "DELETE FROM reports WHERE id = $1 AND user_id = $2",
            &[DatabaseValue::Int64(id), DatabaseValue::Int64(user_id)],
        )
        .await?;

    Ok(deleted > 0)
}
