#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database row types.
//!
//! These types represent the shapes of account data as stored in and
//! retrieved from Postgres. They are distinct from the API response types in
//! `geometrics_server_models`, which never carry password hashes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    /// Primary key.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Bcrypt hash of the password.
    pub password_hash: String,
    /// Optional name shown in the UI.
    pub display_name: Option<String>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Fields needed to create a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Bcrypt hash of the password.
    pub password_hash: String,
    /// Optional name shown in the UI.
    pub display_name: Option<String>,
}

/// Profile fields a user may change. `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    /// New email address.
    pub email: Option<String>,
    /// New display name. `Some(None)` clears it.
    #[allow(clippy::option_option)]
    pub display_name: Option<Option<String>>,
}

/// A land lot bookmarked by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedLotRow {
    /// Primary key.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// `OBJECTID` of the lot.
    pub object_id: i64,
    /// Cadastral municipality of the lot.
    pub ko_id: i32,
    /// Parcel number.
    pub st_parcele: String,
    /// Free-form label.
    pub label: Option<String>,
    /// When the lot was saved.
    pub created_at: DateTime<Utc>,
}

/// A lot to bookmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSavedLot {
    /// `OBJECTID` of the lot.
    pub object_id: i64,
    /// Cadastral municipality of the lot.
    pub ko_id: i32,
    /// Parcel number.
    pub st_parcele: String,
    /// Free-form label.
    pub label: Option<String>,
}

/// A stored risk assessment of one lot.
///
/// Only the percentages are stored; descriptions are derived when the
/// report is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Primary key.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// `OBJECTID` of the assessed lot.
    pub object_id: i64,
    /// Cadastral municipality of the lot.
    pub ko_id: i32,
    /// Parcel number.
    pub st_parcele: String,
    /// Flood risk percentage.
    pub flood_risk: f64,
    /// Landslide risk percentage.
    pub land_slide_risk: f64,
    /// Earthquake risk percentage.
    pub earthquake_risk: f64,
    /// When the assessment was made.
    pub created_at: DateTime<Utc>,
}

/// An assessment to store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    /// `OBJECTID` of the assessed lot.
    pub object_id: i64,
    /// Cadastral municipality of the lot.
    pub ko_id: i32,
    /// Parcel number.
    pub st_parcele: String,
    /// Flood risk percentage.
    pub flood_risk: f64,
    /// Landslide risk percentage.
    pub land_slide_risk: f64,
    /// Earthquake risk percentage.
    pub earthquake_risk: f64,
}
