#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the GeoMetrics server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the database row types so password hashes never leave the server
//! and report descriptions are derived on read.

use chrono::{DateTime, Utc};
use geometrics_database_models::{ReportRow, SavedLotRow, UserRow};
use geometrics_risk::details::{earthquake_details, flood_details, landslide_details};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Error body returned with every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    /// What went wrong.
    pub message: String,
}

/// Lots inside a changed map region, as `GeoJSON` features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiLotsResponse {
    /// One feature per lot.
    pub data: Vec<geojson::Feature>,
}

/// A lot matched by parcel number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiFoundLot {
    /// Cadastral municipality id.
    pub ko_id: i32,
    /// Cadastral municipality name, empty when unknown.
    pub ko_name: String,
    /// Parcel number.
    pub st_parcele: String,
    /// `[minX, minY, maxX, maxY]` of the lot.
    pub bbox: [f64; 4],
}

/// Body of the assessment endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AssessRequest {
    /// Polygon rings as `[[[lng, lat], ...], ...]`, exterior ring first.
    pub bounds: Vec<Vec<[f64; 2]>>,
}

/// `POST /users/register` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Plain-text password.
    pub password: String,
    /// Optional name shown in the UI.
    pub display_name: Option<String>,
}

/// `POST /users/login` body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub username: String,
    /// Plain-text password.
    pub password: String,
}

/// `PUT /users/profile` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    /// New email address.
    pub email: Option<String>,
    /// New display name.
    pub display_name: Option<String>,
}

/// `PUT /users/profile/password` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    /// Password the user has now.
    pub current_password: String,
    /// Password to switch to.
    pub new_password: String,
}

/// A user as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUser {
    /// User id.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Name shown in the UI.
    pub display_name: Option<String>,
    /// When the account was created (ISO 8601).
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for ApiUser {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            display_name: row.display_name,
            created_at: row.created_at,
        }
    }
}

/// Token issued on register and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for the `Authorization` header.
    pub token: String,
    /// The authenticated user.
    pub user: ApiUser,
}

/// `POST /users/saved-lots` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveLotRequest {
    /// `OBJECTID` of the lot.
    pub object_id: i64,
    /// Cadastral municipality id.
    pub ko_id: i32,
    /// Parcel number.
    pub st_parcele: String,
    /// Free-form label.
    pub label: Option<String>,
}

/// A saved lot as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSavedLot {
    /// Saved lot id.
    pub id: i64,
    /// `OBJECTID` of the lot.
    pub object_id: i64,
    /// Cadastral municipality id.
    pub ko_id: i32,
    /// Parcel number.
    pub st_parcele: String,
    /// Free-form label.
    pub label: Option<String>,
    /// When the lot was saved.
    pub created_at: DateTime<Utc>,
}

impl From<SavedLotRow> for ApiSavedLot {
    fn from(row: SavedLotRow) -> Self {
        Self {
            id: row.id,
            object_id: row.object_id,
            ko_id: row.ko_id,
            st_parcele: row.st_parcele,
            label: row.label,
            created_at: row.created_at,
        }
    }
}

/// `POST /reports` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    /// `OBJECTID` of the lot to assess.
    pub object_id: i64,
}

/// A stored report with its risk descriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReport {
    /// Report id.
    pub id: i64,
    /// `OBJECTID` of the assessed lot.
    pub object_id: i64,
    /// Cadastral municipality id.
    pub ko_id: i32,
    /// Parcel number.
    pub st_parcele: String,
    /// Flood risk percentage.
    pub flood_risk: f64,
    /// Flood risk description.
    pub flood_description: String,
    /// Landslide risk percentage.
    pub land_slide_risk: f64,
    /// Landslide risk description.
    pub land_slide_description: String,
    /// Earthquake risk percentage.
    pub earthquake_risk: f64,
    /// Earthquake risk description.
    pub earthquake_description: String,
    /// When the assessment was made.
    pub created_at: DateTime<Utc>,
}

impl From<ReportRow> for ApiReport {
    fn from(row: ReportRow) -> Self {
        Self {
            id: row.id,
            object_id: row.object_id,
            ko_id: row.ko_id,
            st_parcele: row.st_parcele,
            flood_risk: row.flood_risk,
            flood_description: flood_details(row.flood_risk).to_string(),
            land_slide_risk: row.land_slide_risk,
            land_slide_description: landslide_details(row.land_slide_risk).to_string(),
            earthquake_risk: row.earthquake_risk,
            earthquake_description: earthquake_details(row.earthquake_risk).to_string(),
            created_at: row.created_at,
        }
    }
}
