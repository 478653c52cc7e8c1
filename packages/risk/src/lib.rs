#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Natural-hazard risk scoring.
//!
//! Each hazard score is a weighted sum of categorical sub-scores divided by
//! the theoretical maximum of that sum, expressed as a percentage. Because
//! every sub-score is bounded, every score lies in `[0, 100]`.
//!
//! [`details`] maps a percentage onto one of eleven canned description
//! bands per hazard.

pub mod details;

use geometrics_hazard_models::{FloodType, LandSlideType, LandUse};
use serde::{Deserialize, Serialize};

/// Hazards a parcel is scored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Hazard {
    /// River and torrential flooding
    Flood,
    /// Landslides
    LandSlide,
    /// Earthquakes
    Earthquake,
}

const FLOOD_TYPE_WEIGHT: u32 = 40;
const FLOOD_LAND_USE_WEIGHT: u32 = 30;
const FLOOD_SLOPE_WEIGHT: u32 = 20;
const FLOOD_PROXIMITY_WEIGHT: u32 = 10;

/// `3*40 + 5*30 + 3*20 + 3*10`
const FLOOD_MAX_SCORE: u32 = 3 * FLOOD_TYPE_WEIGHT
    + 5 * FLOOD_LAND_USE_WEIGHT
    + 3 * FLOOD_SLOPE_WEIGHT
    + 3 * FLOOD_PROXIMITY_WEIGHT;

const LANDSLIDE_TYPE_WEIGHT: u32 = 40;
const LANDSLIDE_SLOPE_WEIGHT: u32 = 30;
const LANDSLIDE_LAND_USE_WEIGHT: u32 = 25;
const LANDSLIDE_PROXIMITY_WEIGHT: u32 = 5;

/// `5*40 + 5*30 + 5*25 + 3*5`
const LANDSLIDE_MAX_SCORE: u32 = 5 * LANDSLIDE_TYPE_WEIGHT
    + 5 * LANDSLIDE_SLOPE_WEIGHT
    + 5 * LANDSLIDE_LAND_USE_WEIGHT
    + 3 * LANDSLIDE_PROXIMITY_WEIGHT;

/// Design ground acceleration (in g) that maps to a 100% earthquake score.
pub const EARTHQUAKE_MAX_PGA: f64 = 0.30;

/// Slope passed to the formulas while no slope layer exists.
pub const NO_SLOPE_DATA: f64 = 0.0;

/// Distance (meters) used for scoring when no water body is nearby.
pub const NO_WATER_NEARBY_M: f64 = 500.0;

/// Computes the flood risk percentage for a single flood feature.
///
/// Unknown flood types and unlisted land-use codes contribute 0 to their
/// term.
#[must_use]
pub fn flood_risk_score(
    flood_type: i32,
    land_use_code: i32,
    slope_degrees: f64,
    proximity_to_water_m: f64,
) -> f64 {
    let flood_type = FloodType::sub_score_for_code(flood_type);
    let land_use = LandUse::flood_sub_score_for_code(land_use_code);
    let slope = flood_slope_sub_score(slope_degrees);
    let proximity = proximity_sub_score(proximity_to_water_m);

    let score = flood_type * FLOOD_TYPE_WEIGHT
        + land_use * FLOOD_LAND_USE_WEIGHT
        + slope * FLOOD_SLOPE_WEIGHT
        + proximity * FLOOD_PROXIMITY_WEIGHT;

    percentage(score, FLOOD_MAX_SCORE)
}

/// Computes the landslide risk percentage for a single landslide feature.
///
/// The landslide type is clamped into 0-5 before it is weighted.
#[must_use]
pub fn landslide_risk_score(
    landslide_type: i32,
    slope_degrees: f64,
    land_use_code: i32,
    proximity_to_water_m: f64,
) -> f64 {
    let landslide_type = LandSlideType::from_code_clamped(landslide_type).level();
    let slope = landslide_slope_sub_score(slope_degrees);
    let land_use = LandUse::landslide_sub_score_for_code(land_use_code);
    let proximity = proximity_sub_score(proximity_to_water_m);

    let score = landslide_type * LANDSLIDE_TYPE_WEIGHT
        + slope * LANDSLIDE_SLOPE_WEIGHT
        + land_use * LANDSLIDE_LAND_USE_WEIGHT
        + proximity * LANDSLIDE_PROXIMITY_WEIGHT;

    percentage(score, LANDSLIDE_MAX_SCORE)
}

/// Computes the earthquake risk percentage from a design peak ground
/// acceleration.
#[must_use]
pub fn earthquake_risk_score(pga_g: f64) -> f64 {
    if !pga_g.is_finite() {
        return 0.0;
    }
    (pga_g.max(0.0) / EARTHQUAKE_MAX_PGA).min(1.0) * 100.0
}

const fn flood_slope_sub_score(slope_degrees: f64) -> u32 {
    if slope_degrees <= 2.0 {
        3
    } else if slope_degrees <= 8.0 {
        2
    } else {
        1
    }
}

const fn landslide_slope_sub_score(slope_degrees: f64) -> u32 {
    if slope_degrees <= 5.0 {
        1
    } else if slope_degrees <= 15.0 {
        2
    } else if slope_degrees <= 25.0 {
        3
    } else if slope_degrees <= 35.0 {
        4
    } else {
        5
    }
}

const fn proximity_sub_score(proximity_to_water_m: f64) -> u32 {
    if proximity_to_water_m <= 50.0 {
        3
    } else if proximity_to_water_m <= 200.0 {
        2
    } else {
        1
    }
}

fn percentage(score: u32, max: u32) -> f64 {
    f64::from(score) / f64::from(max) * 100.0
}
