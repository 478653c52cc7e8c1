#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hazard codes and land-use lookup tables.
//!
//! Defines the categorical codes carried by the reference layers (flood
//! type, landslide severity and the Slovenian `RABA_ID` land-use
//! classification) together with the fixed sub-score tables the risk
//! formulas are built on.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Flood recurrence class carried by the flood hazard layer (`FloodType`).
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FloodType {
    /// Code 0: frequently flooded area
    Common = 0,
    /// Code 1: rarely flooded area
    Rare = 1,
    /// Code 2: rare but catastrophic floods
    RareCatastrophic = 2,
}

impl FloodType {
    /// Returns the layer code of this flood type.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Creates a flood type from its layer code.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Common),
            1 => Some(Self::Rare),
            2 => Some(Self::RareCatastrophic),
            _ => None,
        }
    }

    /// Ordinal severity used by the flood formula.
    ///
    /// Inverted on purpose: commonly flooded zones contribute more risk
    /// than rarely flooded ones.
    #[must_use]
    pub const fn sub_score(self) -> u32 {
        match self {
            Self::Common => 3,
            Self::Rare => 2,
            Self::RareCatastrophic => 1,
        }
    }

    /// Sub-score for a raw layer code. Unknown codes score 0.
    #[must_use]
    pub const fn sub_score_for_code(code: i32) -> u32 {
        match Self::from_code(code) {
            Some(flood_type) => flood_type.sub_score(),
            None => 0,
        }
    }
}

/// Landslide susceptibility class carried by the landslide layer
/// (`LandSlideType`), from 0 (insignificant) to 5 (very high).
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LandSlideType {
    /// Level 0
    Insignificant = 0,
    /// Level 1
    VeryLow = 1,
    /// Level 2
    Low = 2,
    /// Level 3
    Moderate = 3,
    /// Level 4
    High = 4,
    /// Level 5
    VeryHigh = 5,
}

impl LandSlideType {
    /// Highest landslide severity level.
    pub const MAX_LEVEL: u32 = 5;

    /// Returns the numeric severity level.
    #[must_use]
    pub const fn level(self) -> u32 {
        self as u32
    }

    /// Creates a landslide class from a raw layer code, clamping it into
    /// `0..=MAX_LEVEL`.
    #[must_use]
    pub const fn from_code_clamped(code: i32) -> Self {
        let level = if code <= 0 { 0 } else { code.unsigned_abs() };
        let level = if level > Self::MAX_LEVEL {
            Self::MAX_LEVEL
        } else {
            level
        };

        match level {
            0 => Self::Insignificant,
            1 => Self::VeryLow,
            2 => Self::Low,
            3 => Self::Moderate,
            4 => Self::High,
            _ => Self::VeryHigh,
        }
    }
}

/// Broad grouping of land-use codes. The risk tables are defined per class.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LandUseClass {
    /// Built-up land
    Urban,
    /// Fields, meadows, orchards and other cultivated land
    Agricultural,
    /// Overgrowing or uncultivated agricultural land
    Transitional,
    /// Forest
    Forest,
    /// Marshes, reeds and marsh meadows
    Wetland,
    /// Open land with sparse or no vegetation
    Open,
    /// Surface water
    Water,
}

impl LandUseClass {
    /// Land-use sub-score for the flood formula (1-5).
    #[must_use]
    pub const fn flood_sub_score(self) -> u32 {
        match self {
            Self::Urban => 5,
            Self::Agricultural => 4,
            Self::Transitional | Self::Open => 3,
            Self::Forest => 2,
            Self::Wetland | Self::Water => 1,
        }
    }

    /// Land-use sub-score for the landslide formula (1-5).
    #[must_use]
    pub const fn landslide_sub_score(self) -> u32 {
        match self {
            Self::Urban => 5,
            Self::Agricultural => 4,
            Self::Transitional | Self::Wetland => 3,
            Self::Forest => 2,
            Self::Open | Self::Water => 1,
        }
    }
}

/// Actual land use categories (`RABA_ID`) of the Slovenian land-use
/// register.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LandUse {
    // ── Agricultural ────────────────────────────────────
    /// 1100
    ArableField,
    /// 1160
    HopField,
    /// 1180
    PermanentCropsOnArableLand,
    /// 1190
    Greenhouse,
    /// 1211
    Vineyard,
    /// 1212
    Nursery,
    /// 1221
    IntensiveOrchard,
    /// 1222
    ExtensiveOrchard,
    /// 1230
    OliveGrove,
    /// 1240
    OtherPermanentPlantation,
    /// 1300
    PermanentMeadow,

    // ── Wetland ─────────────────────────────────────────
    /// 1321
    MarshMeadow,

    // ── Transitional ────────────────────────────────────
    /// 1410
    OvergrowingAgriculturalLand,
    /// 1420
    ForestTreePlantation,
    /// 1500
    TreesAndShrubs,
    /// 1600
    UncultivatedAgriculturalLand,
    /// 1800
    AgriculturalLandWithForestTrees,

    // ── Forest ──────────────────────────────────────────
    /// 2000
    Forest,

    // ── Urban ───────────────────────────────────────────
    /// 3000
    BuiltUp,

    // ── Wetland ─────────────────────────────────────────
    /// 4100
    Marsh,
    /// 4210
    Reeds,
    /// 4220
    OtherMarshyLand,

    // ── Open ────────────────────────────────────────────
    /// 5000
    DryOpenLandWithSpecialVegetation,
    /// 6000
    OpenLandWithoutVegetation,

    // ── Water ───────────────────────────────────────────
    /// 7000
    Water,
}

impl LandUse {
    /// Land use assumed when a parcel overlaps no land-use polygon.
    pub const DEFAULT: Self = Self::BuiltUp;

    /// Returns the `RABA_ID` code of this land use.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ArableField => 1100,
            Self::HopField => 1160,
            Self::PermanentCropsOnArableLand => 1180,
            Self::Greenhouse => 1190,
            Self::Vineyard => 1211,
            Self::Nursery => 1212,
            Self::IntensiveOrchard => 1221,
            Self::ExtensiveOrchard => 1222,
            Self::OliveGrove => 1230,
            Self::OtherPermanentPlantation => 1240,
            Self::PermanentMeadow => 1300,
            Self::MarshMeadow => 1321,
            Self::OvergrowingAgriculturalLand => 1410,
            Self::ForestTreePlantation => 1420,
            Self::TreesAndShrubs => 1500,
            Self::UncultivatedAgriculturalLand => 1600,
            Self::AgriculturalLandWithForestTrees => 1800,
            Self::Forest => 2000,
            Self::BuiltUp => 3000,
            Self::Marsh => 4100,
            Self::Reeds => 4210,
            Self::OtherMarshyLand => 4220,
            Self::DryOpenLandWithSpecialVegetation => 5000,
            Self::OpenLandWithoutVegetation => 6000,
            Self::Water => 7000,
        }
    }

    /// Looks up a land use by its `RABA_ID` code.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Self::all().iter().copied().find(|land_use| land_use.code() == code)
    }

    /// Returns the class this land use belongs to.
    #[must_use]
    pub const fn class(self) -> LandUseClass {
        match self {
            Self::ArableField
            | Self::HopField
            | Self::PermanentCropsOnArableLand
            | Self::Greenhouse
            | Self::Vineyard
            | Self::Nursery
            | Self::IntensiveOrchard
            | Self::ExtensiveOrchard
            | Self::OliveGrove
            | Self::OtherPermanentPlantation
            | Self::PermanentMeadow => LandUseClass::Agricultural,
            Self::MarshMeadow | Self::Marsh | Self::Reeds | Self::OtherMarshyLand => {
                LandUseClass::Wetland
            }
            Self::OvergrowingAgriculturalLand
            | Self::ForestTreePlantation
            | Self::TreesAndShrubs
            | Self::UncultivatedAgriculturalLand
            | Self::AgriculturalLandWithForestTrees => LandUseClass::Transitional,
            Self::Forest => LandUseClass::Forest,
            Self::BuiltUp => LandUseClass::Urban,
            Self::DryOpenLandWithSpecialVegetation | Self::OpenLandWithoutVegetation => {
                LandUseClass::Open
            }
            Self::Water => LandUseClass::Water,
        }
    }

    /// Flood land-use sub-score for a raw code. Unlisted codes score 0.
    #[must_use]
    pub fn flood_sub_score_for_code(code: i32) -> u32 {
        Self::from_code(code).map_or(0, |land_use| land_use.class().flood_sub_score())
    }

    /// Landslide land-use sub-score for a raw code. Unlisted codes score 1.
    #[must_use]
    pub fn landslide_sub_score_for_code(code: i32) -> u32 {
        Self::from_code(code).map_or(1, |land_use| land_use.class().landslide_sub_score())
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::ArableField,
            Self::HopField,
            Self::PermanentCropsOnArableLand,
            Self::Greenhouse,
            Self::Vineyard,
            Self::Nursery,
            Self::IntensiveOrchard,
            Self::ExtensiveOrchard,
            Self::OliveGrove,
            Self::OtherPermanentPlantation,
            Self::PermanentMeadow,
            Self::MarshMeadow,
            Self::OvergrowingAgriculturalLand,
            Self::ForestTreePlantation,
            Self::TreesAndShrubs,
            Self::UncultivatedAgriculturalLand,
            Self::AgriculturalLandWithForestTrees,
            Self::Forest,
            Self::BuiltUp,
            Self::Marsh,
            Self::Reeds,
            Self::OtherMarshyLand,
            Self::DryOpenLandWithSpecialVegetation,
            Self::OpenLandWithoutVegetation,
            Self::Water,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn land_use_codes_are_unique() {
        let mut codes: Vec<i32> = LandUse::all().iter().map(|l| l.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 25);
    }

    #[test]
    fn land_use_code_roundtrip() {
        for land_use in LandUse::all() {
            assert_eq!(LandUse::from_code(land_use.code()), Some(*land_use));
        }
        assert_eq!(LandUse::from_code(9999), None);
    }

    #[test]
    fn flood_table_bounds() {
        assert_eq!(LandUse::flood_sub_score_for_code(3000), 5);
        assert_eq!(LandUse::flood_sub_score_for_code(7000), 1);
        assert_eq!(LandUse::flood_sub_score_for_code(4100), 1);
        assert_eq!(LandUse::flood_sub_score_for_code(1234), 0);
        for land_use in LandUse::all() {
            let score = land_use.class().flood_sub_score();
            assert!((1..=5).contains(&score), "{land_use:?} scored {score}");
        }
    }

    #[test]
    fn landslide_table_defaults_to_one() {
        assert_eq!(LandUse::landslide_sub_score_for_code(3000), 5);
        assert_eq!(LandUse::landslide_sub_score_for_code(1100), 4);
        assert_eq!(LandUse::landslide_sub_score_for_code(1500), 3);
        assert_eq!(LandUse::landslide_sub_score_for_code(4210), 3);
        assert_eq!(LandUse::landslide_sub_score_for_code(2000), 2);
        assert_eq!(LandUse::landslide_sub_score_for_code(7000), 1);
        assert_eq!(LandUse::landslide_sub_score_for_code(-1), 1);
    }

    #[test]
    fn flood_type_is_inverted() {
        assert_eq!(FloodType::sub_score_for_code(0), 3);
        assert_eq!(FloodType::sub_score_for_code(1), 2);
        assert_eq!(FloodType::sub_score_for_code(2), 1);
        assert_eq!(FloodType::sub_score_for_code(3), 0);
        assert_eq!(FloodType::sub_score_for_code(-1), 0);
    }

    #[test]
    fn landslide_type_clamps() {
        assert_eq!(LandSlideType::from_code_clamped(-4), LandSlideType::Insignificant);
        assert_eq!(LandSlideType::from_code_clamped(3).level(), 3);
        assert_eq!(LandSlideType::from_code_clamped(42), LandSlideType::VeryHigh);
        assert_eq!(LandSlideType::VeryHigh.level(), LandSlideType::MAX_LEVEL);
        assert_eq!(
            LandSlideType::from_code_clamped(i32::MAX).level(),
            LandSlideType::MAX_LEVEL
        );
        for level in 0..=LandSlideType::MAX_LEVEL {
            let code = i32::try_from(level).unwrap();
            assert_eq!(LandSlideType::from_code_clamped(code).level(), level);
        }
    }

    #[test]
    fn default_land_use_is_urban() {
        assert_eq!(LandUse::DEFAULT.code(), 3000);
        assert_eq!(LandUse::DEFAULT.class(), LandUseClass::Urban);
    }
}
