#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Area risk assessment.
//!
//! Orchestrates the hazard-layer lookups for a parcel outline and folds the
//! per-feature scores into one pessimistic result per hazard: the maximum
//! score over every intersecting hazard feature and every nearby water
//! distance.
//!
//! Lookup failures never reach the caller. A failed hazard query is logged
//! and treated as "no features found", which degrades that hazard's risk
//! to 0.

use std::time::Duration;

use geo::{Area, Centroid, Coord, LineString, MultiPolygon, Polygon};
use geometrics_hazard_models::LandUse;
use geometrics_layers::{HazardLayers, LandLot};
use geometrics_risk::details::{earthquake_details, flood_details, landslide_details};
use geometrics_risk::{
    NO_SLOPE_DATA, NO_WATER_NEARBY_M, earthquake_risk_score, flood_risk_score,
    landslide_risk_score,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Radius around the parcel centroid searched for water bodies.
pub const WATER_SEARCH_RADIUS_M: f64 = 200.0;

/// Maximum number of landslide zones considered per assessment.
pub const MAX_LANDSLIDE_FEATURES: usize = 20;

/// Time budget for the landslide lookup.
pub const LANDSLIDE_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors returned for unusable assessment input.
#[derive(Debug, Error)]
pub enum AssessError {
    /// The supplied outline is not a usable polygon.
    #[error("Invalid area: {message}")]
    InvalidArea {
        /// Description of what went wrong.
        message: String,
    },
}

/// Flood and landslide risk of an area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaAssessment {
    /// Flood risk percentage (0-100).
    pub flood_risk: f64,
    /// Landslide risk percentage (0-100).
    pub land_slide_risk: f64,
}

/// Full risk profile of a parcel, including descriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelAssessment {
    /// Flood risk percentage (0-100).
    pub flood_risk: f64,
    /// Flood risk description.
    pub flood_description: String,
    /// Landslide risk percentage (0-100).
    pub land_slide_risk: f64,
    /// Landslide risk description.
    pub land_slide_description: String,
    /// Earthquake risk percentage (0-100).
    pub earthquake_risk: f64,
    /// Earthquake risk description.
    pub earthquake_description: String,
}

impl ParcelAssessment {
    /// Builds a profile from the three percentages, deriving descriptions.
    #[must_use]
    pub fn from_scores(flood_risk: f64, land_slide_risk: f64, earthquake_risk: f64) -> Self {
        Self {
            flood_risk,
            flood_description: flood_details(flood_risk).to_string(),
            land_slide_risk,
            land_slide_description: landslide_details(land_slide_risk).to_string(),
            earthquake_risk,
            earthquake_description: earthquake_details(earthquake_risk).to_string(),
        }
    }
}

/// Builds a polygon from `GeoJSON`-style ring coordinates (exterior ring
/// first, then holes).
///
/// # Errors
///
/// Returns [`AssessError::InvalidArea`] if there is no ring, the exterior
/// ring has fewer than four positions, any coordinate is not finite, or the
/// outline encloses no area (collinear or bowtie rings).
pub fn polygon_from_rings(rings: &[Vec<[f64; 2]>]) -> Result<Polygon<f64>, AssessError> {
    let Some((exterior, interiors)) = rings.split_first() else {
        return Err(AssessError::InvalidArea {
            message: "polygon has no rings".to_string(),
        });
    };

    if exterior.len() < 4 {
        return Err(AssessError::InvalidArea {
            message: format!(
                "exterior ring needs at least 4 positions, got {}",
                exterior.len()
            ),
        });
    }

    if rings
        .iter()
        .flatten()
        .any(|[x, y]| !x.is_finite() || !y.is_finite())
    {
        return Err(AssessError::InvalidArea {
            message: "coordinates must be finite numbers".to_string(),
        });
    }

    let to_ring = |ring: &Vec<[f64; 2]>| {
        LineString::new(ring.iter().map(|&[x, y]| Coord { x, y }).collect())
    };

    let polygon = Polygon::new(
        to_ring(exterior),
        interiors.iter().map(to_ring).collect(),
    );

    if polygon.unsigned_area() <= 0.0 {
        return Err(AssessError::InvalidArea {
            message: "area is empty or self-intersecting".to_string(),
        });
    }

    Ok(polygon)
}

/// Returns the largest polygon of a (possibly multipart) parcel outline.
#[must_use]
pub fn primary_polygon(geometry: &MultiPolygon<f64>) -> Option<&Polygon<f64>> {
    geometry
        .0
        .iter()
        .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
}

/// Assesses the flood and landslide risk of `area`.
///
/// # Errors
///
/// Returns [`AssessError::InvalidArea`] if `area` has no centroid.
pub async fn assess_area(
    layers: &dyn HazardLayers,
    area: &Polygon<f64>,
) -> Result<AreaAssessment, AssessError> {
    let centroid = area.centroid().ok_or_else(|| AssessError::InvalidArea {
        message: "area has no centroid".to_string(),
    })?;

    let land_use = dominant_land_use(layers, area).await;
    let water = nearby_water_distances(layers, centroid).await;

    let flood_types = layers.flood_types(area).await.unwrap_or_else(|e| {
        log::error!("Flood lookup failed, assuming no flood zones: {e}");
        Vec::new()
    });

    let landslide_types = match tokio::time::timeout(
        LANDSLIDE_QUERY_TIMEOUT,
        layers.landslide_types(area, MAX_LANDSLIDE_FEATURES),
    )
    .await
    {
        Ok(Ok(types)) => types,
        Ok(Err(e)) => {
            log::error!("Landslide lookup failed, assuming no landslide zones: {e}");
            Vec::new()
        }
        Err(_) => {
            log::warn!(
                "Landslide lookup exceeded {LANDSLIDE_QUERY_TIMEOUT:?}, assuming no landslide zones"
            );
            Vec::new()
        }
    };

    let flood_risk = worst_case(&flood_types, &water, |flood_type, distance| {
        flood_risk_score(flood_type, land_use, NO_SLOPE_DATA, distance)
    });
    let land_slide_risk = worst_case(&landslide_types, &water, |landslide_type, distance| {
        landslide_risk_score(landslide_type, NO_SLOPE_DATA, land_use, distance)
    });

    log::debug!(
        "Assessed area: land_use={land_use} water={water:?} floods={} landslides={} \
         -> flood={flood_risk:.2} landslide={land_slide_risk:.2}",
        flood_types.len(),
        landslide_types.len(),
    );

    Ok(AreaAssessment {
        flood_risk,
        land_slide_risk,
    })
}

/// Assesses flood, landslide and earthquake risk of `area`.
///
/// The earthquake risk comes from the seismic zone covering the centroid.
///
/// # Errors
///
/// Returns [`AssessError::InvalidArea`] if `area` has no centroid.
pub async fn assess_parcel(
    layers: &dyn HazardLayers,
    area: &Polygon<f64>,
) -> Result<ParcelAssessment, AssessError> {
    let AreaAssessment {
        flood_risk,
        land_slide_risk,
    } = assess_area(layers, area).await?;

    let earthquake_risk = match area.centroid() {
        Some(centroid) => match layers.earthquake_pga(centroid).await {
            Ok(pga) => pga.map_or(0.0, earthquake_risk_score),
            Err(e) => {
                log::error!("Earthquake lookup failed, assuming no seismic zone: {e}");
                0.0
            }
        },
        None => 0.0,
    };

    Ok(ParcelAssessment::from_scores(
        flood_risk,
        land_slide_risk,
        earthquake_risk,
    ))
}

/// Assesses a stored land lot, using its largest polygon.
///
/// # Errors
///
/// Returns [`AssessError::InvalidArea`] if the lot has no polygon.
pub async fn assess_lot(
    layers: &dyn HazardLayers,
    lot: &LandLot,
) -> Result<ParcelAssessment, AssessError> {
    let polygon = primary_polygon(&lot.geometry).ok_or_else(|| AssessError::InvalidArea {
        message: format!("lot {} has no polygon", lot.object_id),
    })?;
    assess_parcel(layers, polygon).await
}

/// Land use with the largest covered fraction of `area`, or the urban
/// default when nothing overlaps.
async fn dominant_land_use(layers: &dyn HazardLayers, area: &Polygon<f64>) -> i32 {
    match layers.land_use_overlaps(area).await {
        Ok(overlaps) => overlaps
            .iter()
            .filter(|o| o.fraction.is_finite())
            .max_by(|a, b| a.fraction.total_cmp(&b.fraction))
            .map_or(LandUse::DEFAULT.code(), |o| o.raba_id),
        Err(e) => {
            log::error!("Land use lookup failed, assuming default land use: {e}");
            LandUse::DEFAULT.code()
        }
    }
}

/// Distances to nearby water, or the single "no water nearby" sentinel.
async fn nearby_water_distances(
    layers: &dyn HazardLayers,
    centroid: geo::Point<f64>,
) -> Vec<f64> {
    let distances = layers
        .water_distances(centroid, WATER_SEARCH_RADIUS_M)
        .await
        .unwrap_or_else(|e| {
            log::error!("Water body lookup failed, assuming no water nearby: {e}");
            Vec::new()
        });

    if distances.is_empty() {
        vec![NO_WATER_NEARBY_M]
    } else {
        distances
    }
}

/// Maximum of `score` over every feature code and water distance; 0 when
/// there are no features.
fn worst_case(codes: &[i32], distances: &[f64], score: impl Fn(i32, f64) -> f64) -> f64 {
    codes
        .iter()
        .flat_map(|&code| distances.iter().map(move |&d| (code, d)))
        .map(|(code, distance)| score(code, distance))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use geo::Point;
    use geometrics_layers::{LandUseOverlap, LayerError};

    use super::*;

    #[derive(Default)]
    struct FakeLayers {
        land_uses: Vec<LandUseOverlap>,
        water: Vec<f64>,
        floods: Vec<i32>,
        landslides: Vec<i32>,
        pga: Option<f64>,
        fail_floods: bool,
        fail_water: bool,
        slow_landslides: bool,
        landslide_limit_seen: AtomicUsize,
    }

    #[async_trait]
    impl HazardLayers for FakeLayers {
        async fn land_use_overlaps(
            &self,
            _area: &Polygon<f64>,
        ) -> Result<Vec<LandUseOverlap>, LayerError> {
            Ok(self.land_uses.clone())
        }

        async fn water_distances(
            &self,
            _origin: Point<f64>,
            _within_m: f64,
        ) -> Result<Vec<f64>, LayerError> {
            if self.fail_water {
                return Err(LayerError::Query {
                    message: "water down".to_string(),
                });
            }
            Ok(self.water.clone())
        }

        async fn flood_types(&self, _area: &Polygon<f64>) -> Result<Vec<i32>, LayerError> {
            if self.fail_floods {
                return Err(LayerError::Query {
                    message: "floods down".to_string(),
                });
            }
            Ok(self.floods.clone())
        }

        async fn landslide_types(
            &self,
            _area: &Polygon<f64>,
            limit: usize,
        ) -> Result<Vec<i32>, LayerError> {
            self.landslide_limit_seen.store(limit, Ordering::SeqCst);
            if self.slow_landslides {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok(self.landslides.clone())
        }

        async fn earthquake_pga(&self, _point: Point<f64>) -> Result<Option<f64>, LayerError> {
            Ok(self.pga)
        }
    }

    fn square() -> Polygon<f64> {
        polygon_from_rings(&[vec![
            [14.50, 46.05],
            [14.51, 46.05],
            [14.51, 46.06],
            [14.50, 46.06],
            [14.50, 46.05],
        ]])
        .unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 0.01,
            "expected {expected}, got {actual}"
        );
    }

    #[tokio::test]
    async fn single_common_flood_with_defaults() {
        let layers = FakeLayers {
            floods: vec![0],
            ..FakeLayers::default()
        };
        let result = assess_area(&layers, &square()).await.unwrap();
        assert_close(result.flood_risk, 340.0 / 360.0 * 100.0);
        assert!(result.land_slide_risk.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn no_features_means_no_risk() {
        let result = assess_area(&FakeLayers::default(), &square()).await.unwrap();
        assert!(result.flood_risk.abs() < f64::EPSILON);
        assert!(result.land_slide_risk.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn takes_worst_case_over_features_and_water() {
        let layers = FakeLayers {
            floods: vec![2, 0, 1],
            landslides: vec![1, 4],
            water: vec![180.0, 30.0],
            ..FakeLayers::default()
        };
        let result = assess_area(&layers, &square()).await.unwrap();
        assert_close(
            result.flood_risk,
            flood_risk_score(0, 3000, NO_SLOPE_DATA, 30.0),
        );
        assert_close(
            result.land_slide_risk,
            landslide_risk_score(4, NO_SLOPE_DATA, 3000, 30.0),
        );
        assert_eq!(
            layers.landslide_limit_seen.load(Ordering::SeqCst),
            MAX_LANDSLIDE_FEATURES
        );
    }

    #[tokio::test]
    async fn dominant_land_use_wins() {
        let layers = FakeLayers {
            floods: vec![0],
            land_uses: vec![
                LandUseOverlap {
                    raba_id: 3000,
                    fraction: 0.2,
                },
                LandUseOverlap {
                    raba_id: 2000,
                    fraction: 0.7,
                },
            ],
            ..FakeLayers::default()
        };
        let result = assess_area(&layers, &square()).await.unwrap();
        assert_close(
            result.flood_risk,
            flood_risk_score(0, 2000, NO_SLOPE_DATA, NO_WATER_NEARBY_M),
        );
    }

    #[tokio::test]
    async fn failed_lookups_degrade() {
        let layers = FakeLayers {
            floods: vec![0],
            landslides: vec![5],
            fail_floods: true,
            fail_water: true,
            ..FakeLayers::default()
        };
        let result = assess_area(&layers, &square()).await.unwrap();
        assert!(result.flood_risk.abs() < f64::EPSILON);
        assert_close(
            result.land_slide_risk,
            landslide_risk_score(5, NO_SLOPE_DATA, 3000, NO_WATER_NEARBY_M),
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_landslide_lookup_times_out() {
        let layers = FakeLayers {
            floods: vec![1],
            landslides: vec![5],
            slow_landslides: true,
            ..FakeLayers::default()
        };
        let result = assess_area(&layers, &square()).await.unwrap();
        assert!(result.land_slide_risk.abs() < f64::EPSILON);
        assert!(result.flood_risk > 0.0);
    }

    #[tokio::test]
    async fn parcel_includes_earthquake() {
        let layers = FakeLayers {
            pga: Some(0.15),
            ..FakeLayers::default()
        };
        let result = assess_parcel(&layers, &square()).await.unwrap();
        assert_close(result.earthquake_risk, 50.0);
        assert_eq!(result.earthquake_description, earthquake_details(50.0));
        assert_eq!(result.flood_description, flood_details(0.0));
    }

    #[test]
    fn rejects_bad_rings() {
        assert!(polygon_from_rings(&[]).is_err());
        assert!(polygon_from_rings(&[vec![[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]]).is_err());
        assert!(
            polygon_from_rings(&[vec![
                [0.0, 0.0],
                [f64::NAN, 0.0],
                [1.0, 1.0],
                [0.0, 0.0]
            ]])
            .is_err()
        );
    }

    #[test]
    fn rejects_outlines_without_area() {
        let bowtie = polygon_from_rings(&[vec![
            [14.50, 46.00],
            [14.52, 46.02],
            [14.52, 46.00],
            [14.50, 46.02],
            [14.50, 46.00],
        ]]);
        assert!(matches!(bowtie, Err(AssessError::InvalidArea { .. })));

        let collinear = polygon_from_rings(&[vec![
            [14.50, 46.00],
            [14.51, 46.00],
            [14.52, 46.00],
            [14.50, 46.00],
        ]]);
        assert!(matches!(collinear, Err(AssessError::InvalidArea { .. })));
    }

    #[test]
    fn primary_polygon_is_largest() {
        let small = polygon_from_rings(&[vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 0.0],
        ]])
        .unwrap();
        let big = polygon_from_rings(&[vec![
            [0.0, 0.0],
            [10.0, 0.0],
            [10.0, 10.0],
            [0.0, 10.0],
            [0.0, 0.0],
        ]])
        .unwrap();
        let mp = MultiPolygon(vec![small, big.clone()]);
        assert_eq!(primary_polygon(&mp), Some(&big));
    }
}
