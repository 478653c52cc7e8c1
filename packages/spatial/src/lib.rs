#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index over the reference layers.
//!
//! Loads every layer into R-trees keyed by bounding envelope and answers
//! the [`HazardLayers`] and [`LotStore`] queries with exact `geo`
//! predicates on the candidates. Lets the server run straight from the
//! fetcher's `GeoJSON` files without a `PostGIS` instance.

pub mod viewport;

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use geo::{
    Area, BooleanOps, BoundingRect, Closest, ClosestPoint, Distance, Haversine, Intersects,
    MultiPolygon, Point, Polygon,
};
use geometrics_layers::records::{FieldMap, LayerKind, LayerRecords, read_layer};
use geometrics_layers::{
    CadastralMunicipality, CodedPolygon, EarthquakeZone, HazardLayers, LandLot, LandUseOverlap,
    LayerError, LotStore, WaterBody,
};
use rstar::{AABB, RTree, RTreeObject};

/// Meters per degree of latitude.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// An item stored in an R-tree together with its bounding envelope.
struct Indexed<T> {
    envelope: AABB<[f64; 2]>,
    item: T,
}

impl<T> RTreeObject for Indexed<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built R-tree indexes for every reference layer.
#[derive(Default)]
pub struct LayerIndex {
    lots: Vec<LandLot>,
    lot_tree: RTree<Indexed<usize>>,
    lots_by_parcel: BTreeMap<String, Vec<usize>>,
    lots_by_object_id: BTreeMap<i64, usize>,
    municipalities: Vec<CadastralMunicipality>,
    floods: RTree<Indexed<CodedPolygon>>,
    landslides: RTree<Indexed<CodedPolygon>>,
    land_uses: RTree<Indexed<CodedPolygon>>,
    water: RTree<Indexed<WaterBody>>,
    earthquakes: RTree<Indexed<EarthquakeZone>>,
}

impl LayerIndex {
    /// Builds an index from parsed layer records. Records of the same kind
    /// are concatenated.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = LayerRecords>) -> Self {
        let mut lots = Vec::new();
        let mut municipalities = Vec::new();
        let mut floods = Vec::new();
        let mut landslides = Vec::new();
        let mut land_uses = Vec::new();
        let mut water = Vec::new();
        let mut earthquakes = Vec::new();

        for layer in records {
            match layer {
                LayerRecords::CadastralMunicipalities(v) => municipalities.extend(v),
                LayerRecords::LandLots(v) => lots.extend(v),
                LayerRecords::Floods(v) => floods.extend(v),
                LayerRecords::LandSlides(v) => landslides.extend(v),
                LayerRecords::LandUses(v) => land_uses.extend(v),
                LayerRecords::WaterBodies(v) => water.extend(v),
                LayerRecords::Earthquakes(v) => earthquakes.extend(v),
            }
        }

        let mut lots_by_parcel: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut lots_by_object_id = BTreeMap::new();
        let mut lot_entries = Vec::with_capacity(lots.len());
        for (idx, lot) in lots.iter().enumerate() {
            lots_by_parcel
                .entry(lot.st_parcele.clone())
                .or_default()
                .push(idx);
            lots_by_object_id.insert(lot.object_id, idx);
            lot_entries.push(Indexed {
                envelope: compute_envelope(&lot.geometry),
                item: idx,
            });
        }

        let index = Self {
            lot_tree: RTree::bulk_load(lot_entries),
            lots,
            lots_by_parcel,
            lots_by_object_id,
            municipalities,
            floods: bulk_load(floods, |f| &f.geometry),
            landslides: bulk_load(landslides, |f| &f.geometry),
            land_uses: bulk_load(land_uses, |f| &f.geometry),
            water: bulk_load(water, |w| &w.geometry),
            earthquakes: bulk_load(earthquakes, |e| &e.geometry),
        };

        log::info!(
            "Layer index: {} lots, {} municipalities, {} floods, {} landslides, \
             {} land uses, {} water bodies, {} seismic zones",
            index.lots.len(),
            index.municipalities.len(),
            index.floods.size(),
            index.landslides.size(),
            index.land_uses.size(),
            index.water.size(),
            index.earthquakes.size(),
        );

        index
    }

    /// Loads every layer file found in `dir`. Missing files yield empty
    /// layers.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError`] if a present file cannot be read or parsed.
    pub fn load_dir(dir: &Path, fields: &FieldMap) -> Result<Self, LayerError> {
        let mut records = Vec::new();
        for &kind in LayerKind::all() {
            let path = dir.join(kind.file_name());
            if !path.exists() {
                log::warn!("No {kind} layer at {}, using an empty layer", path.display());
                continue;
            }
            records.push(read_layer(dir, kind, fields)?);
        }
        Ok(Self::from_records(records))
    }
}

fn bulk_load<T>(
    items: Vec<T>,
    geometry: impl Fn(&T) -> &MultiPolygon<f64>,
) -> RTree<Indexed<T>> {
    RTree::bulk_load(
        items
            .into_iter()
            .map(|item| Indexed {
                envelope: compute_envelope(geometry(&item)),
                item,
            })
            .collect(),
    )
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

fn polygon_envelope(polygon: &Polygon<f64>) -> AABB<[f64; 2]> {
    polygon.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

/// Envelope around `point` padded by roughly `radius_m` meters.
fn padded_envelope(point: Point<f64>, radius_m: f64) -> AABB<[f64; 2]> {
    let dy = radius_m / METERS_PER_DEGREE;
    let dx = radius_m / (METERS_PER_DEGREE * point.y().to_radians().cos().abs().max(0.01));
    AABB::from_corners(
        [point.x() - dx, point.y() - dy],
        [point.x() + dx, point.y() + dy],
    )
}

/// Haversine distance in meters from `point` to the nearest part of
/// `geometry`; 0 when the point lies inside.
fn distance_to(point: Point<f64>, geometry: &MultiPolygon<f64>) -> Option<f64> {
    if geometry.intersects(&point) {
        return Some(0.0);
    }
    match geometry.closest_point(&point) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => Some(Haversine.distance(point, p)),
        Closest::Indeterminate => None,
    }
}

fn coded_intersecting<'a>(
    tree: &'a RTree<Indexed<CodedPolygon>>,
    area: &'a Polygon<f64>,
) -> impl Iterator<Item = &'a CodedPolygon> + 'a {
    tree.locate_in_envelope_intersecting(&polygon_envelope(area))
        .map(|entry| &entry.item)
        .filter(move |feature| feature.geometry.intersects(area))
}

#[async_trait]
impl HazardLayers for LayerIndex {
    async fn land_use_overlaps(
        &self,
        area: &Polygon<f64>,
    ) -> Result<Vec<LandUseOverlap>, LayerError> {
        let total = area.unsigned_area();
        if total <= 0.0 {
            return Ok(Vec::new());
        }
        let target = MultiPolygon(vec![area.clone()]);

        Ok(coded_intersecting(&self.land_uses, area)
            .map(|land_use| LandUseOverlap {
                raba_id: land_use.code,
                fraction: land_use.geometry.intersection(&target).unsigned_area() / total,
            })
            .collect())
    }

    async fn water_distances(
        &self,
        origin: Point<f64>,
        within_m: f64,
    ) -> Result<Vec<f64>, LayerError> {
        let mut distances: Vec<f64> = self
            .water
            .locate_in_envelope_intersecting(&padded_envelope(origin, within_m))
            .filter_map(|entry| distance_to(origin, &entry.item.geometry))
            .filter(|&d| d <= within_m)
            .collect();
        distances.sort_by(f64::total_cmp);
        Ok(distances)
    }

    async fn flood_types(&self, area: &Polygon<f64>) -> Result<Vec<i32>, LayerError> {
        Ok(coded_intersecting(&self.floods, area)
            .map(|flood| flood.code)
            .collect())
    }

    async fn landslide_types(
        &self,
        area: &Polygon<f64>,
        limit: usize,
    ) -> Result<Vec<i32>, LayerError> {
        let mut types: Vec<i32> = coded_intersecting(&self.landslides, area)
            .map(|landslide| landslide.code)
            .collect();
        types.sort_unstable_by(|a, b| b.cmp(a));
        types.truncate(limit);
        Ok(types)
    }

    async fn earthquake_pga(&self, point: Point<f64>) -> Result<Option<f64>, LayerError> {
        Ok(self
            .earthquakes
            .locate_in_envelope_intersecting(&AABB::from_point([point.x(), point.y()]))
            .filter(|entry| entry.item.geometry.intersects(&point))
            .map(|entry| entry.item.pga)
            .max_by(f64::total_cmp))
    }
}

#[async_trait]
impl LotStore for LayerIndex {
    async fn lots_in_region(
        &self,
        region: &MultiPolygon<f64>,
    ) -> Result<Vec<LandLot>, LayerError> {
        Ok(self
            .lot_tree
            .locate_in_envelope_intersecting(&compute_envelope(region))
            .map(|entry| &self.lots[entry.item])
            .filter(|lot| lot.geometry.intersects(region))
            .cloned()
            .collect())
    }

    async fn find_lots(
        &self,
        st_parcele: &str,
        ko_id: Option<i32>,
    ) -> Result<Vec<LandLot>, LayerError> {
        Ok(self
            .lots_by_parcel
            .get(st_parcele)
            .into_iter()
            .flatten()
            .map(|&idx| &self.lots[idx])
            .filter(|lot| ko_id.is_none_or(|ko| lot.ko_id == ko))
            .cloned()
            .collect())
    }

    async fn lot_by_object_id(&self, object_id: i64) -> Result<Option<LandLot>, LayerError> {
        Ok(self
            .lots_by_object_id
            .get(&object_id)
            .map(|&idx| self.lots[idx].clone()))
    }

    async fn cadastral_municipalities(&self) -> Result<Vec<CadastralMunicipality>, LayerError> {
        Ok(self.municipalities.clone())
    }
}
