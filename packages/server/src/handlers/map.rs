//! Map browsing and risk assessment endpoints.

use actix_web::{HttpResponse, web};
use geometrics_assessment::{assess_area, assess_parcel, polygon_from_rings};
use geometrics_layers::LandLot;
use geometrics_server_models::{ApiFoundLot, ApiLotsResponse, AssessRequest};
use geometrics_spatial::viewport::ViewportDelta;

use crate::MapState;
use crate::error::ApiError;

/// Converts a lot into a `GeoJSON` feature with its cadastral attributes.
fn lot_feature(lot: &LandLot) -> geojson::Feature {
    let mut properties = geojson::JsonObject::new();
    properties.insert("OBJECTID".to_string(), lot.object_id.into());
    properties.insert("ST_PARCELE".to_string(), lot.st_parcele.clone().into());
    properties.insert("KO_ID".to_string(), lot.ko_id.into());

    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&lot.geometry))),
        id: Some(geojson::feature::Id::Number(lot.object_id.into())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// `GET /map/query/{bbox_data}`
///
/// Returns the lots in the part of the current viewport the client has not
/// seen yet, or 304 when the viewport did not change.
pub async fn query(
    state: web::Data<MapState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let delta = ViewportDelta::parse_checked(&path)?;

    let Some(region) = delta.changed_region() else {
        return Ok(HttpResponse::NotModified().finish());
    };

    let lots = state.lots.lots_in_region(&region).await?;
    log::debug!("Map query returned {} lots", lots.len());

    Ok(HttpResponse::Ok().json(ApiLotsResponse {
        data: lots.iter().map(lot_feature).collect(),
    }))
}

/// Parcel numbers such as `1021/3` arrive with the slash percent-encoded.
fn decode_parcel(raw: &str) -> String {
    raw.replace("%2F", "/").replace("%2f", "/")
}

async fn find_lots(
    state: &MapState,
    land_lot_id: &str,
    ko_id: Option<i32>,
) -> Result<HttpResponse, ApiError> {
    let st_parcele = decode_parcel(land_lot_id.trim());
    if st_parcele.is_empty() {
        return Err(ApiError::bad_request("Missing land lot id"));
    }

    let lots = state.lots.find_lots(&st_parcele, ko_id).await?;

    let found = lots
        .iter()
        .filter(|lot| ko_id.is_none_or(|ko| lot.ko_id == ko))
        .filter_map(|lot| {
            Some(ApiFoundLot {
                ko_id: lot.ko_id,
                ko_name: state.ko.name(lot.ko_id).unwrap_or_default().to_string(),
                st_parcele: lot.st_parcele.clone(),
                bbox: lot.bbox()?,
            })
        })
        .collect::<Vec<_>>();

    Ok(HttpResponse::Ok().json(found))
}

/// `GET /map/find/{land_lot_id}`
pub async fn find(
    state: web::Data<MapState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    find_lots(&state, &path, None).await
}

/// `GET /map/find/{land_lot_id}/{ko_id}`
pub async fn find_in_ko(
    state: web::Data<MapState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (land_lot_id, ko_id) = path.into_inner();
    let ko_id = ko_id
        .trim()
        .parse::<i32>()
        .map_err(|_| ApiError::bad_request(format!("Invalid ko_id: {ko_id}")))?;

    find_lots(&state, &land_lot_id, Some(ko_id)).await
}

/// `POST /map/assess`
///
/// Flood and landslide risk of the posted polygon.
pub async fn assess(
    state: web::Data<MapState>,
    body: web::Json<AssessRequest>,
) -> Result<HttpResponse, ApiError> {
    let polygon = polygon_from_rings(&body.bounds)?;
    let assessment = assess_area(state.layers.as_ref(), &polygon).await?;
    Ok(HttpResponse::Ok().json(assessment))
}

/// `POST /map/assess/details`
///
/// Flood, landslide and earthquake risk of the posted polygon with
/// descriptions.
pub async fn assess_details(
    state: web::Data<MapState>,
    body: web::Json<AssessRequest>,
) -> Result<HttpResponse, ApiError> {
    let polygon = polygon_from_rings(&body.bounds)?;
    let assessment = assess_parcel(state.layers.as_ref(), &polygon).await?;
    Ok(HttpResponse::Ok().json(assessment))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use async_trait::async_trait;
    use geo::{Coord, MultiPolygon, Rect};
    use geometrics_layers::records::LayerRecords;
    use geometrics_layers::{
        CadastralMunicipality, CodedPolygon, EarthquakeZone, HazardLayers, KoDirectory,
        LayerError, LotStore,
    };
    use geometrics_server_models::ApiMessage;
    use geometrics_spatial::LayerIndex;
    use serde_json::{Value, json};

    use super::*;
    use crate::configure;

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![
            Rect::new(Coord { x: x0, y: y0 }, Coord { x: x0 + size, y: y0 + size }).to_polygon(),
        ])
    }

    fn lot(object_id: i64, st_parcele: &str, ko_id: i32, x0: f64) -> LandLot {
        LandLot {
            object_id,
            st_parcele: st_parcele.to_string(),
            ko_id,
            geometry: square(x0, 46.05, 0.001),
        }
    }

    fn index() -> Arc<LayerIndex> {
        let municipalities = vec![
            CadastralMunicipality {
                ko_id: 1722,
                name: "Trnovsko predmestje".to_string(),
            },
            CadastralMunicipality {
                ko_id: 1723,
                name: "Vič".to_string(),
            },
        ];
        Arc::new(LayerIndex::from_records([
            LayerRecords::CadastralMunicipalities(municipalities),
            LayerRecords::LandLots(vec![
                lot(1, "100/1", 1722, 14.500),
                lot(2, "100/1", 1723, 14.510),
                lot(3, "101", 1722, 14.502),
            ]),
            LayerRecords::Floods(vec![CodedPolygon {
                code: 0,
                geometry: square(14.49, 46.04, 0.05),
            }]),
            LayerRecords::Earthquakes(vec![EarthquakeZone {
                pga: 0.15,
                geometry: square(14.0, 45.5, 1.0),
            }]),
        ]))
    }

    async fn map_state(index: Arc<LayerIndex>) -> web::Data<MapState> {
        let ko = KoDirectory::load(index.as_ref()).await.unwrap();
        web::Data::new(MapState {
            lots: index.clone(),
            layers: index,
            ko,
        })
    }

    /// Fails every lookup, so a successful response proves it was never
    /// consulted.
    struct UnreachableStore;

    #[async_trait]
    impl LotStore for UnreachableStore {
        async fn lots_in_region(
            &self,
            _region: &MultiPolygon<f64>,
        ) -> Result<Vec<LandLot>, LayerError> {
            Err(LayerError::Query {
                message: "store was queried".to_string(),
            })
        }

        async fn find_lots(
            &self,
            _st_parcele: &str,
            _ko_id: Option<i32>,
        ) -> Result<Vec<LandLot>, LayerError> {
            Err(LayerError::Query {
                message: "store was queried".to_string(),
            })
        }

        async fn lot_by_object_id(&self, _object_id: i64) -> Result<Option<LandLot>, LayerError> {
            Ok(None)
        }

        async fn cadastral_municipalities(
            &self,
        ) -> Result<Vec<CadastralMunicipality>, LayerError> {
            Ok(Vec::new())
        }
    }

    fn square_bounds(x0: f64, y0: f64, size: f64) -> Value {
        json!({
            "bounds": [[
                [x0, y0],
                [x0 + size, y0],
                [x0 + size, y0 + size],
                [x0, y0 + size],
                [x0, y0],
            ]]
        })
    }

    #[actix_web::test]
    async fn identical_viewport_is_not_modified() {
        let index = index();
        let state = web::Data::new(MapState {
            lots: Arc::new(UnreachableStore),
            layers: index as Arc<dyn HazardLayers>,
            ko: KoDirectory::default(),
        });
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/map/query/14.49,46.04,14.52,46.06,14.49,46.04,14.52,46.06")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
        let body = test::read_body(resp).await;
        assert!(body.is_empty());
    }

    #[actix_web::test]
    async fn first_query_returns_lot_features() {
        let app =
            test::init_service(App::new().app_data(map_state(index()).await).configure(configure))
                .await;

        let req = test::TestRequest::get()
            .uri("/map/query/0,0,0,0,14.49,46.04,14.52,46.06")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let features = body["data"].as_array().unwrap();
        assert_eq!(features.len(), 3);
        assert!(features.iter().all(|f| f["type"] == "Feature"));
        assert!(features.iter().any(|f| f["properties"]["ST_PARCELE"] == "101"));
    }

    #[actix_web::test]
    async fn malformed_and_oversized_viewports_are_500() {
        let app =
            test::init_service(App::new().app_data(map_state(index()).await).configure(configure))
                .await;

        for uri in [
            "/map/query/1,2,3",
            "/map/query/a,b,c,d,e,f,g,h",
            "/map/query/0,0,0,0,14.0,46.0,14.5,46.5",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
            let message: ApiMessage = test::read_body_json(resp).await;
            assert!(!message.message.is_empty());
        }
    }

    #[actix_web::test]
    async fn find_filters_by_ko() {
        let app =
            test::init_service(App::new().app_data(map_state(index()).await).configure(configure))
                .await;

        let req = test::TestRequest::get().uri("/map/find/100%2F1").to_request();
        let all: Vec<ApiFoundLot> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(all.len(), 2);

        let req = test::TestRequest::get()
            .uri("/map/find/100%2F1/1723")
            .to_request();
        let found: Vec<ApiFoundLot> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ko_id, 1723);
        assert_eq!(found[0].ko_name, "Vič");
        assert_eq!(found[0].st_parcele, "100/1");
        assert!((found[0].bbox[0] - 14.510).abs() < 1e-9);

        let req = test::TestRequest::get().uri("/map/find/100%2F1/abc").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn assess_scores_flood_zone() {
        let app =
            test::init_service(App::new().app_data(map_state(index()).await).configure(configure))
                .await;

        let req = test::TestRequest::post()
            .uri("/map/assess")
            .set_json(square_bounds(14.500, 46.05, 0.001))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let flood = body["floodRisk"].as_f64().unwrap();
        assert!((flood - 340.0 / 360.0 * 100.0).abs() < 1e-9, "{flood}");
        assert!(body["landSlideRisk"].as_f64().unwrap().abs() < f64::EPSILON);
    }

    #[actix_web::test]
    async fn assess_details_includes_earthquake() {
        let app =
            test::init_service(App::new().app_data(map_state(index()).await).configure(configure))
                .await;

        let req = test::TestRequest::post()
            .uri("/map/assess/details")
            .set_json(square_bounds(14.500, 46.05, 0.001))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert!((body["earthquakeRisk"].as_f64().unwrap() - 50.0).abs() < 1e-9);
        assert!(body["floodDescription"].as_str().is_some_and(|s| !s.is_empty()));
        assert!(body["earthquakeDescription"].as_str().is_some_and(|s| !s.is_empty()));
    }

    #[actix_web::test]
    async fn invalid_assessment_input_is_500() {
        let app =
            test::init_service(App::new().app_data(map_state(index()).await).configure(configure))
                .await;

        let req = test::TestRequest::post()
            .uri("/map/assess")
            .set_json(json!({"bounds": [[[14.5, 46.0], [14.6, 46.0], [14.5, 46.0]]]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let req = test::TestRequest::post()
            .uri("/map/assess")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let req = test::TestRequest::post()
            .uri("/map/assess")
            .set_json(json!({"bounds": [[
                [14.500, 46.050],
                [14.501, 46.051],
                [14.501, 46.050],
                [14.500, 46.051],
                [14.500, 46.050],
            ]]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
