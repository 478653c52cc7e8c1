//! Stored risk report endpoints.

use actix_web::{HttpResponse, web};
use geometrics_assessment::assess_lot;
use geometrics_database::accounts;
use geometrics_database_models::NewReport;
use geometrics_server_models::{ApiMessage, ApiReport, CreateReportRequest};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::{AccountState, MapState};

/// `GET /reports`
///
/// Newest first.
pub async fn list(
    user: AuthUser,
    state: web::Data<AccountState>,
) -> Result<HttpResponse, ApiError> {
    let reports = accounts::list_reports(state.db.as_ref(), user.user_id).await?;
    Ok(HttpResponse::Ok().json(reports.into_iter().map(ApiReport::from).collect::<Vec<_>>()))
}

/// `POST /reports`
///
/// Assesses the lot as it is now and stores the scores.
pub async fn create(
    user: AuthUser,
    map: web::Data<MapState>,
    state: web::Data<AccountState>,
    body: web::Json<CreateReportRequest>,
) -> Result<HttpResponse, ApiError> {
    let object_id = body.object_id;

    let lot = map
        .lots
        .lot_by_object_id(object_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Land lot {object_id} not found")))?;

    let assessment = assess_lot(map.layers.as_ref(), &lot).await?;

    let report = accounts::insert_report(
        state.db.as_ref(),
        user.user_id,
        &NewReport {
            object_id: lot.object_id,
            ko_id: lot.ko_id,
            st_parcele: lot.st_parcele,
            flood_risk: assessment.flood_risk,
            land_slide_risk: assessment.land_slide_risk,
            earthquake_risk: assessment.earthquake_risk,
        },
    )
    .await?;

    log::info!(
        "User {} created report {} for lot {object_id}",
        user.user_id,
        report.id
    );

    Ok(HttpResponse::Ok().json(ApiReport::from(report)))
}

/// `GET /reports/{id}`
pub async fn get(
    user: AuthUser,
    path: web::Path<i64>,
    state: web::Data<AccountState>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let report = accounts::get_report(state.db.as_ref(), user.user_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Report {id} not found")))?;

    Ok(HttpResponse::Ok().json(ApiReport::from(report)))
}

/// `DELETE /reports/{id}`
pub async fn remove(
    user: AuthUser,
    path: web::Path<i64>,
    state: web::Data<AccountState>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    if !accounts::delete_report(state.db.as_ref(), user.user_id, id).await? {
        return Err(ApiError::not_found(format!("Report {id} not found")));
    }

    Ok(HttpResponse::Ok().json(ApiMessage {
        message: "Report deleted".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::json;

    use super::*;
    use crate::auth::issue_token;
    use crate::config::AuthConfig;
    use crate::configure;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 1,
            bcrypt_cost: 4,
        }
    }

    #[actix_web::test]
    async fn reports_require_a_token() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(auth_config()))
                .configure(configure),
        )
        .await;

        for req in [
            test::TestRequest::get().uri("/reports"),
            test::TestRequest::get().uri("/reports/1"),
            test::TestRequest::delete().uri("/reports/1"),
            test::TestRequest::post()
                .uri("/reports")
                .set_json(json!({"objectId": 1})),
        ] {
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[actix_web::test]
    async fn tokens_signed_with_another_secret_are_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(auth_config()))
                .configure(configure),
        )
        .await;

        let foreign = AuthConfig {
            jwt_secret: "someone-else".to_string(),
            ..auth_config()
        };
        let token = issue_token(&foreign, 1).unwrap();

        let req = test::TestRequest::get()
            .uri("/reports")
            .insert_header(("Authorization", token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
    #[actix_web::test]
    async fn non_numeric_report_id_is_500_with_message() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(auth_config()))
                .configure(configure),
        )
        .await;
        let token = issue_token(&auth_config(), 1).unwrap();

        for req in [
            test::TestRequest::get().uri("/reports/abc"),
            test::TestRequest::delete().uri("/reports/abc"),
        ] {
            let req = req
                .insert_header(("Authorization", format!("Bearer {token}")))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let body: ApiMessage = test::read_body_json(resp).await;
            assert!(body.message.contains("abc"), "{}", body.message);
        }
    }
}
