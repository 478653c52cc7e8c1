//! Saved lot endpoints.

use actix_web::{HttpResponse, web};
use geometrics_database::accounts;
use geometrics_database_models::NewSavedLot;
use geometrics_server_models::{ApiMessage, ApiSavedLot, SaveLotRequest};

use crate::AccountState;
use crate::auth::AuthUser;
use crate::error::ApiError;

/// `GET /users/saved-lots`
pub async fn list(
    user: AuthUser,
    state: web::Data<AccountState>,
) -> Result<HttpResponse, ApiError> {
    let lots = accounts::list_saved_lots(state.db.as_ref(), user.user_id).await?;
    Ok(HttpResponse::Ok().json(lots.into_iter().map(ApiSavedLot::from).collect::<Vec<_>>()))
}

/// `POST /users/saved-lots`
///
/// Saving a lot twice returns the existing entry.
pub async fn save(
    user: AuthUser,
    state: web::Data<AccountState>,
    body: web::Json<SaveLotRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    let st_parcele = body.st_parcele.trim().to_string();
    if st_parcele.is_empty() {
        return Err(ApiError::bad_request("stParcele is required"));
    }

    let saved = accounts::save_lot(
        state.db.as_ref(),
        user.user_id,
        &NewSavedLot {
            object_id: body.object_id,
            ko_id: body.ko_id,
            st_parcele,
            label: body
                .label
                .map(|label| label.trim().to_string())
                .filter(|label| !label.is_empty()),
        },
    )
    .await?;

    Ok(HttpResponse::Ok().json(ApiSavedLot::from(saved)))
}

/// `DELETE /users/saved-lots/{id}`
pub async fn remove(
    user: AuthUser,
    path: web::Path<i64>,
    state: web::Data<AccountState>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    if !accounts::delete_saved_lot(state.db.as_ref(), user.user_id, id).await? {
        return Err(ApiError::not_found(format!("Saved lot {id} not found")));
    }

    Ok(HttpResponse::Ok().json(ApiMessage {
        message: "Saved lot removed".to_string(),
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
    async fn saved_lots_require_a_token() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(auth_config()))
                .configure(configure),
        )
        .await;

        for req in [
            test::TestRequest::get().uri("/users/saved-lots"),
            test::TestRequest::post()
                .uri("/users/saved-lots")
                .set_json(json!({"objectId": 1, "koId": 1722, "stParcele": "100/1"})),
            test::TestRequest::delete().uri("/users/saved-lots/3"),
        ] {
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[actix_web::test]
    async fn non_numeric_saved_lot_id_is_500_with_message() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(auth_config()))
                .configure(configure),
        )
        .await;
        let token = issue_token(&auth_config(), 1).unwrap();

        let req = test::TestRequest::delete()
            .uri("/users/saved-lots/abc")
            .insert_header(("Authorization", token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: ApiMessage = test::read_body_json(resp).await;
        assert!(body.message.contains("abc"), "{}", body.message);
    }
}
