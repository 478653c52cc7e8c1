//! Token issuing, the authenticated-user extractor, and password hashing.
//!
//! Tokens are HS256 JWTs carried in the `Authorization` header. The raw
//! token is expected; a `Bearer ` prefix is accepted too.

use std::future::{Ready, ready};

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, web};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::ApiError;

/// JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Signs a token for `user_id`.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if signing fails.
pub fn issue_token(config: &AuthConfig, user_id: i64) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + config.token_ttl_hours * 3600,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::internal(format!("Failed to sign token: {e}")))
}

/// Checks a token and returns its user id.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] if the token is malformed, has a bad
/// signature, or has expired.
pub fn verify_token(config: &AuthConfig, token: &str) -> Result<i64, ApiError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| ApiError::unauthorized(format!("Invalid token: {e}")))?;

    data.claims
        .sub
        .parse()
        .map_err(|_| ApiError::unauthorized("Invalid token subject"))
}

/// The user a request is authenticated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    /// Authenticated user id.
    pub user_id: i64,
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    let config = req
        .app_data::<web::Data<AuthConfig>>()
        .ok_or_else(|| ApiError::internal("Authentication is not configured"))?;

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| ApiError::unauthorized("Malformed Authorization header"))?
        .trim();

    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    if token.is_empty() {
        return Err(ApiError::unauthorized("Missing token"));
    }

    let user_id = verify_token(config, token)?;
    Ok(AuthUser { user_id })
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

/// Hashes `password` on the blocking thread pool.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if hashing fails.
pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    web::block(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))
}

/// Checks `password` against a bcrypt hash on the blocking thread pool.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if the hash cannot be read.
pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    web::block(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(|e| ApiError::internal(format!("Failed to verify password: {e}")))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test};

    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 1,
            bcrypt_cost: 4,
        }
    }

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.user_id.to_string())
    }

    #[test]
    fn token_round_trips_user_id() {
        let token = issue_token(&config(), 42).unwrap();
        assert_eq!(verify_token(&config(), &token).unwrap(), 42);
    }

    #[test]
    fn rejects_foreign_and_expired_tokens() {
        let other = AuthConfig {
            jwt_secret: "other".to_string(),
            ..config()
        };
        let token = issue_token(&other, 42).unwrap();
        assert!(matches!(
            verify_token(&config(), &token),
            Err(ApiError::Unauthorized { .. })
        ));

        let expired = AuthConfig {
            token_ttl_hours: -2,
            ..config()
        };
        let token = issue_token(&expired, 42).unwrap();
        assert!(matches!(
            verify_token(&config(), &token),
            Err(ApiError::Unauthorized { .. })
        ));
    }

    #[actix_web::test]
    async fn extractor_accepts_raw_and_bearer_tokens() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config()))
                .route("/me", web::get().to(whoami)),
        )
        .await;
        let token = issue_token(&config(), 7).unwrap();

        for header in [token.clone(), format!("Bearer {token}")] {
            let req = test::TestRequest::get()
                .uri("/me")
                .insert_header((AUTHORIZATION, header))
                .to_request();
            let body = test::call_and_read_body(&app, req).await;
            assert_eq!(body, web::Bytes::from_static(b"7"));
        }
    }

    #[actix_web::test]
    async fn extractor_rejects_missing_and_garbage_tokens() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config()))
                .route("/me", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get().uri("/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header((AUTHORIZATION, "not-a-jwt"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn password_hashing() {
        let hash = hash_password("hunter2".to_string(), 4).await.unwrap();
        assert!(verify_password("hunter2".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("hunter3".to_string(), hash).await.unwrap());
    }
}
