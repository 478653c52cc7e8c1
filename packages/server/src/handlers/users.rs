//! Account endpoints.

use actix_web::{HttpResponse, web};
use geometrics_database::accounts;
use geometrics_database_models::{NewUser, UserRow, UserUpdate};
use geometrics_server_models::{
    ApiMessage, ApiUser, AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest,
    UpdateProfileRequest,
};

use crate::AccountState;
use crate::auth::{AuthUser, hash_password, issue_token, verify_password};
use crate::config::AuthConfig;
use crate::error::ApiError;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 64;

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::bad_request("Username is required"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    if username.contains('@') {
        return Err(ApiError::bad_request("Username must not contain '@'"));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ApiError::bad_request(format!("Invalid email: {email}"))),
    }
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Blank display names clear the field.
fn normalize_display_name(display_name: Option<&str>) -> Option<String> {
    display_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
}

/// Profile update for the display name: absent keeps it, blank clears it.
#[allow(clippy::option_option)]
fn display_name_update(display_name: Option<&str>) -> Option<Option<String>> {
    display_name.map(|name| normalize_display_name(Some(name)))
}

fn auth_response(config: &AuthConfig, user: UserRow) -> Result<HttpResponse, ApiError> {
    let token = issue_token(config, user.id)?;
    Ok(HttpResponse::Ok().json(AuthResponse {
        token,
        user: ApiUser::from(user),
    }))
}

/// Loads the authenticated user, treating a deleted account as an invalid
/// token.
async fn current_user(state: &AccountState, user: AuthUser) -> Result<UserRow, ApiError> {
    accounts::get_user(state.db.as_ref(), user.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))
}

/// `POST /users/register`
pub async fn register(
    state: web::Data<AccountState>,
    config: web::Data<AuthConfig>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let username = body.username.trim().to_string();
    let email = body.email.trim().to_lowercase();

    validate_username(&username)?;
    validate_email(&email)?;
    validate_password(&body.password)?;

    let password_hash = hash_password(body.password, config.bcrypt_cost).await?;

    let user = accounts::create_user(
        state.db.as_ref(),
        &NewUser {
            username,
            email,
            password_hash,
            display_name: normalize_display_name(body.display_name.as_deref()),
        },
    )
    .await?;

    log::info!("Registered user {} ({})", user.username, user.id);

    auth_response(&config, user)
}

/// `POST /users/login`
///
/// `username` may also be the account's email.
pub async fn login(
    state: web::Data<AccountState>,
    config: web::Data<AuthConfig>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let login = body.username.trim();

    let Some(user) = accounts::find_user_by_login(state.db.as_ref(), login).await? else {
        return Err(ApiError::unauthorized("Invalid username or password"));
    };

    if !verify_password(body.password, user.password_hash.clone()).await? {
        return Err(ApiError::unauthorized("Invalid username or password"));
    }

    auth_response(&config, user)
}

/// `GET /users/profile`
pub async fn profile(
    user: AuthUser,
    state: web::Data<AccountState>,
) -> Result<HttpResponse, ApiError> {
    let row = current_user(&state, user).await?;
    Ok(HttpResponse::Ok().json(ApiUser::from(row)))
}

/// `PUT /users/profile`
pub async fn update_profile(
    user: AuthUser,
    state: web::Data<AccountState>,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    let email = body.email.map(|email| email.trim().to_lowercase());
    if let Some(email) = &email {
        validate_email(email)?;
    }

    let update = UserUpdate {
        email,
        display_name: display_name_update(body.display_name.as_deref()),
    };

    let row = accounts::update_user(state.db.as_ref(), user.user_id, &update)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;

    Ok(HttpResponse::Ok().json(ApiUser::from(row)))
}

/// `PUT /users/profile/password`
pub async fn change_password(
    user: AuthUser,
    state: web::Data<AccountState>,
    config: web::Data<AuthConfig>,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validate_password(&body.new_password)?;

    let row = current_user(&state, user).await?;
    if !verify_password(body.current_password, row.password_hash).await? {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let password_hash = hash_password(body.new_password, config.bcrypt_cost).await?;
    if !accounts::update_password_hash(state.db.as_ref(), user.user_id, &password_hash).await? {
        return Err(ApiError::unauthorized("User no longer exists"));
    }

    log::info!("User {} changed their password", user.user_id);

    Ok(HttpResponse::Ok().json(ApiMessage {
        message: "Password updated".to_string(),
    }))
}

/// `DELETE /users/profile`
///
/// Saved lots and reports go with the account.
pub async fn delete_account(
    user: AuthUser,
    state: web::Data<AccountState>,
) -> Result<HttpResponse, ApiError> {
    if !accounts::delete_user(state.db.as_ref(), user.user_id).await? {
        return Err(ApiError::unauthorized("User no longer exists"));
    }

    log::info!("Deleted user {}", user.user_id);

    Ok(HttpResponse::Ok().json(ApiMessage {
        message: "Account deleted".to_string(),
    }))
}
