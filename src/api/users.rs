// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints: signup, login and refresh-token rotation.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    auth::{password, RenewError},
    error::ApiError,
    state::AppState,
    storage::{StorageError, StoredUser, UserRepository},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub name: String,
    pub surname: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Public view of a user account.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub surname: String,
}

impl From<&StoredUser> for UserResponse {
    fn from(user: &StoredUser) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            surname: user.surname.clone(),
        }
    }
}

/// Response for signup and login: a fresh token pair plus the account.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserResponse,
}

/// Response for a successful refresh-token rotation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
}

/// Register a new account and log it in.
#[utoipa::path(
    post,
    path = "/user/signup",
    tag = "Users",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Email already registered"),
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let password_hash = password::hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("password hashing failed: {e}")))?;

    let user = StoredUser::new(request.email, request.name, request.surname, password_hash);
    match UserRepository::new(&state.db).create(&user) {
        Ok(()) => {}
        Err(StorageError::AlreadyExists(_)) => {
            return Err(ApiError::bad_request("User already exists!"));
        }
        Err(e) => return Err(e.into()),
    }

    let pair = state
        .tokens
        .issue(&state.db, &user)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    info!(user_id = %user.id, "user signed up");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user: (&user).into(),
        }),
    ))
}

/// Log in with email and password.
#[utoipa::path(
    post,
    path = "/user/login",
    tag = "Users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Invalid credentials"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    // Unknown email and wrong password answer identically
    let Some(user) = UserRepository::new(&state.db).get_by_email(&request.email)? else {
        return Err(ApiError::bad_request("Invalid credentials"));
    };

    let matches = password::verify_password(&request.password, &user.password_hash)
        .map_err(|e| ApiError::internal(format!("password verification failed: {e}")))?;
    if !matches {
        return Err(ApiError::bad_request("Invalid credentials"));
    }

    let pair = state
        .tokens
        .issue(&state.db, &user)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    info!(user_id = %user.id, "user logged in");

    Ok(Json(AuthResponse {
        success: true,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user: (&user).into(),
    }))
}

/// Exchange a refresh token for a new token pair.
///
/// The presented token is consumed whatever the outcome; a rejected token
/// cannot be retried.
#[utoipa::path(
    post,
    path = "/user/refresh-token",
    tag = "Users",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = RefreshResponse),
        (status = 400, description = "Refresh token missing from the request"),
        (status = 401, description = "Refresh token rejected"),
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let Some(presented) = request.refresh_token.filter(|t| !t.is_empty()) else {
        return Err(ApiError::bad_request("Refresh token is required"));
    };

    match state.tokens.renew(&state.db, &presented) {
        Ok(pair) => Ok(Json(RefreshResponse {
            success: true,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })),
        Err(RenewError::Rejected(rejection)) => {
            info!(code = rejection.code(), "refresh token rejected");
            Err(ApiError::unauthorized(rejection.message()).with_code(rejection.code()))
        }
        Err(RenewError::Internal(e)) => Err(ApiError::internal(e.to_string())),
    }
}
