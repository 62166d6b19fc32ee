//! Login, logout and token validation endpoints, plus the bearer-token
//! middleware guarding the admin routes.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::error::ApiError;
use crate::auth;
use crate::db::{DbPool, NewUser, User, UserResponse};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expiry: DateTime<Utc>,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (issued, user) = auth::login(
        &state.db,
        &request.email,
        &request.password,
        state.config.token_ttl(),
    )
    .await?;

    info!(user_id = user.id, "user logged in");

    Ok(Json(LoginResponse {
        token: issued.plaintext,
        expiry: issued.expiry,
        user: UserResponse::from(user),
    }))
}

/// Logout endpoint. Destroys the presented token; logging out with a token
/// that no longer exists still succeeds.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    auth::logout(&state.db, &request.token).await?;

    Ok(Json(MessageResponse {
        message: "logged out".to_string(),
    }))
}

/// Boolean token check for clients that only need yes/no.
pub async fn validate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TokenRequest>,
) -> Json<ValidateResponse> {
    let valid = auth::validate_token(&state.db, &request.token).await;
    Json(ValidateResponse { valid })
}

/// Current user, resolved from the bearer token.
pub async fn me(user: User) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// Middleware that gates protected routes on a valid bearer token.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = auth::authenticate(&state.db, request.headers()).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extractor for the current authenticated user. Routes behind
/// `auth_middleware` get the user from request extensions; elsewhere the
/// token is checked directly.
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>() {
            return Ok(user.clone());
        }
        Ok(auth::authenticate(&state.db, &parts.headers).await?)
    }
}

/// Create the first admin user when the users table is empty and seed
/// credentials are configured.
pub async fn ensure_admin_user(
    pool: &DbPool,
    email: Option<&str>,
    password: Option<&str>,
    bcrypt_cost: u32,
) -> anyhow::Result<()> {
    let (email, password) = match (email, password) {
        (Some(email), Some(password)) => (email, password),
        _ => return Ok(()),
    };

    if User::count(pool).await? > 0 {
        return Ok(());
    }

    let password_hash = auth::password::hash_password(password, bcrypt_cost)?;
    let id = User::create(
        pool,
        NewUser {
            email: email.to_string(),
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            password_hash,
            active: true,
        },
    )
    .await?;

    info!(user_id = id, email, "created initial admin user");
    Ok(())
}
