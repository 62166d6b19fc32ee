//! Admin user management endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::auth::MessageResponse;
use super::error::ApiError;
use crate::auth::password;
use crate::db::{NewUser, Token, User, UserResponse};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SaveUserRequest {
    #[serde(default)]
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Plaintext password; required on create, optional on update
    /// (non-empty value resets the password)
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = User::all(&state.db).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserResponse::from(user)))
}

/// Create or update a user. `id = 0` (or absent) creates; otherwise the
/// profile is updated and a non-empty password resets the credential.
pub async fn save_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SaveUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if request.email.is_empty() || !request.email.contains('@') {
        return Err(ApiError::bad_request("Invalid email address"));
    }

    let cost = state.config.auth.bcrypt_cost;

    if request.id == 0 {
        if request.password.is_empty() {
            return Err(ApiError::bad_request("Password is required"));
        }
        let password_hash = password::hash_password(&request.password, cost)
            .map_err(|_| ApiError::internal("Failed to hash password"))?;
        let id = User::create(
            &state.db,
            NewUser {
                email: request.email,
                first_name: request.first_name,
                last_name: request.last_name,
                password_hash,
                active: request.active,
            },
        )
        .await?;
        info!(user_id = id, "user created");
        let user = User::find_by_id(&state.db, id)
            .await?
            .ok_or_else(|| ApiError::internal("User vanished after insert"))?;
        return Ok(Json(UserResponse::from(user)));
    }

    let mut user = User::find_by_id(&state.db, request.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    user.email = request.email;
    user.first_name = request.first_name;
    user.last_name = request.last_name;
    user.active = request.active;
    user.update(&state.db).await?;

    if !request.password.is_empty() {
        let password_hash = password::hash_password(&request.password, cost)
            .map_err(|_| ApiError::internal("Failed to hash password"))?;
        User::set_password(&state.db, user.id, &password_hash).await?;
    }

    info!(user_id = user.id, "user updated");
    Ok(Json(UserResponse::from(user)))
}

/// Delete a user; their token goes with them in the same transaction.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    User::delete(&state.db, id).await?;

    info!(user_id = id, "user deleted");
    Ok(Json(MessageResponse {
        message: "User deleted".to_string(),
    }))
}

/// Forced logout: mark the account inactive and destroy every token it
/// owns, so in-flight bearer tokens stop working immediately.
pub async fn logout_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    user.active = false;
    user.update(&state.db).await?;
    Token::delete_all_for_user(&state.db, id).await?;

    info!(user_id = id, "user forcibly logged out and set inactive");
    Ok(Json(MessageResponse {
        message: "User is logged out and set to inactive".to_string(),
    }))
}
