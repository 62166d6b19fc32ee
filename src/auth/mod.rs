//! Token-based authentication.
//!
//! Login verifies credentials and issues an opaque bearer token; every
//! authenticated request presents that token in an `Authorization: Bearer`
//! header and is re-checked against the store. Failures are typed so the
//! HTTP layer can map them to status codes without leaking which check
//! failed to the caller.

pub mod password;
pub mod token;

use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::debug;

use crate::db::{DbPool, StoreError, Token, User};
use token::IssuedToken;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password. Deliberately one variant for both,
    /// so callers cannot enumerate accounts.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is inactive")]
    AccountInactive,
    #[error("malformed authorization header")]
    MalformedHeader,
    #[error("token size is not valid")]
    InvalidTokenFormat,
    #[error("no matching token found")]
    TokenNotFound,
    #[error("token has expired")]
    TokenExpired,
    #[error("no matching user found")]
    UserNotFound,
    #[error("random source unavailable")]
    RandomSource,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Verify credentials and issue a fresh token, superseding any prior one.
///
/// The active-flag check runs after password verification on purpose:
/// identity is confirmed before account state is disclosed.
pub async fn login(
    pool: &DbPool,
    email: &str,
    password: &str,
    ttl: Duration,
) -> Result<(IssuedToken, User), AuthError> {
    let user = User::find_by_email(pool, email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let matched = password::verify_password(password, &user.password_hash).unwrap_or_else(|err| {
        debug!(user_id = user.id, error = %err, "password verification failed");
        false
    });
    if !matched {
        debug!(user_id = user.id, "password mismatch");
        return Err(AuthError::InvalidCredentials);
    }

    if !user.active {
        return Err(AuthError::AccountInactive);
    }

    let issued = token::generate(user.id, &user.email, ttl)?;
    Token::insert(pool, &issued).await?;

    Ok((issued, user))
}

/// Destroy the token matching the presented plaintext. Idempotent.
pub async fn logout(pool: &DbPool, plain: &str) -> Result<(), AuthError> {
    Token::delete_by_plaintext(pool, plain).await?;
    Ok(())
}

/// Resolve the bearer token on a request to its owning user.
///
/// Read-only: expired tokens are rejected but not deleted here.
pub async fn authenticate(pool: &DbPool, headers: &HeaderMap) -> Result<User, AuthError> {
    let plain = bearer_token(headers)?;

    if plain.len() != token::TOKEN_LENGTH {
        return Err(AuthError::InvalidTokenFormat);
    }

    let record = Token::find_by_plaintext(pool, plain)
        .await?
        .ok_or(AuthError::TokenNotFound)?;

    // The row was fetched by hash, but re-check in constant time so the
    // stored digest always equals the digest of the presented plaintext.
    if !token::hashes_match(&record.token_hash, &token::hash_token(plain)) {
        return Err(AuthError::TokenNotFound);
    }

    if record.expiry < Utc::now() {
        return Err(AuthError::TokenExpired);
    }

    User::find_by_id(pool, record.user_id)
        .await?
        .ok_or(AuthError::UserNotFound)
}

/// Boolean-only token check: true when the token resolves to a live user
/// and has not expired. Lookup errors collapse to `false`.
pub async fn validate_token(pool: &DbPool, plain: &str) -> bool {
    let record = match Token::find_by_plaintext(pool, plain).await {
        Ok(Some(record)) => record,
        _ => return false,
    };
    match User::find_by_id(pool, record.user_id).await {
        Ok(Some(_)) => record.expiry > Utc::now(),
        _ => false,
    }
}

/// Pull the token out of a standard `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MalformedHeader)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(plain), None) if !plain.is_empty() => Ok(plain),
        _ => Err(AuthError::MalformedHeader),
    }
}
