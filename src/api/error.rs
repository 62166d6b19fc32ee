//! Unified API error handling.
//!
//! Every endpoint reports failures through the same JSON envelope with an
//! appropriate HTTP status code. Authentication failures are deliberately
//! collapsed to a generic message so callers cannot tell which sub-check
//! failed; the detail lands in the logs instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;
use crate::db::StoreError;

/// Error codes for API responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Client errors (4xx)
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,

    // Server errors (5xx)
    InternalError,
    DatabaseError,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::InternalError => "internal_error",
            ErrorCode::DatabaseError => "database_error",
        }
    }
}

/// The inner error object in the response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

/// The full error response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Unified API error type
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let response = ErrorResponse {
            error: ErrorBody {
                code: self.code.as_str().to_string(),
                message: self.message,
            },
        };

        (self.code.status_code(), Json(response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::unauthorized("invalid credentials"),
            AuthError::AccountInactive => ApiError::forbidden("account is inactive"),
            AuthError::MalformedHeader
            | AuthError::InvalidTokenFormat
            | AuthError::TokenNotFound
            | AuthError::TokenExpired
            | AuthError::UserNotFound => {
                tracing::debug!(error = %err, "authentication rejected");
                ApiError::unauthorized("user is not logged in, invalid credentials")
            }
            AuthError::RandomSource => {
                tracing::error!("random source unavailable");
                ApiError::internal("token generation failed")
            }
            AuthError::Store(store) => store.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout => {
                tracing::error!("database operation timed out");
                ApiError::database("database operation timed out")
            }
            // Defer to the sqlx mapping so constraint violations keep
            // their client-error statuses
            StoreError::Unavailable(sqlx_err) => sqlx_err.into(),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {}", err);

        match &err {
            sqlx::Error::RowNotFound => ApiError::not_found("Resource not found"),
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                if msg.contains("UNIQUE constraint failed") {
                    ApiError::conflict("A resource with this identifier already exists")
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    ApiError::bad_request("Referenced resource does not exist")
                } else {
                    ApiError::database("A database error occurred")
                }
            }
            _ => ApiError::database("A database error occurred"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status_codes() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::DatabaseError.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_api_error_creation() {
        let err = ApiError::not_found("Book not found");
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Book not found");
    }

    #[test]
    fn test_credential_and_token_failures_map_to_401() {
        for err in [
            AuthError::InvalidCredentials,
            AuthError::MalformedHeader,
            AuthError::InvalidTokenFormat,
            AuthError::TokenNotFound,
            AuthError::TokenExpired,
            AuthError::UserNotFound,
        ] {
            let api: ApiError = err.into();
            assert_eq!(api.code.status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_external_messages_hide_the_failing_check() {
        let creds: ApiError = AuthError::InvalidCredentials.into();
        assert_eq!(creds.message, "invalid credentials");

        // token failures all read the same regardless of the sub-check
        let expired: ApiError = AuthError::TokenExpired.into();
        let missing: ApiError = AuthError::TokenNotFound.into();
        assert_eq!(expired.message, missing.message);
        assert!(!expired.message.contains("expired"));
    }

    #[tokio::test]
    async fn test_duplicate_email_maps_to_conflict() {
        use crate::db::{memory_pool, NewUser, User};

        let pool = memory_pool().await;
        let new = |email: &str| NewUser {
            email: email.to_string(),
            first_name: "John".to_string(),
            last_name: "Martin".to_string(),
            password_hash: "$2b$04$fakefakefakefakefakefake".to_string(),
            active: true,
        };

        User::create(&pool, new("a@b.com")).await.unwrap();
        let err = User::create(&pool, new("a@b.com")).await.unwrap_err();

        let api: ApiError = err.into();
        assert_eq!(api.code, ErrorCode::Conflict);
        assert_eq!(api.code.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_inactive_maps_to_403_and_store_to_500() {
        let inactive: ApiError = AuthError::AccountInactive.into();
        assert_eq!(inactive.code.status_code(), StatusCode::FORBIDDEN);

        let timeout: ApiError = AuthError::Store(StoreError::Timeout).into();
        assert_eq!(timeout.code.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let random: ApiError = AuthError::RandomSource.into();
        assert_eq!(random.code.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
