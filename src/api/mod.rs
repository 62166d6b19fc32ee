pub mod auth;
mod books;
mod error;
mod users;

pub use error::{ApiError, ErrorCode};

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/validate", post(auth::validate))
        .route("/me", get(auth::me));

    // Public catalog routes
    let catalog_routes = Router::new()
        .route("/books", get(books::list_books))
        .route("/books/:slug", get(books::get_book))
        .route("/authors", get(books::list_authors));

    // Protected admin routes
    let admin_routes = Router::new()
        .route("/users", get(users::list_users))
        .route("/users", post(users::save_user))
        .route("/users/:id", get(users::get_user))
        .route("/users/:id", delete(users::delete_user))
        .route("/users/:id/logout", post(users::logout_user))
        .route("/books", post(books::save_book))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", catalog_routes)
        .nest("/api/admin", admin_routes)
        .fallback_service(ServeDir::new(&state.config.server.static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
