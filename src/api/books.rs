//! Public catalog endpoints and admin book editing.

use axum::{
    extract::{Path, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::error::ApiError;
use crate::db::{slugify, Author, AuthorChoice, Book};
use crate::AppState;

pub async fn list_books(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Book>>, ApiError> {
    let books = Book::all(&state.db).await?;
    Ok(Json(books))
}

pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Book>, ApiError> {
    let book = Book::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Book not found"))?;
    Ok(Json(book))
}

pub async fn list_authors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AuthorChoice>>, ApiError> {
    let authors = Author::all(&state.db).await?;
    let choices = authors
        .into_iter()
        .map(|author| AuthorChoice {
            value: author.id,
            text: author.author_name,
        })
        .collect();
    Ok(Json(choices))
}

#[derive(Debug, Deserialize)]
pub struct SaveBookRequest {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    pub author_id: i64,
    #[serde(default)]
    pub publication_year: i64,
    #[serde(default)]
    pub description: String,
    /// base64-encoded JPEG cover, written to `<static_dir>/covers/<slug>.jpg`
    #[serde(default)]
    pub cover: String,
}

/// Create or update a book. The slug is derived from the title.
pub async fn save_book(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SaveBookRequest>,
) -> Result<Json<Book>, ApiError> {
    if request.title.is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }

    let slug = slugify(&request.title);

    if !request.cover.is_empty() {
        let decoded = BASE64
            .decode(&request.cover)
            .map_err(|_| ApiError::bad_request("Cover is not valid base64"))?;
        let covers_dir = state.config.server.static_dir.join("covers");
        std::fs::create_dir_all(&covers_dir)
            .and_then(|_| std::fs::write(covers_dir.join(format!("{slug}.jpg")), decoded))
            .map_err(|err| {
                tracing::error!(error = %err, "failed to write cover image");
                ApiError::internal("Failed to store cover image")
            })?;
    }

    let id = if request.id == 0 {
        let id = Book::insert(
            &state.db,
            &request.title,
            request.author_id,
            request.publication_year,
            &slug,
            &request.description,
        )
        .await?;
        info!(book_id = id, %slug, "book created");
        id
    } else {
        let mut book = Book::find_by_id(&state.db, request.id)
            .await?
            .ok_or_else(|| ApiError::not_found("Book not found"))?;
        book.title = request.title;
        book.author_id = request.author_id;
        book.publication_year = request.publication_year;
        book.description = request.description;
        book.slug = slug;
        book.update(&state.db).await?;
        info!(book_id = book.id, "book updated");
        book.id
    };

    let book = Book::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::internal("Book vanished after save"))?;
    Ok(Json(book))
}
