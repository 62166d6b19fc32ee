//! Book and author models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::{with_timeout, DbPool, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author_id: i64,
    pub publication_year: i64,
    pub slug: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Author {
    pub id: i64,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Shape used by select dropdowns in the admin UI.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorChoice {
    pub value: i64,
    pub text: String,
}

impl Book {
    pub async fn all(pool: &DbPool) -> Result<Vec<Book>, StoreError> {
        with_timeout(
            sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY title").fetch_all(pool),
        )
        .await
    }

    pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Book>, StoreError> {
        with_timeout(
            sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = ?")
                .bind(id)
                .fetch_optional(pool),
        )
        .await
    }

    pub async fn find_by_slug(pool: &DbPool, slug: &str) -> Result<Option<Book>, StoreError> {
        with_timeout(
            sqlx::query_as::<_, Book>("SELECT * FROM books WHERE slug = ?")
                .bind(slug)
                .fetch_optional(pool),
        )
        .await
    }

    pub async fn insert(
        pool: &DbPool,
        title: &str,
        author_id: i64,
        publication_year: i64,
        slug: &str,
        description: &str,
    ) -> Result<i64, StoreError> {
        let now = Utc::now();
        with_timeout(
            sqlx::query_scalar::<_, i64>(
                "INSERT INTO books (title, author_id, publication_year, slug, description, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
            )
            .bind(title)
            .bind(author_id)
            .bind(publication_year)
            .bind(slug)
            .bind(description)
            .bind(now)
            .bind(now)
            .fetch_one(pool),
        )
        .await
    }

    pub async fn update(&self, pool: &DbPool) -> Result<(), StoreError> {
        with_timeout(async {
            sqlx::query(
                "UPDATE books SET title = ?, author_id = ?, publication_year = ?, slug = ?, description = ?, updated_at = ?
                 WHERE id = ?",
            )
            .bind(&self.title)
            .bind(self.author_id)
            .bind(self.publication_year)
            .bind(&self.slug)
            .bind(&self.description)
            .bind(Utc::now())
            .bind(self.id)
            .execute(pool)
            .await?;
            Ok(())
        })
        .await
    }
}

impl Author {
    pub async fn all(pool: &DbPool) -> Result<Vec<Author>, StoreError> {
        with_timeout(
            sqlx::query_as::<_, Author>("SELECT * FROM authors ORDER BY author_name")
                .fetch_all(pool),
        )
        .await
    }
}

/// URL-friendly slug for a book title.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|ch| match ch {
            'a'..='z' | '0'..='9' => ch,
            _ => '-',
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    async fn seeded_author(pool: &DbPool, name: &str) -> i64 {
        let now = Utc::now();
        sqlx::query_scalar(
            "INSERT INTO authors (author_name, created_at, updated_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("The Go Programming Language"), "the-go-programming-language");
        assert_eq!(slugify("Brave  New   World"), "brave-new-world");
        assert_eq!(slugify("1984"), "1984");
        assert_eq!(slugify("Moby-Dick; or, The Whale"), "moby-dick-or-the-whale");
    }

    #[tokio::test]
    async fn test_insert_and_find_by_slug() {
        let pool = memory_pool().await;
        let author_id = seeded_author(&pool, "George Orwell").await;

        let slug = slugify("Animal Farm");
        Book::insert(&pool, "Animal Farm", author_id, 1945, &slug, "A fable").await.unwrap();

        let book = Book::find_by_slug(&pool, "animal-farm").await.unwrap().unwrap();
        assert_eq!(book.title, "Animal Farm");
        assert_eq!(book.author_id, author_id);
        assert!(Book::find_by_slug(&pool, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_book() {
        let pool = memory_pool().await;
        let author_id = seeded_author(&pool, "George Orwell").await;
        let id = Book::insert(&pool, "1984", author_id, 1948, "1984", "").await.unwrap();

        let mut book = Book::find_by_slug(&pool, "1984").await.unwrap().unwrap();
        assert_eq!(book.id, id);
        book.publication_year = 1949;
        book.update(&pool).await.unwrap();

        let reloaded = Book::find_by_slug(&pool, "1984").await.unwrap().unwrap();
        assert_eq!(reloaded.publication_year, 1949);
    }

    #[tokio::test]
    async fn test_authors_ordered_by_name() {
        let pool = memory_pool().await;
        seeded_author(&pool, "Ursula K. Le Guin").await;
        seeded_author(&pool, "Aldous Huxley").await;

        let authors = Author::all(&pool).await.unwrap();
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[0].author_name, "Aldous Huxley");
    }
}
