//! Token store.
//!
//! Rows hold only the SHA-256 digest of the plaintext token, so every
//! lookup goes through the hash index. A user owns at most one row:
//! inserting supersedes any prior row for that user inside a single
//! transaction, so racing logins resolve to last-writer-wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::token::{hash_token, IssuedToken};
use crate::db::{with_timeout, DbPool, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Token {
    pub id: i64,
    pub user_id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
}

impl Token {
    /// Persist a freshly issued token, deleting any prior token row for
    /// the same user in the same transaction.
    pub async fn insert(pool: &DbPool, issued: &IssuedToken) -> Result<(), StoreError> {
        with_timeout(async {
            let now = Utc::now();
            let mut tx = pool.begin().await?;
            sqlx::query("DELETE FROM tokens WHERE user_id = ?")
                .bind(issued.user_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "INSERT INTO tokens (user_id, email, token_hash, created_at, updated_at, expiry)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(issued.user_id)
            .bind(&issued.email)
            .bind(&issued.hash)
            .bind(now)
            .bind(now)
            .bind(issued.expiry)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    /// Look up a token row by the digest of the presented plaintext.
    pub async fn find_by_plaintext(pool: &DbPool, plain: &str) -> Result<Option<Token>, StoreError> {
        with_timeout(
            sqlx::query_as::<_, Token>("SELECT * FROM tokens WHERE token_hash = ?")
                .bind(hash_token(plain))
                .fetch_optional(pool),
        )
        .await
    }

    /// Delete the row matching the presented plaintext. Deleting a token
    /// that does not exist is not an error.
    pub async fn delete_by_plaintext(pool: &DbPool, plain: &str) -> Result<(), StoreError> {
        with_timeout(async {
            sqlx::query("DELETE FROM tokens WHERE token_hash = ?")
                .bind(hash_token(plain))
                .execute(pool)
                .await?;
            Ok(())
        })
        .await
    }

    /// Forcibly log a user out by removing every token they own.
    pub async fn delete_all_for_user(pool: &DbPool, user_id: i64) -> Result<(), StoreError> {
        with_timeout(async {
            sqlx::query("DELETE FROM tokens WHERE user_id = ?")
                .bind(user_id)
                .execute(pool)
                .await?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::generate;
    use crate::db::{memory_pool, NewUser, User};
    use chrono::Duration;

    async fn seeded_user(pool: &DbPool, email: &str) -> i64 {
        User::create(
            pool,
            NewUser {
                email: email.to_string(),
                first_name: "John".to_string(),
                last_name: "Martin".to_string(),
                password_hash: "$2b$04$fakefakefakefakefakefake".to_string(),
                active: true,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find_by_plaintext() {
        let pool = memory_pool().await;
        let user_id = seeded_user(&pool, "a@b.com").await;

        let issued = generate(user_id, "a@b.com", Duration::hours(24)).unwrap();
        Token::insert(&pool, &issued).await.unwrap();

        let row = Token::find_by_plaintext(&pool, &issued.plaintext)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.user_id, user_id);
        assert_eq!(row.token_hash, issued.hash);

        assert!(Token::find_by_plaintext(&pool, "AAAAAAAAAAAAAAAAAAAAAAAAAA")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_insert_supersedes_prior_token() {
        let pool = memory_pool().await;
        let user_id = seeded_user(&pool, "a@b.com").await;

        let first = generate(user_id, "a@b.com", Duration::hours(24)).unwrap();
        Token::insert(&pool, &first).await.unwrap();
        let second = generate(user_id, "a@b.com", Duration::hours(24)).unwrap();
        Token::insert(&pool, &second).await.unwrap();

        // the earlier token is gone, exactly one row survives
        assert!(Token::find_by_plaintext(&pool, &first.plaintext)
            .await
            .unwrap()
            .is_none());
        assert!(Token::find_by_plaintext(&pool, &second.plaintext)
            .await
            .unwrap()
            .is_some());
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_delete_by_plaintext_is_idempotent() {
        let pool = memory_pool().await;
        let user_id = seeded_user(&pool, "a@b.com").await;

        let issued = generate(user_id, "a@b.com", Duration::hours(24)).unwrap();
        Token::insert(&pool, &issued).await.unwrap();

        Token::delete_by_plaintext(&pool, &issued.plaintext).await.unwrap();
        assert!(Token::find_by_plaintext(&pool, &issued.plaintext)
            .await
            .unwrap()
            .is_none());
        // deleting again is not an error
        Token::delete_by_plaintext(&pool, &issued.plaintext).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_all_for_user() {
        let pool = memory_pool().await;
        let a = seeded_user(&pool, "a@b.com").await;
        let b = seeded_user(&pool, "b@b.com").await;

        let token_a = generate(a, "a@b.com", Duration::hours(24)).unwrap();
        let token_b = generate(b, "b@b.com", Duration::hours(24)).unwrap();
        Token::insert(&pool, &token_a).await.unwrap();
        Token::insert(&pool, &token_b).await.unwrap();

        Token::delete_all_for_user(&pool, a).await.unwrap();
        assert!(Token::find_by_plaintext(&pool, &token_a.plaintext)
            .await
            .unwrap()
            .is_none());
        assert!(Token::find_by_plaintext(&pool, &token_b.plaintext)
            .await
            .unwrap()
            .is_some());
    }
}
