//! User model and queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::{with_timeout, DbPool, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a user. The password is hashed before it
/// reaches this type.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub active: bool,
}

/// Response DTO that excludes the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub active: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            active: user.active,
        }
    }
}

/// Emails are stored and compared lowercase.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    pub async fn all(pool: &DbPool) -> Result<Vec<User>, StoreError> {
        with_timeout(
            sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY last_name")
                .fetch_all(pool),
        )
        .await
    }

    pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<User>, StoreError> {
        with_timeout(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(pool),
        )
        .await
    }

    pub async fn find_by_email(pool: &DbPool, email: &str) -> Result<Option<User>, StoreError> {
        with_timeout(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
                .bind(normalize_email(email))
                .fetch_optional(pool),
        )
        .await
    }

    pub async fn count(pool: &DbPool) -> Result<i64, StoreError> {
        with_timeout(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users").fetch_one(pool),
        )
        .await
    }

    pub async fn create(pool: &DbPool, new: NewUser) -> Result<i64, StoreError> {
        let now = Utc::now();
        with_timeout(
            sqlx::query_scalar::<_, i64>(
                "INSERT INTO users (email, first_name, last_name, password_hash, active, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
            )
            .bind(normalize_email(&new.email))
            .bind(new.first_name)
            .bind(new.last_name)
            .bind(new.password_hash)
            .bind(new.active)
            .bind(now)
            .bind(now)
            .fetch_one(pool),
        )
        .await
    }

    /// Update profile fields and the active flag. The password is handled
    /// separately via [`User::set_password`].
    pub async fn update(&self, pool: &DbPool) -> Result<(), StoreError> {
        with_timeout(async {
            sqlx::query(
                "UPDATE users SET email = ?, first_name = ?, last_name = ?, active = ?, updated_at = ?
                 WHERE id = ?",
            )
            .bind(normalize_email(&self.email))
            .bind(&self.first_name)
            .bind(&self.last_name)
            .bind(self.active)
            .bind(Utc::now())
            .bind(self.id)
            .execute(pool)
            .await?;
            Ok(())
        })
        .await
    }

    pub async fn set_password(pool: &DbPool, id: i64, password_hash: &str) -> Result<(), StoreError> {
        with_timeout(async {
            sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
                .bind(password_hash)
                .bind(Utc::now())
                .bind(id)
                .execute(pool)
                .await?;
            Ok(())
        })
        .await
    }

    /// Delete a user and any token they own, in one transaction.
    pub async fn delete(pool: &DbPool, id: i64) -> Result<(), StoreError> {
        with_timeout(async {
            let mut tx = pool.begin().await?;
            sqlx::query("DELETE FROM tokens WHERE user_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM users WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{memory_pool, Token};

    fn sample(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            first_name: "John".to_string(),
            last_name: "Martin".to_string(),
            password_hash: "$2b$04$fakefakefakefakefakefake".to_string(),
            active: true,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let pool = memory_pool().await;
        let id = User::create(&pool, sample("testing@testing.com")).await.unwrap();

        let user = User::find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(user.email, "testing@testing.com");
        assert!(user.active);

        assert!(User::find_by_id(&pool, id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_insensitive() {
        let pool = memory_pool().await;
        User::create(&pool, sample("Mixed.Case@Example.COM")).await.unwrap();

        let user = User::find_by_email(&pool, "mixed.case@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.email, "mixed.case@example.com");
        assert!(User::find_by_email(&pool, "MIXED.CASE@EXAMPLE.COM")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_update_profile() {
        let pool = memory_pool().await;
        let id = User::create(&pool, sample("a@b.com")).await.unwrap();

        let mut user = User::find_by_id(&pool, id).await.unwrap().unwrap();
        user.first_name = "Jane".to_string();
        user.active = false;
        user.update(&pool).await.unwrap();

        let reloaded = User::find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(reloaded.first_name, "Jane");
        assert!(!reloaded.active);
    }

    #[tokio::test]
    async fn test_delete_removes_owned_tokens() {
        let pool = memory_pool().await;
        let id = User::create(&pool, sample("a@b.com")).await.unwrap();

        let issued =
            crate::auth::token::generate(id, "a@b.com", chrono::Duration::hours(1)).unwrap();
        Token::insert(&pool, &issued).await.unwrap();

        User::delete(&pool, id).await.unwrap();
        assert!(User::find_by_id(&pool, id).await.unwrap().is_none());
        assert!(Token::find_by_plaintext(&pool, &issued.plaintext)
            .await
            .unwrap()
            .is_none());
    }
}
