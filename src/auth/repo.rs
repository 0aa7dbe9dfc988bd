use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use tracing::warn;

use crate::error::AppError;

/// Deadline for any single store call. A hung store surfaces as a
/// retryable `StoreTimeout` instead of stalling the request.
const STORE_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// User row in the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: Option<String>,
    pub created_at: OffsetDateTime,
}

async fn with_deadline<T>(
    op: &'static str,
    fut: impl std::future::Future<Output = Result<T, sqlx::Error>>,
) -> Result<T, AppError> {
    match tokio::time::timeout(STORE_CALL_TIMEOUT, fut).await {
        Ok(res) => res.map_err(AppError::from),
        Err(_) => {
            warn!(op, "user store call exceeded deadline");
            Err(AppError::StoreTimeout)
        }
    }
}

impl User {
    /// Find a user by exact (case-sensitive) username.
    pub async fn find_by_username(db: &SqlitePool, username: &str) -> Result<Option<User>, AppError> {
        let query = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, email, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(db);
        with_deadline("find_by_username", query).await
    }

    /// Insert a new user with a hashed password; email starts NULL.
    ///
    /// The table's UNIQUE constraint is the authority on username
    /// uniqueness; a violation here surfaces as `Conflict` even when a
    /// prior existence check saw nothing.
    pub async fn create(db: &SqlitePool, username: &str, password_hash: &str) -> Result<User, AppError> {
        let query = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES (?, ?)
            RETURNING id, username, password_hash, email, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(db);
        with_deadline("create", query).await.map_err(|e| match e {
            AppError::Database(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                AppError::Conflict("username already exists".into())
            }
            other => other,
        })
    }

    /// Load a user by id; used by the authenticated profile route.
    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<User>, AppError> {
        let query = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, email, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(db);
        with_deadline("find_by_id", query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    #[tokio::test]
    async fn insert_is_immediately_visible() {
        let state = AppState::in_memory().await;
        let created = User::create(&state.db, "alice", "hash").await.expect("create");
        assert_eq!(created.id, 1);
        assert_eq!(created.username, "alice");
        assert!(created.email.is_none());

        let found = User::find_by_username(&state.db, "alice")
            .await
            .expect("find")
            .expect("row present");
        assert_eq!(found.id, created.id);
        assert_eq!(found.password_hash, "hash");
    }

    #[tokio::test]
    async fn username_lookup_is_case_sensitive() {
        let state = AppState::in_memory().await;
        User::create(&state.db, "alice", "hash").await.expect("create");
        let found = User::find_by_username(&state.db, "Alice").await.expect("find");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_conflict() {
        let state = AppState::in_memory().await;
        User::create(&state.db, "alice", "hash").await.expect("create");
        let err = User::create(&state.db, "alice", "other-hash").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn hung_store_surfaces_retryable_timeout() {
        let state = AppState::in_memory().await;
        // Hold the pool's only connection so the lookup can never
        // acquire one and its deadline fires.
        let _held = state.db.acquire().await.expect("acquire");
        let err = User::find_by_username(&state.db, "alice").await.unwrap_err();
        assert!(matches!(err, AppError::StoreTimeout));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn password_hash_never_serializes() {
        let state = AppState::in_memory().await;
        let user = User::create(&state.db, "alice", "hash").await.expect("create");
        let json = serde_json::to_string(&user).expect("serialize");
        assert!(!json.contains("hash"));
        assert!(json.contains("alice"));
    }
}
