//! The canonical, persistent record.
//!
//! Backed by a pooled PostgreSQL connection; every write goes through
//! a version-guarded `UPDATE ... WHERE version < $new` so a stale
//! batched write can never clobber a newer one.

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::error::CoordinatorError;
use crate::models::{RatingUpdate, User};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id SERIAL PRIMARY KEY,
    username VARCHAR(255) UNIQUE NOT NULL,
    rating INTEGER NOT NULL DEFAULT 1000,
    version BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_users_rating ON users (rating DESC);
CREATE INDEX IF NOT EXISTS idx_users_username ON users (username);
"#;

/// The canonical (id, username, rating, version) store.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<User>, CoordinatorError>;
    async fn get_by_id(&self, id: i64) -> Result<User, CoordinatorError>;
    async fn search_by_username(&self, query: &str) -> Result<Vec<User>, CoordinatorError>;
    async fn batch_apply(&self, updates: &[RatingUpdate]) -> Result<(), CoordinatorError>;
    async fn create_user(&self, username: &str, rating: i32) -> Result<User, CoordinatorError>;
    async fn random_ids(&self, n: i64) -> Result<Vec<i64>, CoordinatorError>;
}

fn row_to_user(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        rating: row.try_get("rating")?,
        version: row.try_get("version")?,
    })
}

/// PostgreSQL-backed [`DurableStore`].
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and apply the schema at construction time so the pool
    /// is ready to serve as soon as it's returned.
    pub async fn connect(database_url: &str) -> Result<Self, CoordinatorError> {
        let pool = PgPoolOptions::new()
            .max_connections(25)
            .min_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(|e| CoordinatorError::BackendUnavailable(e.to_string()))?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| CoordinatorError::BackendUnavailable(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Probe connectivity without applying schema; used at startup to
    /// turn an unreachable durable store into a fatal init error.
    pub async fn health_check(&self) -> Result<(), CoordinatorError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| CoordinatorError::BackendUnavailable(e.to_string()))
    }
}

#[async_trait]
impl DurableStore for PostgresStore {
    async fn load_all(&self) -> Result<Vec<User>, CoordinatorError> {
        let rows = sqlx::query("SELECT id, username, rating, version FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| row_to_user(r).map_err(CoordinatorError::from))
            .collect()
    }

    async fn get_by_id(&self, id: i64) -> Result<User, CoordinatorError> {
        let row = sqlx::query("SELECT id, username, rating, version FROM users WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row_to_user(&row)?)
    }

    async fn search_by_username(&self, query: &str) -> Result<Vec<User>, CoordinatorError> {
        let pattern = format!("%{query}%");
        let rows = sqlx::query(
            "SELECT id, username, rating, version FROM users \
             WHERE LOWER(username) LIKE LOWER($1) ORDER BY rating DESC LIMIT 100",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| row_to_user(r).map_err(CoordinatorError::from))
            .collect()
    }

    async fn batch_apply(&self, updates: &[RatingUpdate]) -> Result<(), CoordinatorError> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for update in updates {
            sqlx::query(
                "UPDATE users SET rating = $1, version = $2, updated_at = now() \
                 WHERE id = $3 AND version < $2",
            )
            .bind(update.rating)
            .bind(update.version)
            .bind(update.user_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn create_user(&self, username: &str, rating: i32) -> Result<User, CoordinatorError> {
        let row = sqlx::query(
            "INSERT INTO users (username, rating, version) VALUES ($1, $2, 0) \
             RETURNING id, username, rating, version",
        )
        .bind(username)
        .bind(rating)
        .fetch_one(&self.pool)
        .await?;
        Ok(row_to_user(&row)?)
    }

    async fn random_ids(&self, n: i64) -> Result<Vec<i64>, CoordinatorError> {
        let rows = sqlx::query("SELECT id FROM users ORDER BY RANDOM() LIMIT $1")
            .bind(n)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| r.try_get("id").map_err(CoordinatorError::from))
            .collect()
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod fake {
    //! An in-memory [`DurableStore`] used by integration tests to
    //! exercise the write-behind pipeline without a real database.

    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct FakeDurableStore {
        users: Mutex<HashMap<i64, User>>,
        next_id: Mutex<i64>,
    }

    impl FakeDurableStore {
        pub fn new() -> Self {
            Self {
                users: Mutex::new(HashMap::new()),
                next_id: Mutex::new(1),
            }
        }
    }

    #[async_trait]
    impl DurableStore for FakeDurableStore {
        async fn load_all(&self) -> Result<Vec<User>, CoordinatorError> {
            let mut users: Vec<User> = self.users.lock().values().cloned().collect();
            users.sort_by_key(|u| u.id);
            Ok(users)
        }

        async fn get_by_id(&self, id: i64) -> Result<User, CoordinatorError> {
            self.users
                .lock()
                .get(&id)
                .cloned()
                .ok_or(CoordinatorError::NotFound)
        }

        async fn search_by_username(&self, query: &str) -> Result<Vec<User>, CoordinatorError> {
            let query = query.to_lowercase();
            let mut matches: Vec<User> = self
                .users
                .lock()
                .values()
                .filter(|u| u.username.to_lowercase().contains(&query))
                .cloned()
                .collect();
            matches.sort_by(|a, b| b.rating.cmp(&a.rating));
            matches.truncate(100);
            Ok(matches)
        }

        async fn batch_apply(&self, updates: &[RatingUpdate]) -> Result<(), CoordinatorError> {
            let mut users = self.users.lock();
            for update in updates {
                if let Some(user) = users.get_mut(&update.user_id) {
                    if update.version > user.version {
                        user.rating = update.rating;
                        user.version = update.version;
                    }
                }
            }
            Ok(())
        }

        async fn create_user(&self, username: &str, rating: i32) -> Result<User, CoordinatorError> {
            let mut next_id = self.next_id.lock();
            let id = *next_id;
            *next_id += 1;
            let user = User {
                id,
                username: username.to_string(),
                rating,
                version: 0,
            };
            self.users.lock().insert(id, user.clone());
            Ok(user)
        }

        async fn random_ids(&self, n: i64) -> Result<Vec<i64>, CoordinatorError> {
            Ok(self.users.lock().keys().take(n as usize).copied().collect())
        }
    }
}
