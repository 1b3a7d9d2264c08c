use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;

use crate::users::{dto::CreateUserRequest, repo_types::User};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("user not found")]
    NotFound,
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("database unreachable: {0}")]
    Unreachable(#[source] sqlx::Error),
    #[error("database error: {0}")]
    Internal(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Self::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => Self::Unreachable(err),
            other => Self::Internal(other),
        }
    }
}

/// Persistence operations for users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert an active user and return the stored row.
    async fn create_user(
        &self,
        req: &CreateUserRequest,
        password_hash: &str,
    ) -> Result<User, RepoError>;

    /// Fetch an active user by id.
    async fn get_user_by_id(&self, id: i64) -> Result<User, RepoError>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(
        &self,
        req: &CreateUserRequest,
        password_hash: &str,
    ) -> Result<User, RepoError> {
        let now = OffsetDateTime::now_utc();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, name, password, middle_name, surname, bio,
                               active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, true, $8, $9)
            RETURNING id, username, email, name, password, middle_name, surname, bio,
                      active, created_at, updated_at
            "#,
        )
        .bind(&req.username)
        .bind(&req.email)
        .bind(&req.name)
        .bind(password_hash)
        .bind(&req.middle_name)
        .bind(&req.surname)
        .bind(&req.bio)
        .bind(now)
        .bind(now)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<User, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, name, password, middle_name, surname, bio,
                   active, created_at, updated_at
            FROM users
            WHERE id = $1 AND active = true
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(RepoError::NotFound)?;
        Ok(user)
    }
}
