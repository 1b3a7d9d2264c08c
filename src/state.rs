use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::db;
use crate::users::{
    password::Argon2Hasher,
    repo::{PgUserRepository, UserRepository},
    services::{UserService, UserServiceImpl},
};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserService>,
}

impl AppState {
    /// Wire pool → repository → service from the loaded config.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = db::connect(&config.database).await?;
        let repo = Arc::new(PgUserRepository::new(db.clone()));
        Self::with_repository(db, Arc::new(config), repo)
    }

    /// Same wiring over any repository, e.g. the in-memory one in tests.
    pub fn with_repository(
        db: PgPool,
        config: Arc<AppConfig>,
        repo: Arc<dyn UserRepository>,
    ) -> anyhow::Result<Self> {
        let hasher = Arc::new(Argon2Hasher::new()?);
        let users = Arc::new(UserServiceImpl::new(repo, hasher)) as Arc<dyn UserService>;
        Ok(Self::from_parts(db, config, users))
    }

    pub fn from_parts(db: PgPool, config: Arc<AppConfig>, users: Arc<dyn UserService>) -> Self {
        Self { db, config, users }
    }
}
