use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::users::{
    dto::CreateUserRequest,
    repo::{RepoError, UserRepository},
    repo_types::User,
};

/// In-process substitute for the Postgres repository.
///
/// Mirrors the table semantics the service relies on: ids start at 1, usernames
/// are unique and inactive rows are invisible to reads.
#[derive(Default)]
pub struct InMemoryUserRepository {
    rows: Mutex<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, active or not.
    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Soft-delete a row. Returns false if the id is unknown.
    pub fn deactivate(&self, id: i64) -> bool {
        match self.rows().iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.active = false;
                true
            }
            None => false,
        }
    }

    fn rows(&self) -> MutexGuard<'_, Vec<User>> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(
        &self,
        req: &CreateUserRequest,
        password_hash: &str,
    ) -> Result<User, RepoError> {
        let mut rows = self.rows();
        if rows.iter().any(|u| u.username == req.username) {
            return Err(RepoError::Conflict("users_username_key".into()));
        }

        let now = OffsetDateTime::now_utc();
        let user = User {
            id: rows.len() as i64 + 1,
            username: req.username.clone(),
            email: req.email.clone(),
            name: req.name.clone(),
            password: password_hash.to_string(),
            middle_name: req.middle_name.clone(),
            surname: req.surname.clone(),
            bio: req.bio.clone(),
            active: true,
            created_at: now,
            updated_at: now,
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<User, RepoError> {
        self.rows()
            .iter()
            .find(|u| u.id == id && u.active)
            .cloned()
            .ok_or(RepoError::NotFound)
    }
}
