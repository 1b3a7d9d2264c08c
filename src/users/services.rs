use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::{Validate, ValidationErrors};

use crate::users::{
    dto::CreateUserRequest,
    password::CredentialHasher,
    repo::{RepoError, UserRepository},
    repo_types::User,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Business operations for users.
#[async_trait]
pub trait UserService: Send + Sync {
    async fn create_user(&self, req: CreateUserRequest) -> Result<User, ServiceError>;
    async fn get_user_by_id(&self, id: i64) -> Result<User, ServiceError>;
}

pub struct UserServiceImpl {
    repo: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
}

impl UserServiceImpl {
    pub fn new(repo: Arc<dyn UserRepository>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { repo, hasher }
    }

    async fn hash_password(&self, plain: &str) -> anyhow::Result<String> {
        let hasher = Arc::clone(&self.hasher);
        let plain = plain.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .context("password hashing task failed")?
            .context("failed to hash password")
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    async fn create_user(&self, req: CreateUserRequest) -> Result<User, ServiceError> {
        if let Err(errors) = req.validate() {
            let msg = describe(&errors);
            warn!(username = %req.username, reason = %msg, "create user rejected");
            return Err(ServiceError::Validation(msg));
        }

        let hash = self.hash_password(&req.password).await.map_err(|e| {
            error!(error = %e, "hash_password failed");
            ServiceError::Internal(e)
        })?;

        let user = self
            .repo
            .create_user(&req, &hash)
            .await
            .map_err(|e| {
                // duplicates are not distinguished from other storage failures
                match &e {
                    RepoError::Conflict(constraint) => {
                        warn!(username = %req.username, %constraint, "user already exists")
                    }
                    other => error!(error = %other, "create user failed"),
                }
                ServiceError::Internal(anyhow::Error::new(e).context("failed to create user"))
            })?;

        info!(user_id = user.id, username = %user.username, "user created");
        Ok(user)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<User, ServiceError> {
        if id < 0 {
            return Err(ServiceError::Validation(format!("invalid id {id}")));
        }

        self.repo.get_user_by_id(id).await.map_err(|e| match e {
            RepoError::NotFound => ServiceError::NotFound,
            other => {
                error!(error = %other, user_id = id, "get user failed");
                ServiceError::Internal(anyhow::Error::new(other).context("failed to get user"))
            }
        })
    }
}

/// Flatten validator output into `field: reason; field: reason`, sorted by field.
fn describe(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let reasons = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{field}: {reasons}")
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{memory::InMemoryUserRepository, password::Argon2Hasher};

    struct FailingHasher;

    impl CredentialHasher for FailingHasher {
        fn hash(&self, _plain: &str) -> anyhow::Result<String> {
            anyhow::bail!("entropy source unavailable")
        }
        fn verify(&self, _plain: &str, _hash: &str) -> anyhow::Result<bool> {
            Ok(false)
        }
    }

    /// Counts calls so tests can assert storage was never touched.
    #[derive(Default)]
    struct CountingRepo {
        inner: InMemoryUserRepository,
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl UserRepository for CountingRepo {
        async fn create_user(
            &self,
            req: &CreateUserRequest,
            password_hash: &str,
        ) -> Result<User, RepoError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.create_user(req, password_hash).await
        }

        async fn get_user_by_id(&self, id: i64) -> Result<User, RepoError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.get_user_by_id(id).await
        }
    }

    impl CountingRepo {
        fn calls(&self) -> usize {
            self.calls.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    fn service_with(repo: Arc<dyn UserRepository>) -> UserServiceImpl {
        UserServiceImpl::new(repo, Arc::new(Argon2Hasher::new().unwrap()))
    }

    fn alice() -> CreateUserRequest {
        CreateUserRequest {
            username: "alice".into(),
            email: "a@x.com".into(),
            name: "Alice".into(),
            password: "secret1".into(),
            middle_name: Some("Pleasance".into()),
            surname: None,
            bio: Some("curious".into()),
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_same_record() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let svc = service_with(repo.clone());

        let created = svc.create_user(alice()).await.unwrap();
        let fetched = svc.get_user_by_id(created.id).await.unwrap();

        assert_eq!(created, fetched);
        assert_eq!(fetched.username, "alice");
        assert_eq!(fetched.middle_name.as_deref(), Some("Pleasance"));
        assert!(fetched.active);
        assert_eq!(fetched.created_at, fetched.updated_at);
    }

    #[tokio::test]
    async fn stores_a_verifiable_hash_not_the_plaintext() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let svc = service_with(repo.clone());
        let user = svc.create_user(alice()).await.unwrap();

        assert!(!user.password.is_empty());
        assert_ne!(user.password, "secret1");
        let hasher = Argon2Hasher::new().unwrap();
        assert!(hasher.verify("secret1", &user.password).unwrap());
    }

    #[tokio::test]
    async fn invalid_requests_never_reach_storage() {
        let repo = Arc::new(CountingRepo::default());
        let svc = service_with(repo.clone());

        let mut short_username = alice();
        short_username.username = "ab".into();
        let mut empty_email = alice();
        empty_email.email = String::new();
        let mut short_password = alice();
        short_password.password = "12345".into();

        for req in [short_username, empty_email, short_password] {
            let err = svc.create_user(req).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "got {err:?}");
        }
        assert_eq!(repo.calls(), 0);
        assert!(repo.inner.is_empty());
    }

    #[tokio::test]
    async fn validation_message_lists_every_field() {
        let svc = service_with(Arc::new(InMemoryUserRepository::new()));
        let req = CreateUserRequest {
            username: "ab".into(),
            ..Default::default()
        };
        let ServiceError::Validation(msg) = svc.create_user(req).await.unwrap_err() else {
            panic!("expected validation error");
        };
        assert!(msg.starts_with("email: "), "{msg}");
        for field in ["email", "name", "password", "username"] {
            assert!(msg.contains(&format!("{field}: ")), "{msg}");
        }
    }

    #[tokio::test]
    async fn negative_id_is_rejected_without_storage() {
        let repo = Arc::new(CountingRepo::default());
        let svc = service_with(repo.clone());
        let err = svc.get_user_by_id(-1).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(repo.calls(), 0);
    }

    #[tokio::test]
    async fn missing_and_deactivated_users_are_not_found() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let svc = service_with(repo.clone());

        assert!(matches!(
            svc.get_user_by_id(9_999_999).await,
            Err(ServiceError::NotFound)
        ));

        let user = svc.create_user(alice()).await.unwrap();
        repo.deactivate(user.id);
        assert!(matches!(
            svc.get_user_by_id(user.id).await,
            Err(ServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn duplicate_username_is_an_internal_failure() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let svc = service_with(repo.clone());
        svc.create_user(alice()).await.unwrap();
        let err = svc.create_user(alice()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)), "got {err:?}");
        assert!(format!("{err:#}").contains("unique constraint violated"));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn hasher_failure_is_internal_and_writes_nothing() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let svc = UserServiceImpl::new(repo.clone(), Arc::new(FailingHasher));
        let err = svc.create_user(alice()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));
        assert!(format!("{err:#}").contains("entropy source unavailable"));
        assert!(repo.is_empty());
    }
}
