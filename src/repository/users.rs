//! Users repository (credential store)

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::user::{NewUser, UserRecord},
};

/// Storage contract for user records.
///
/// `insert` must check email uniqueness and assign the id atomically.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Exact, case-sensitive email match
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;

    async fn find_by_id(&self, id: i32) -> AppResult<Option<UserRecord>>;

    /// Fails with `Conflict` when the email is already registered
    async fn insert(&self, user: NewUser) -> AppResult<UserRecord>;

    /// All users in insertion order
    async fn list_all(&self) -> AppResult<Vec<UserRecord>>;
}

/// Process-lifetime user store
#[derive(Default)]
pub struct InMemoryUsersRepository {
    users: RwLock<Vec<UserRecord>>,
}

impl InMemoryUsersRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUsersRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        Ok(self.users.read().iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<UserRecord>> {
        Ok(self.users.read().iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, user: NewUser) -> AppResult<UserRecord> {
        // Held across check, id assignment and push
        let mut users = self.users.write();

        if users.iter().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let id = users.iter().map(|u| u.id).max().map_or(1, |max| max + 1);
        let record = UserRecord {
            id,
            display_name: user.display_name,
            email: user.email,
            role: user.role,
            password_hash: user.password_hash,
        };
        users.push(record.clone());

        Ok(record)
    }

    async fn list_all(&self) -> AppResult<Vec<UserRecord>> {
        Ok(self.users.read().clone())
    }
}
