//! User registration and lookup

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, NewUser, Role, User, UserRecord},
    repository::UserRepository,
    services::password::PasswordHasher,
};

#[derive(Clone)]
pub struct UsersService {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    open_admin_registration: bool,
}

impl UsersService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: PasswordHasher,
        open_admin_registration: bool,
    ) -> Self {
        Self {
            users,
            hasher,
            open_admin_registration,
        }
    }

    /// Register a new user; the email must not be taken.
    /// `caller` is the authenticated user making the request, if any.
    pub async fn create_user(
        &self,
        user: CreateUser,
        caller: Option<&UserRecord>,
    ) -> AppResult<User> {
        user.validate()?;

        if user.role == Role::Admin
            && !self.open_admin_registration
            && !caller.is_some_and(|c| c.has_role(Role::Admin))
        {
            return Err(AppError::Authorization(
                "Only administrators can create administrator accounts".to_string(),
            ));
        }

        // Cheap early exit; the repository re-checks under its write lock
        if self.users.find_by_email(&user.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = self.hasher.hash_blocking(user.password).await?;
        let created = self
            .users
            .insert(NewUser {
                display_name: user.display_name,
                email: user.email,
                role: user.role,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = created.id, role = %created.role, "User registered");
        Ok(User::from(created))
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        Ok(self
            .users
            .list_all()
            .await?
            .iter()
            .map(User::from)
            .collect())
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .map(User::from)
            .ok_or_else(|| AppError::UserNotFound(format!("User with id {} not found", id)))
    }
}
