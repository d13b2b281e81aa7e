//! Business logic services

pub mod auth;
pub mod catalog;
pub mod clock;
pub mod password;
pub mod rate_limit;
pub mod tokens;
pub mod users;

use std::sync::Arc;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub rate_limiter: rate_limit::RateLimiter,
}

impl Services {
    /// Build every service from the repository. Configuration problems surface here, before serving.
    pub fn new(
        repository: Repository,
        config: &AppConfig,
        clock: Arc<dyn clock::Clock>,
    ) -> AppResult<Self> {
        let hasher = password::PasswordHasher::from_config(&config.auth)?;
        let tokens = tokens::TokenService::from_config(&config.auth, clock.clone())?;

        Ok(Self {
            auth: auth::AuthService::new(repository.users.clone(), tokens, hasher.clone()),
            users: users::UsersService::new(
                repository.users.clone(),
                hasher,
                config.auth.open_admin_registration,
            ),
            catalog: catalog::CatalogService::new(repository.books),
            rate_limiter: rate_limit::RateLimiter::from_config(&config.rate_limit, clock)?,
        })
    }
}
