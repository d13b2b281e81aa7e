//! Biblio library catalog server
//!
//! A REST JSON API for a library catalog and its users, with bearer-token
//! authentication, role-based authorization and per-caller rate limiting.

use std::{collections::HashSet, sync::Arc};

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

use repository::Repository;
use services::{clock::Clock, Services};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<Services>,
    /// Accepted `api-key` header values
    pub api_keys: Arc<HashSet<String>>,
}

impl AppState {
    /// Wire repository, services and configuration together
    pub fn new(config: AppConfig, repository: Repository, clock: Arc<dyn Clock>) -> AppResult<Self> {
        let api_keys: HashSet<String> = config
            .rate_limit
            .api_keys
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if api_keys.is_empty() {
            return Err(AppError::Misconfigured("No API keys configured".to_string()));
        }

        let services = Services::new(repository, &config, clock)?;

        Ok(Self {
            config: Arc::new(config),
            services: Arc::new(services),
            api_keys: Arc::new(api_keys),
        })
    }
}
