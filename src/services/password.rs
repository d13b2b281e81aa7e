//! Password hashing (Argon2id, PHC strings)

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use once_cell::sync::OnceCell;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
};

/// Input for the stand-in hash used when no account matches
const DUMMY_PASSWORD: &str = "no-such-account";

#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    /// Hash with this hasher's cost, built on first use
    dummy_hash: Arc<OnceCell<String>>,
}

impl PasswordHasher {
    pub fn new(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn from_config(config: &AuthConfig) -> AppResult<Self> {
        let params = Params::new(
            config.hash_memory_kib,
            config.hash_iterations,
            config.hash_parallelism,
            None,
        )
        .map_err(|e| AppError::Misconfigured(format!("Invalid password hashing parameters: {}", e)))?;
        Ok(Self::new(params))
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Check a password against a stored hash. Cost parameters come from the hash itself.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!("Stored password hash is malformed: {}", e);
                return false;
            }
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// `hash` on the blocking pool
    pub async fn hash_blocking(&self, password: String) -> AppResult<String> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
    }

    /// `verify` on the blocking pool
    pub async fn verify_blocking(&self, password: String, hash: String) -> AppResult<bool> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))
    }

    /// Spend one verification's worth of work for a caller with no stored hash,
    /// so unknown accounts cost the same as wrong passwords
    pub async fn verify_unknown_blocking(&self, password: String) -> AppResult<()> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || -> AppResult<()> {
            let dummy = hasher
                .dummy_hash
                .get_or_try_init(|| hasher.hash(DUMMY_PASSWORD))?;
            hasher.verify(&password, dummy);
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))?
    }

    #[cfg(test)]
    pub(crate) fn has_dummy_hash(&self) -> bool {
        self.dummy_hash.get().is_some()
    }
}
