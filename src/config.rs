//! Configuration management for Biblio server

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret. No fallback: startup fails when empty.
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    /// Argon2 memory cost in KiB
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
    pub hash_parallelism: u32,
    /// Whether anonymous registration may ask for the admin role.
    /// When false, only an authenticated admin can create admin accounts.
    pub open_admin_registration: bool,
}

/// How callers are grouped into rate-limit windows
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitKeyMode {
    /// One window per API key
    #[default]
    PerKey,
    /// A single window shared by every caller
    Shared,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_seconds: u64,
    pub key_mode: RateLimitKeyMode,
    /// Accepted values of the `api-key` request header
    pub api_keys: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(environment());

        Self::from_builder(builder, env::var("JWT_SECRET_KEY").ok())
    }

    /// Finish a source stack: apply the secret override, deserialize and validate
    fn from_builder(
        builder: ConfigBuilder<DefaultState>,
        jwt_secret_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        let config: AppConfig = builder
            .set_override_option("auth.jwt_secret", jwt_secret_key)?
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server must not start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "auth.jwt_secret is not set (use JWT_SECRET_KEY or BIBLIO_AUTH__JWT_SECRET)"
                    .to_string(),
            ));
        }
        if self.auth.token_ttl_minutes <= 0 {
            return Err(ConfigError::Message(
                "auth.token_ttl_minutes must be positive".to_string(),
            ));
        }
        if self.rate_limit.api_keys.iter().all(|k| k.trim().is_empty()) {
            return Err(ConfigError::Message(
                "rate_limit.api_keys must contain at least one key".to_string(),
            ));
        }
        if self.rate_limit.max_requests == 0 || self.rate_limit.window_seconds == 0 {
            return Err(ConfigError::Message(
                "rate_limit.max_requests and rate_limit.window_seconds must be positive"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// BIBLIO_AUTH__JWT_SECRET, BIBLIO_RATE_LIMIT__API_KEYS=a,b ...
fn environment() -> Environment {
    Environment::with_prefix("BIBLIO")
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("rate_limit.api_keys")
        .try_parsing(true)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_minutes: crate::services::tokens::DEFAULT_TOKEN_TTL_MINUTES,
            hash_memory_kib: argon2::Params::DEFAULT_M_COST,
            hash_iterations: argon2::Params::DEFAULT_T_COST,
            hash_parallelism: argon2::Params::DEFAULT_P_COST,
            open_admin_registration: true,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_seconds: 60,
            key_mode: RateLimitKeyMode::PerKey,
            api_keys: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
