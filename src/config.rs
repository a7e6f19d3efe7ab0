use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Environment variable carrying the shared token-signing secret.
///
/// Both services must be started with the same value or tokens issued by the
/// auth service will not verify in the order service.
pub const TOKEN_SECRET_ENV: &str = "MENSA_TOKEN_SECRET";

/// Environment override for the auth service base URL used by the order
/// service's remote identity lookup.
pub const AUTH_BASE_URL_ENV: &str = "MENSA_AUTH_BASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Fatal startup condition: no request is ever served without a secret.
    #[error("token signing secret is not configured (set {TOKEN_SECRET_ENV})")]
    MissingSecret,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub auth: AuthServiceConfig,

    pub orders: OrderServiceConfig,

    pub lifecycle: LifecycleConfig,

    pub security: SecurityConfig,

    pub server: ServerConfig,

    /// Shared signing secret, supplied out of band via the process
    /// environment. Never written to or read from the config file.
    #[serde(skip)]
    pub token_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthServiceConfig {
    pub database_path: String,

    pub port: u16,

    /// Token lifetime in minutes. Tokens die implicitly at expiry; there is
    /// no server-side session store and no revocation before expiry.
    pub token_ttl_minutes: u32,
}

impl Default for AuthServiceConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/mensa-auth.db".to_string(),
            port: 8000,
            token_ttl_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderServiceConfig {
    pub database_path: String,

    pub port: u16,

    /// Base URL of the auth service, used for remote identity resolution.
    /// The order service keeps no user rows of its own.
    pub auth_base_url: String,

    /// Timeout for user-lookup calls to the auth service. A stuck auth
    /// service must not block order-service request tasks indefinitely.
    pub request_timeout_seconds: u64,
}

impl Default for OrderServiceConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/mensa-orders.db".to_string(),
            port: 8001,
            auth_base_url: "http://localhost:8000".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

/// Timing of the background order-status sweep. The original rollout used
/// fixed 3-5s and 30s delays with no documented rationale, so the driver
/// treats them as configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub enabled: bool,

    /// Lower bound of the randomized preparation delay, in seconds.
    pub prep_delay_min_seconds: u64,

    /// Upper bound of the randomized preparation delay, in seconds.
    pub prep_delay_max_seconds: u64,

    /// Pause between full sweep cycles, in seconds.
    pub cycle_interval_seconds: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prep_delay_min_seconds: 3,
            prep_delay_max_seconds: 5,
            cycle_interval_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            auth: AuthServiceConfig::default(),
            orders: OrderServiceConfig::default(),
            lifecycle: LifecycleConfig::default(),
            security: SecurityConfig::default(),
            server: ServerConfig::default(),
            token_secret: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = Self::default_config_path();
        let mut config = if path.exists() {
            info!("Loading config from: {}", path.display());
            Self::load_from_path(&path)?
        } else {
            info!("No config file found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var(TOKEN_SECRET_ENV)
            && !secret.is_empty()
        {
            self.token_secret = Some(secret);
        }

        if let Ok(url) = std::env::var(AUTH_BASE_URL_ENV)
            && !url.is_empty()
        {
            self.orders.auth_base_url = url;
        }
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.token_ttl_minutes == 0 {
            anyhow::bail!("Token TTL must be > 0 minutes");
        }

        if self.lifecycle.prep_delay_min_seconds > self.lifecycle.prep_delay_max_seconds {
            anyhow::bail!("Lifecycle prep delay min must be <= max");
        }

        if self.lifecycle.enabled && self.lifecycle.cycle_interval_seconds == 0 {
            anyhow::bail!("Lifecycle cycle interval must be > 0 when enabled");
        }

        Ok(())
    }

    /// The configured signing secret, or the fatal startup error.
    pub fn require_token_secret(&self) -> Result<&str, ConfigError> {
        self.token_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecret)
    }
}
