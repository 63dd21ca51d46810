//! Configuration loading for the leadbook API.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `LEADBOOK_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENV_PREFIX: &str = "LEADBOOK_";

/// Minimum accepted JWT secret length in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Application configuration derived from `LEADBOOK_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: i64,
    #[serde(default)]
    pub seed_demo_user: bool,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Sliding-window limits applied per client address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RateLimitConfig {
    /// Mutating requests allowed per window (default: 10)
    ///
    /// Environment variable: `LEADBOOK_RATE_LIMIT_WRITE_PER_MINUTE`
    #[serde(default = "default_rate_limit_write_per_minute")]
    pub write_per_minute: u32,

    /// Listing requests allowed per window (default: 30)
    ///
    /// Environment variable: `LEADBOOK_RATE_LIMIT_READ_PER_MINUTE`
    #[serde(default = "default_rate_limit_read_per_minute")]
    pub read_per_minute: u32,

    /// Window length in seconds (default: 60)
    ///
    /// Environment variable: `LEADBOOK_RATE_LIMIT_WINDOW_SECONDS`
    #[serde(default = "default_rate_limit_window_seconds")]
    pub window_seconds: u64,

    /// Upper bound on client addresses tracked in memory (default: 10000)
    ///
    /// Environment variable: `LEADBOOK_RATE_LIMIT_MAX_TRACKED_KEYS`
    #[serde(default = "default_rate_limit_max_tracked_keys")]
    pub max_tracked_keys: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            write_per_minute: default_rate_limit_write_per_minute(),
            read_per_minute: default_rate_limit_read_per_minute(),
            window_seconds: default_rate_limit_window_seconds(),
            max_tracked_keys: default_rate_limit_max_tracked_keys(),
        }
    }
}

impl RateLimitConfig {
    /// Validate rate limit bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.write_per_minute == 0 {
            return Err(ConfigError::InvalidRateLimit {
                field: "write_per_minute",
                value: 0,
            });
        }
        if self.read_per_minute == 0 {
            return Err(ConfigError::InvalidRateLimit {
                field: "read_per_minute",
                value: 0,
            });
        }
        if self.window_seconds == 0 {
            return Err(ConfigError::InvalidRateLimit {
                field: "window_seconds",
                value: 0,
            });
        }
        if self.max_tracked_keys == 0 {
            return Err(ConfigError::InvalidRateLimit {
                field: "max_tracked_keys",
                value: 0,
            });
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            jwt_secret: None,
            session_ttl_minutes: default_session_ttl_minutes(),
            seed_demo_user: false,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Local and test profiles relax secret requirements.
    pub fn is_development(&self) -> bool {
        matches!(self.profile.as_str(), "local" | "test")
    }

    /// Secret used to sign session tokens.
    ///
    /// Development profiles fall back to a fixed key so the service can start
    /// without any configuration.
    pub fn signing_secret(&self) -> Result<&str, ConfigError> {
        match self.jwt_secret.as_deref() {
            Some(secret) => Ok(secret),
            None if self.is_development() => Ok(DEVELOPMENT_JWT_SECRET),
            None => Err(ConfigError::MissingJwtSecret),
        }
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.jwt_secret.is_some() {
            config.jwt_secret = Some("[REDACTED]".to_string());
        }
        if let Some(at) = config.database_url.find('@')
            && let Some(scheme_end) = config.database_url.find("://")
            && scheme_end < at
        {
            config.database_url = format!(
                "{}[REDACTED]{}",
                &config.database_url[..scheme_end + 3],
                &config.database_url[at..]
            );
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.jwt_secret.as_deref() {
            Some(secret) if secret.len() < MIN_JWT_SECRET_LEN => {
                return Err(ConfigError::JwtSecretTooShort {
                    length: secret.len(),
                });
            }
            None if !self.is_development() => return Err(ConfigError::MissingJwtSecret),
            _ => {}
        }

        if !(5..=43_200).contains(&self.session_ttl_minutes) {
            return Err(ConfigError::InvalidSessionTtl {
                value: self.session_ttl_minutes,
            });
        }

        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidDbMaxConnections);
        }

        self.rate_limit.validate()?;

        Ok(())
    }
}

const DEVELOPMENT_JWT_SECRET: &str = "leadbook-development-signing-secret-0001";

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite://leadbook.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_session_ttl_minutes() -> i64 {
    720
}

fn default_rate_limit_write_per_minute() -> u32 {
    10
}

fn default_rate_limit_read_per_minute() -> u32 {
    30
}

fn default_rate_limit_window_seconds() -> u64 {
    60
}

fn default_rate_limit_max_tracked_keys() -> usize {
    10_000
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
    #[error("JWT secret is missing; set LEADBOOK_JWT_SECRET")]
    MissingJwtSecret,
    #[error("JWT secret must be at least 32 bytes, got {length} bytes")]
    JwtSecretTooShort { length: usize },
    #[error("session TTL must be between 5 and 43200 minutes, got {value}")]
    InvalidSessionTtl { value: i64 },
    #[error("database max connections must be positive")]
    InvalidDbMaxConnections,
    #[error("rate limit {field} must be positive, got {value}")]
    InvalidRateLimit { field: &'static str, value: u64 },
}

/// Loads configuration using layered `.env` files and `LEADBOOK_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads and validates configuration.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = take_string(&mut layered, "PROFILE").unwrap_or(profile_hint);
        let api_bind_addr =
            take_string(&mut layered, "API_BIND_ADDR").unwrap_or_else(default_api_bind_addr);
        let log_level = take_string(&mut layered, "LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format =
            take_string(&mut layered, "LOG_FORMAT").unwrap_or_else(default_log_format);
        let database_url =
            take_string(&mut layered, "DATABASE_URL").unwrap_or_else(default_database_url);
        let db_max_connections = take_parsed(&mut layered, "DB_MAX_CONNECTIONS")?
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = take_parsed(&mut layered, "DB_ACQUIRE_TIMEOUT_MS")?
            .unwrap_or_else(default_db_acquire_timeout_ms);
        let jwt_secret = take_string(&mut layered, "JWT_SECRET")
            .map(|secret| secret.trim().to_string())
            .filter(|secret| !secret.is_empty());
        let session_ttl_minutes = take_parsed(&mut layered, "SESSION_TTL_MINUTES")?
            .unwrap_or_else(default_session_ttl_minutes);
        let seed_demo_user = take_parsed(&mut layered, "SEED_DEMO_USER")?.unwrap_or(false);

        let rate_limit = RateLimitConfig {
            write_per_minute: take_parsed(&mut layered, "RATE_LIMIT_WRITE_PER_MINUTE")?
                .unwrap_or_else(default_rate_limit_write_per_minute),
            read_per_minute: take_parsed(&mut layered, "RATE_LIMIT_READ_PER_MINUTE")?
                .unwrap_or_else(default_rate_limit_read_per_minute),
            window_seconds: take_parsed(&mut layered, "RATE_LIMIT_WINDOW_SECONDS")?
                .unwrap_or_else(default_rate_limit_window_seconds),
            max_tracked_keys: take_parsed(&mut layered, "RATE_LIMIT_MAX_TRACKED_KEYS")?
                .unwrap_or_else(default_rate_limit_max_tracked_keys),
        };

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            jwt_secret,
            session_ttl_minutes,
            seed_demo_user,
            rate_limit,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn take_string(layered: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    layered.remove(key).filter(|v| !v.is_empty())
}

fn take_parsed<T: std::str::FromStr>(
    layered: &mut BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match take_string(layered, key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}{key}"),
                value: raw,
            }),
        None => Ok(None),
    }
}
