use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::{env, fmt, str::FromStr};

const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

/// Where tasks and accounts are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// How to reach Postgres.
///
/// A full `DATABASE_URL` is what hosted providers hand out and always needs TLS;
/// the individual `DB_*` variables describe a local server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    Url(String),
    Parts {
        host: String,
        port: u16,
        name: String,
        username: String,
        password: String,
    },
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        match self {
            DatabaseConfig::Url(url) => PgConnectOptions::from_str(url)
                .map(|opts| opts.ssl_mode(PgSslMode::Require))
                .map_err(|e| ConfigError::Invalid("DATABASE_URL", e.to_string())),
            DatabaseConfig::Parts {
                host,
                port,
                name,
                username,
                password,
            } => Ok(PgConnectOptions::new()
                .host(host)
                .port(*port)
                .database(name)
                .username(username)
                .password(password)
                .ssl_mode(PgSslMode::Prefer)),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid(key, reason) => write!(f, "{} is invalid: {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: Option<DatabaseConfig>,
    pub storage: StorageBackend,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub session_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = match lookup("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig::Url(url)),
            None => match lookup("DB_HOST") {
                Some(host) => Some(DatabaseConfig::Parts {
                    host,
                    port: parse_or(&lookup, "DB_PORT", 5432)?,
                    name: lookup("DB_NAME").ok_or(ConfigError::Missing("DB_NAME"))?,
                    username: lookup("DB_USERNAME").ok_or(ConfigError::Missing("DB_USERNAME"))?,
                    password: lookup("DB_PASSWORD").unwrap_or_default(),
                }),
                None => None,
            },
        };

        let storage = match lookup("STORAGE").as_deref() {
            Some("postgres") => StorageBackend::Postgres,
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid(
                    "STORAGE",
                    format!("expected `postgres` or `memory`, got `{}`", other),
                ))
            }
            None if database.is_some() => StorageBackend::Postgres,
            None => StorageBackend::Memory,
        };
        if storage == StorageBackend::Postgres && database.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let session_ttl_days = parse_or(&lookup, "SESSION_TTL_DAYS", DEFAULT_SESSION_TTL_DAYS)?;
        if session_ttl_days <= 0 {
            return Err(ConfigError::Invalid(
                "SESSION_TTL_DAYS",
                "must be positive".into(),
            ));
        }

        Ok(Self {
            database,
            storage,
            server_port: parse_or(&lookup, "SERVER_PORT", 8080)?,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            jwt_secret: lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            session_ttl_days,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid(key, e.to_string())),
        None => Ok(default),
    }
}
