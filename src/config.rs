//! Process configuration
//!
//! Built once at startup from environment variables (optionally seeded from a
//! `.env` file) and handed to the data fetcher and the listener.

use std::time::Duration;

use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;

/// Configuration errors reported at startup
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is not a valid {expected}: '{value}'")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// How the fetcher obtains connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStrategy {
    /// Open a fresh connection for every request and close it before responding
    PerRequest,
    /// Share a bounded pool across requests
    Pooled { max_connections: u32 },
}

/// Database connection parameters
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    /// Schema searched for `service_details`, via `search_path`
    pub schema: Option<String>,
    pub connect_timeout: Duration,
    pub strategy: ConnectionStrategy,
}

impl DatabaseConfig {
    /// Postgres connect options for these parameters
    pub fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .application_name("service-data-api");

        let options = match &self.password {
            Some(password) => options.password(password),
            None => options,
        };

        match &self.schema {
            Some(schema) => options.options([("search_path", schema.as_str())]),
            None => options,
        }
    }

    /// Connection target with the password left out, for logs
    pub fn display_target(&self) -> String {
        format!(
            "postgresql://{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

/// Listener configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Complete process configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let strategy = match parse_opt::<u32>(&get, "DB_POOL_SIZE", "connection count")? {
            Some(0) => {
                return Err(ConfigError::Invalid {
                    var: "DB_POOL_SIZE",
                    value: "0".to_string(),
                    expected: "connection count",
                })
            }
            Some(max_connections) => ConnectionStrategy::Pooled { max_connections },
            None => ConnectionStrategy::PerRequest,
        };

        let database = DatabaseConfig {
            host: require("DB_HOST")?,
            port: parse_opt(&get, "DB_PORT", "port number")?.unwrap_or(DEFAULT_DB_PORT),
            database: require("DB_NAME")?,
            user: require("DB_USER")?,
            password: get("DB_PASSWORD"),
            schema: get("DB_SCHEMA"),
            connect_timeout: Duration::from_secs(
                parse_opt(&get, "DB_CONNECT_TIMEOUT_SECS", "number of seconds")?
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            strategy,
        };

        let server = ServerConfig {
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_opt(&get, "PORT", "port number")?.unwrap_or(DEFAULT_PORT),
        };

        Ok(Self { database, server })
    }
}

fn parse_opt<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    match get(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                var,
                value: raw,
                expected,
            }),
    }
}
