//! Server configuration read from environment variables.

use std::net::SocketAddr;

use crate::error::AppError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Start-up configuration for the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// PostgreSQL connection string (`DATABASE_URL`, required).
    pub database_url: String,
    /// Interface to bind (`HOST`).
    pub host: String,
    /// Port to bind (`PORT`).
    pub port: u16,
    /// Connection pool size (`DATABASE_MAX_CONNECTIONS`).
    pub max_connections: u32,
    /// Whether to apply pending migrations on start-up (`RUN_MIGRATIONS`).
    pub run_migrations: bool,
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable or `None` when it is unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or any value
    /// fails to parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("DATABASE_URL environment variable must be set".to_string())
            })?;

        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => DEFAULT_PORT,
        };

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(0) => {
                    return Err(AppError::Config(
                        "DATABASE_MAX_CONNECTIONS must be at least 1".to_string(),
                    ));
                }
                Ok(n) => n,
                Err(e) => {
                    return Err(AppError::Config(format!(
                        "DATABASE_MAX_CONNECTIONS must be a positive integer: {e}"
                    )));
                }
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let run_migrations = match lookup("RUN_MIGRATIONS") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                AppError::Config(format!("RUN_MIGRATIONS must be true or false, got {raw:?}"))
            })?,
            None => true,
        };

        Ok(Self {
            database_url,
            host,
            port,
            max_connections,
            run_migrations,
        })
    }

    /// Returns the socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `host` and `port` do not form a valid
    /// socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
