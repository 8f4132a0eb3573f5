// crates/donorflow-core/src/config.rs

use std::env;
use std::net::SocketAddr;

use thiserror::Error;

use crate::upload::DEFAULT_MAX_UPLOAD_BYTES;

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("DATABASE_URL (or DONORFLOW_DATABASE_URL) must be set")]
    MissingDatabaseUrl,

    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub bind: SocketAddr,
    pub max_upload_bytes: usize,
    pub db_max_connections: u32,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .or_else(|| lookup("DONORFLOW_DATABASE_URL"))
            .filter(|url| !url.trim().is_empty());

        Ok(Self {
            database_url,
            bind: parse_var(&lookup, "DONORFLOW_BIND", DEFAULT_BIND.parse().ok())?,
            max_upload_bytes: parse_var(
                &lookup,
                "DONORFLOW_MAX_UPLOAD_BYTES",
                Some(DEFAULT_MAX_UPLOAD_BYTES),
            )?,
            db_max_connections: parse_var(
                &lookup,
                "DONORFLOW_DB_MAX_CONNECTIONS",
                Some(DEFAULT_DB_MAX_CONNECTIONS),
            )?,
        })
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::MissingDatabaseUrl)
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
            name,
            reason: err.to_string(),
            value,
        }),
        None => default.ok_or_else(|| ConfigError::Invalid {
            name,
            value: String::new(),
            reason: "no default available".to_string(),
        }),
    }
}
