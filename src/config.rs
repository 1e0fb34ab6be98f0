use serde::Serialize;
use std::env;

use crate::error::AppError;

/// Where resource rows are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Only required with `Storage::Postgres`.
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub storage: Storage,
}

impl Config {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = match lookup("STORAGE").as_deref().map(str::to_ascii_lowercase) {
            None => Storage::Postgres,
            Some(s) if s == "postgres" => Storage::Postgres,
            Some(s) if s == "memory" => Storage::Memory,
            Some(other) => {
                return Err(AppError::InternalServerError(format!(
                    "STORAGE must be `postgres` or `memory`, got `{}`",
                    other
                )))
            }
        };

        let database_url = lookup("DATABASE_URL");
        if storage == Storage::Postgres && database_url.is_none() {
            return Err(AppError::InternalServerError(
                "DATABASE_URL must be set".into(),
            ));
        }

        let server_port = match lookup("SERVER_PORT") {
            Some(port) => port.parse().map_err(|_| {
                AppError::InternalServerError("SERVER_PORT must be a number".into())
            })?,
            None => 8080,
        };

        Ok(Self {
            database_url,
            server_port,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            jwt_secret: lookup("JWT_SECRET")
                .ok_or_else(|| AppError::InternalServerError("JWT_SECRET must be set".into()))?,
            storage,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}
