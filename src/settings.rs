//! Process settings read from the environment.

use crate::error::AppError;
use crate::sql::BackendKind;
use std::net::SocketAddr;

pub const DEFAULT_DESCRIPTOR_PATH: &str = "descriptor.json";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
/// Largest request body accepted by the connector routes.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub backend: BackendKind,
    pub descriptor_path: String,
    pub listen_addr: SocketAddr,
    pub max_connections: u32,
}

impl Settings {
    /// `DATABASE_URL` is required; everything else has a default.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Unsupported("DATABASE_URL is not set".into()))?;
        let backend: BackendKind = lookup("CONNECTOR_BACKEND")
            .unwrap_or_else(|| BackendKind::Sqlite.as_str().to_string())
            .parse::<BackendKind>()?;
        let descriptor_path = lookup("DESCRIPTOR_PATH").unwrap_or_else(|| DEFAULT_DESCRIPTOR_PATH.to_string());
        let listen_addr: SocketAddr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Unsupported(format!("LISTEN_ADDR: {}", e)))?;
        let max_connections = match lookup("MAX_CONNECTIONS") {
            Some(v) => v
                .parse::<u32>()
                .map_err(|e| AppError::Unsupported(format!("MAX_CONNECTIONS: {}", e)))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        Ok(Settings {
            database_url,
            backend,
            descriptor_path,
            listen_addr,
            max_connections,
        })
    }
}
