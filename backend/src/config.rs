//! Process configuration, read from the environment.
//!
//! | Variable            | Meaning                                   | Default      |
//! |---------------------|-------------------------------------------|--------------|
//! | `HBNB_TYPE_STORAGE` | `db` for the database store, else file    | file         |
//! | `HBNB_FILE_PATH`    | JSON file used by the file store          | `file.json`  |
//! | `HBNB_DB_URL`       | sqlx SQLite URL                           | from path    |
//! | `HBNB_DB_PATH`      | SQLite file used when no URL is given     | `hbnb.db`    |
//! | `HBNB_ENV`          | `test` drops all tables on connect        | unset        |
//! | `HBNB_API_HOST`     | bind address                              | `0.0.0.0`    |
//! | `HBNB_API_PORT`     | bind port                                 | `5000`       |

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::storage::file::DEFAULT_FILE_PATH;

const DEFAULT_DB_PATH: &str = "hbnb.db";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;

/// Which object store backs the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    File,
    Db,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    /// Drop every managed table on connect (test environment only)
    pub reset_on_connect: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub file_path: PathBuf,
    pub database: DatabaseConfig,
}

impl StorageConfig {
    /// File store at `file_path`
    pub fn file<P: Into<PathBuf>>(file_path: P) -> Self {
        Self {
            backend: StorageBackend::File,
            file_path: file_path.into(),
            database: DatabaseConfig {
                url: format!("sqlite:{}", DEFAULT_DB_PATH),
                reset_on_connect: false,
            },
        }
    }

    /// Database store at `url`
    pub fn database(url: impl Into<String>, reset_on_connect: bool) -> Self {
        Self {
            backend: StorageBackend::Db,
            file_path: PathBuf::from(DEFAULT_FILE_PATH),
            database: DatabaseConfig {
                url: url.into(),
                reset_on_connect,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build configuration from any variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let backend = match var("HBNB_TYPE_STORAGE").as_deref() {
            Some("db") => StorageBackend::Db,
            _ => StorageBackend::File,
        };
        let file_path = var("HBNB_FILE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_PATH));
        let url = var("HBNB_DB_URL").unwrap_or_else(|| {
            let path = var("HBNB_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
            format!("sqlite:{}", path)
        });
        let reset_on_connect = var("HBNB_ENV").as_deref() == Some("test");

        let host = var("HBNB_API_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match var("HBNB_API_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("HBNB_API_PORT is not a valid port: {}", raw))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            storage: StorageConfig {
                backend,
                file_path,
                database: DatabaseConfig {
                    url,
                    reset_on_connect,
                },
            },
            server: ServerConfig { host, port },
        })
    }
}
