use crate::telemetry::LogFormat;
use clap::Parser;
use serde::Deserialize;
use snip_generator::hash::DEFAULT_TOKEN_BYTES;
use snip_storage::StorageConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const SERVER_ADDRESS_ENV: &str = "SERVER_ADDRESS";
pub const BASE_URL_ENV: &str = "BASE_URL";
pub const FILE_STORAGE_PATH_ENV: &str = "FILE_STORAGE_PATH";
pub const DATABASE_DSN_ENV: &str = "DATABASE_DSN";
pub const CONFIG_ENV: &str = "CONFIG";
pub const REQUEST_TIMEOUT_ENV: &str = "REQUEST_TIMEOUT_SECS";
pub const DELETE_TIMEOUT_ENV: &str = "DELETE_TIMEOUT_SECS";
pub const TOKEN_BYTES_ENV: &str = "TOKEN_BYTES";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_SERVER_ADDRESS: &str = "localhost:8080";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_DELETE_TIMEOUT_SECS: u64 = 60;

const HTTP_SCHEME: &str = "http://";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Parser)]
#[command(name = "snip-gateway", about = "URL shortener HTTP server")]
pub struct Cli {
    /// Address the HTTP server listens on.
    #[arg(short = 'a', long, env = SERVER_ADDRESS_ENV)]
    pub server_address: Option<String>,

    /// Prefix of the short URLs handed out.
    #[arg(short = 'b', long, env = BASE_URL_ENV)]
    pub base_url: Option<String>,

    /// Recovery log of the in-memory engine.
    #[arg(short = 'f', long, env = FILE_STORAGE_PATH_ENV)]
    pub file_storage_path: Option<PathBuf>,

    /// Postgres connection string; selects the Postgres engine.
    #[arg(short = 'd', long, env = DATABASE_DSN_ENV)]
    pub database_dsn: Option<String>,

    /// JSON file supplying values not given as flags or environment.
    #[arg(short = 'c', long, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    #[arg(long, env = REQUEST_TIMEOUT_ENV, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    #[arg(long, env = DELETE_TIMEOUT_ENV, default_value_t = DEFAULT_DELETE_TIMEOUT_SECS)]
    pub delete_timeout_secs: u64,

    #[arg(long, env = TOKEN_BYTES_ENV, default_value_t = DEFAULT_TOKEN_BYTES)]
    pub token_bytes: usize,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Shape of the `-c` config file. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    server_address: Option<String>,
    base_url: Option<String>,
    file_storage_path: Option<PathBuf>,
    database_dsn: Option<String>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fully resolved settings, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    /// Normalized: always has a scheme and no trailing slash.
    pub base_url: String,
    pub storage: StorageConfig,
    pub log_format: LogFormat,
}

impl Config {
    /// Resolves flags and environment, then fills the gaps from the config file.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let file = match cli.config.as_deref() {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let server_address = cli
            .server_address
            .or(file.server_address)
            .unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string());
        let base_url = normalize_base_url(
            cli.base_url.or(file.base_url).as_deref(),
            &server_address,
        );

        let storage = StorageConfig::builder()
            .database_dsn(cli.database_dsn.or(file.database_dsn))
            .file_storage_path(cli.file_storage_path.or(file.file_storage_path))
            .token_bytes(cli.token_bytes)
            .request_timeout(Duration::from_secs(cli.request_timeout_secs))
            .delete_timeout(Duration::from_secs(cli.delete_timeout_secs))
            .build();

        Ok(Self {
            server_address,
            base_url,
            storage,
            log_format: cli.log_format,
        })
    }
}

fn normalize_base_url(base_url: Option<&str>, server_address: &str) -> String {
    let base_url = base_url
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or(server_address)
        .trim_end_matches('/');

    if base_url.contains("://") {
        base_url.to_string()
    } else {
        format!("{HTTP_SCHEME}{base_url}")
    }
}
