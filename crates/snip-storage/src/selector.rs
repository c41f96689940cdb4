use crate::deadline::{DeadlineStorage, DEFAULT_REQUEST_TIMEOUT};
use crate::memory::MemoryStorage;
use crate::postgres::{PostgresStorage, DEFAULT_DELETE_TIMEOUT, DEFAULT_MAX_CONNECTIONS};
use snip_core::{Result, StorageError, Storager};
use snip_generator::hash::DEFAULT_TOKEN_BYTES;
use snip_generator::HashGenerator;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use typed_builder::TypedBuilder;

/// Settings that decide which engine backs the service and how it behaves.
#[derive(Debug, Clone, TypedBuilder)]
pub struct StorageConfig {
    /// Postgres connection string. Takes precedence over everything else.
    #[builder(default)]
    pub database_dsn: Option<String>,
    /// Recovery log for the memory engine.
    #[builder(default)]
    pub file_storage_path: Option<PathBuf>,
    #[builder(default = DEFAULT_TOKEN_BYTES)]
    pub token_bytes: usize,
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    pub request_timeout: Duration,
    #[builder(default = DEFAULT_DELETE_TIMEOUT)]
    pub delete_timeout: Duration,
    #[builder(default = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,
}

/// The engine a [`StorageConfig`] resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine<'a> {
    Memory,
    RecoveringMemory(&'a Path),
    Postgres(&'a str),
}

impl Display for Engine<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Engine::Memory => write!(f, "in-memory"),
            Engine::RecoveringMemory(_) => write!(f, "in-memory+recovery-log"),
            Engine::Postgres(_) => write!(f, "postgres"),
        }
    }
}

impl StorageConfig {
    /// Picks the engine: Postgres when a DSN is set, otherwise memory,
    /// recovering from a log only when a path is set. Blank values count as unset.
    pub fn engine(&self) -> Engine<'_> {
        if let Some(dsn) = self.database_dsn.as_deref().filter(|d| !d.trim().is_empty()) {
            return Engine::Postgres(dsn);
        }
        match self
            .file_storage_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
        {
            Some(path) => Engine::RecoveringMemory(path),
            None => Engine::Memory,
        }
    }
}

/// Builds the storage described by `config`, wrapped in a [`DeadlineStorage`].
///
/// Called once at startup. Connection or replay failures are returned and
/// are meant to abort the process.
pub async fn open_storage(config: &StorageConfig) -> Result<Arc<dyn Storager>> {
    let generator = HashGenerator::with_bytes(config.token_bytes)
        .map_err(|e| StorageError::InvalidData(e.to_string()))?;
    let engine = config.engine();

    let storage: Arc<dyn Storager> = match engine {
        Engine::Postgres(dsn) => {
            let storage = PostgresStorage::connect(dsn, config.max_connections, generator)
                .await?
                .with_delete_timeout(config.delete_timeout);
            Arc::new(DeadlineStorage::new(storage, config.request_timeout))
        }
        Engine::RecoveringMemory(path) => {
            let storage = MemoryStorage::with_recovery_log(generator, path)?;
            Arc::new(DeadlineStorage::new(storage, config.request_timeout))
        }
        Engine::Memory => Arc::new(DeadlineStorage::new(
            MemoryStorage::new(generator),
            config.request_timeout,
        )),
    };

    info!(
        engine = %engine,
        token_len = generator.token_len(),
        request_timeout = ?config.request_timeout,
        "storage engine selected"
    );
    Ok(storage)
}
