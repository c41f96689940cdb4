//! Storage engines behind the [`Storager`](snip_core::Storager) contract.
//!
//! - [`MemoryStorage`]: a single-lock map, optionally mirrored to a
//!   [`RecoveryLog`] that is replayed on startup.
//! - [`PostgresStorage`]: one `shortener` table.
//! - [`DeadlineStorage`]: decorator bounding every call but `delete`.
//! - [`DeleteWorker`]: background task that runs detached deletes.
//!
//! [`open_storage`] picks the engine from a [`StorageConfig`].

pub mod deadline;
pub mod memory;
pub mod postgres;
pub mod recovery;
pub mod selector;
pub mod worker;

pub use deadline::DeadlineStorage;
pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;
pub use recovery::{LogEntry, RecoveryLog};
pub use selector::{open_storage, Engine, StorageConfig};
pub use snip_core::{Record, Result, StorageError, Storager, Token};
pub use worker::{DeleteQueue, DeleteTask, DeleteWorker};

/// How many salted candidates an engine tries before giving up on an insert.
pub const MAX_TOKEN_ATTEMPTS: u32 = 16;
