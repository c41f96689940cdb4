use crate::recovery::{LogEntry, RecoveryLog};
use crate::MAX_TOKEN_ATTEMPTS;
use async_trait::async_trait;
use parking_lot::Mutex;
use snip_core::{ensure_input, Record, Result, StorageError, Storager, Token};
use snip_generator::Generator;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, trace};

/// Records keyed by token, plus an index of live records by url.
#[derive(Debug, Default)]
struct Table {
    by_token: HashMap<String, Record>,
    live_by_url: HashMap<String, Token>,
}

impl Table {
    /// Inserts or replaces the record stored under its token.
    fn apply(&mut self, record: Record) {
        if record.deleted {
            let indexed = self
                .live_by_url
                .get(&record.original_url)
                .is_some_and(|token| *token == record.token);
            if indexed {
                self.live_by_url.remove(&record.original_url);
            }
        } else {
            self.live_by_url
                .insert(record.original_url.clone(), record.token.clone());
        }
        self.by_token
            .insert(record.token.as_str().to_owned(), record);
    }

    /// First candidate token for `(url, owner_id)` that no record occupies.
    fn free_token<G: Generator>(&self, generator: &G, url: &str, owner_id: &str) -> Result<Token> {
        for salt in 0..MAX_TOKEN_ATTEMPTS {
            let candidate = generator.generate(url, owner_id, salt);
            match self.by_token.get(candidate.as_str()) {
                None => return Ok(candidate),
                Some(taken) => debug!(
                    token = %candidate,
                    salt,
                    tombstone = taken.deleted,
                    "token already taken, regenerating"
                ),
            }
        }
        Err(StorageError::TokenExhausted(MAX_TOKEN_ATTEMPTS))
    }
}

/// In-memory implementation of the [`Storager`] contract.
///
/// Every operation takes the one table lock for its whole duration. When a
/// [`RecoveryLog`] is attached, each mutation is appended to it while the
/// lock is held and before the table changes, so a failed append fails the
/// operation and leaves the table untouched.
///
/// Appends are blocking file writes made on the calling task, and every
/// other operation waits for them on the table lock.
#[derive(Debug)]
pub struct MemoryStorage<G> {
    table: Mutex<Table>,
    generator: G,
    recovery: Option<RecoveryLog>,
}

impl<G: Generator> MemoryStorage<G> {
    /// Creates an empty, purely in-memory engine.
    pub fn new(generator: G) -> Self {
        Self {
            table: Mutex::new(Table::default()),
            generator,
            recovery: None,
        }
    }

    /// Creates an engine backed by the recovery log at `path`.
    ///
    /// The whole log is replayed before this returns; replay failures other
    /// than a torn final line are returned as errors.
    pub fn with_recovery_log(generator: G, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (log, entries) = RecoveryLog::open(path)?;

        let mut table = Table::default();
        let replayed = entries.len();
        for entry in entries {
            table.apply(Record::from(entry));
        }

        info!(
            path = %path.display(),
            entries = replayed,
            records = table.by_token.len(),
            "restored storage from recovery log"
        );

        Ok(Self {
            table: Mutex::new(table),
            generator,
            recovery: Some(log),
        })
    }

    /// Number of stored records, tombstones included.
    pub fn len(&self) -> usize {
        self.table.lock().by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, record: &Record) -> Result<()> {
        match &self.recovery {
            Some(log) => log.append(&LogEntry::from(record)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<G: Generator> Storager for MemoryStorage<G> {
    async fn insert_url(&self, url: &str, owner_id: &str) -> Result<Token> {
        ensure_input(url, owner_id)?;

        let mut table = self.table.lock();
        if let Some(existing) = table.live_by_url.get(url) {
            debug!(token = %existing, "url already shortened");
            return Err(StorageError::Conflict(existing.clone()));
        }

        let token = table.free_token(&self.generator, url, owner_id)?;
        let record = Record::new(token.clone(), url, owner_id);
        self.persist(&record)?;
        table.apply(record);

        trace!(token = %token, owner_id, "stored url");
        Ok(token)
    }

    async fn get_full_url(&self, token: &str) -> Result<String> {
        let table = self.table.lock();
        match table.by_token.get(token) {
            None => Err(StorageError::NotFound(token.to_owned())),
            Some(record) if record.deleted => Err(StorageError::Deleted(record.token.clone())),
            Some(record) => Ok(record.original_url.clone()),
        }
    }

    async fn get_short_url(&self, url: &str) -> Result<Token> {
        let table = self.table.lock();
        table
            .live_by_url
            .get(url)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(url.to_owned()))
    }

    async fn get_all_user_urls(&self, owner_id: &str) -> Result<Vec<Record>> {
        let table = self.table.lock();
        Ok(table
            .by_token
            .values()
            .filter(|record| record.is_live() && record.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, tokens: &[String], owner_id: &str) -> Result<u64> {
        let mut table = self.table.lock();
        let mut deleted = 0;

        for token in tokens {
            let Some(record) = table.by_token.get(token.as_str()) else {
                trace!(token = %token, "skipping unknown token");
                continue;
            };
            if record.deleted || record.owner_id != owner_id {
                trace!(token = %token, owner_id, "skipping token not deletable by owner");
                continue;
            }

            let tombstone = Record {
                deleted: true,
                ..record.clone()
            };
            self.persist(&tombstone)?;
            table.apply(tombstone);
            deleted += 1;
        }

        debug!(owner_id, requested = tokens.len(), deleted, "tombstoned records");
        Ok(deleted)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn count_urls(&self) -> Result<u64> {
        let table = self.table.lock();
        Ok(table.live_by_url.len() as u64)
    }

    async fn count_users(&self) -> Result<u64> {
        let table = self.table.lock();
        let owners: HashSet<&str> = table
            .by_token
            .values()
            .map(|record| record.owner_id.as_str())
            .collect();
        Ok(owners.len() as u64)
    }
}
