use crate::MAX_TOKEN_ATTEMPTS;
use async_trait::async_trait;
use snip_core::{ensure_input, Record, Result, StorageError, Storager, Token};
use snip_generator::Generator;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgPool, Row};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const DEFAULT_DELETE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

const LIVE_URL_INDEX: &str = "shortener_live_url_idx";

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS shortener (
    token      TEXT PRIMARY KEY,
    url        TEXT NOT NULL,
    owner_id   TEXT NOT NULL,
    is_deleted BOOLEAN NOT NULL DEFAULT FALSE
)
"#;

const CREATE_LIVE_URL_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS shortener_live_url_idx
    ON shortener (url) WHERE NOT is_deleted
"#;

const CREATE_OWNER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS shortener_owner_idx ON shortener (owner_id)
"#;

/// Postgres implementation of the [`Storager`] contract.
///
/// Records live in the `shortener` table. A url is unique among live rows
/// only, so a tombstoned url can be shortened again under a fresh token while
/// the tombstone keeps its own token reserved.
///
/// Deletes are serialized by an application mutex and run under their own
/// timeout, independent of whatever deadline the caller has.
#[derive(Debug)]
pub struct PostgresStorage<G> {
    pool: PgPool,
    generator: G,
    delete_lock: Mutex<()>,
    delete_timeout: Duration,
}

enum InsertOutcome {
    Inserted,
    TokenTaken,
    UrlTaken,
}

impl<G: Generator> PostgresStorage<G> {
    /// Creates a storage from an existing pool. The schema is not touched.
    pub fn new(pool: PgPool, generator: G) -> Self {
        Self {
            pool,
            generator,
            delete_lock: Mutex::new(()),
            delete_timeout: DEFAULT_DELETE_TIMEOUT,
        }
    }

    pub fn with_delete_timeout(mut self, timeout: Duration) -> Self {
        self.delete_timeout = timeout;
        self
    }

    /// Opens a pool, checks the server answers and bootstraps the schema.
    ///
    /// Connection failures are reported as [`StorageError::Unavailable`].
    pub async fn connect(database_url: &str, max_connections: u32, generator: G) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        let storage = Self::new(pool, generator);
        storage.ping().await?;
        storage.bootstrap().await?;
        Ok(storage)
    }

    /// Creates the table and indexes if they do not exist yet.
    pub async fn bootstrap(&self) -> Result<()> {
        for statement in [CREATE_TABLE, CREATE_LIVE_URL_INDEX, CREATE_OWNER_INDEX] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        }
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn live_token_for(&self, url: &str) -> Result<Option<Token>> {
        let token: Option<String> = sqlx::query_scalar(
            r#"
            SELECT token
            FROM shortener
            WHERE url = $1
              AND NOT is_deleted
            LIMIT 1
            "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(token.map(Token::new))
    }

    async fn try_insert(&self, token: &Token, url: &str, owner_id: &str) -> Result<InsertOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"
            INSERT INTO shortener (token, url, owner_id, is_deleted)
            VALUES ($1, $2, $3, FALSE)
            "#,
        )
        .bind(token.as_str())
        .bind(url)
        .bind(owner_id)
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {
                tx.commit().await.map_err(map_sqlx_error)?;
                Ok(InsertOutcome::Inserted)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "failed to roll back insert");
                }
                match unique_violation(&err) {
                    Some(outcome) => Ok(outcome),
                    None => Err(map_sqlx_error(err)),
                }
            }
        }
    }

    async fn tombstone(&self, tokens: &[String], owner_id: &str) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"
            UPDATE shortener
            SET is_deleted = TRUE
            WHERE token = ANY($1)
              AND owner_id = $2
              AND NOT is_deleted
            "#,
        )
        .bind(tokens)
        .bind(owner_id)
        .execute(&mut *tx)
        .await;

        match result {
            Ok(done) => {
                tx.commit().await.map_err(map_sqlx_error)?;
                Ok(done.rows_affected())
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "failed to roll back delete");
                }
                Err(map_sqlx_error(err))
            }
        }
    }
}

/// Classifies a unique violation by the constraint it hit.
fn unique_violation(err: &sqlx::Error) -> Option<InsertOutcome> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }
    if db_err.constraint() == Some(LIVE_URL_INDEX) {
        Some(InsertOutcome::UrlTaken)
    } else {
        Some(InsertOutcome::TokenTaken)
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn count(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| StorageError::InvalidData(format!("negative count {value}")))
}

#[async_trait]
impl<G: Generator> Storager for PostgresStorage<G> {
    async fn insert_url(&self, url: &str, owner_id: &str) -> Result<Token> {
        ensure_input(url, owner_id)?;

        if let Some(existing) = self.live_token_for(url).await? {
            debug!(token = %existing, "url already shortened");
            return Err(StorageError::Conflict(existing));
        }

        for salt in 0..MAX_TOKEN_ATTEMPTS {
            let candidate = self.generator.generate(url, owner_id, salt);
            match self.try_insert(&candidate, url, owner_id).await? {
                InsertOutcome::Inserted => return Ok(candidate),
                InsertOutcome::TokenTaken => {
                    debug!(token = %candidate, salt, "token already taken, regenerating");
                }
                InsertOutcome::UrlTaken => {
                    // a concurrent insert of the same url won the race
                    return match self.live_token_for(url).await? {
                        Some(existing) => Err(StorageError::Conflict(existing)),
                        None => Err(StorageError::Query(format!(
                            "url {url} is reported taken but has no live record"
                        ))),
                    };
                }
            }
        }

        Err(StorageError::TokenExhausted(MAX_TOKEN_ATTEMPTS))
    }

    async fn get_full_url(&self, token: &str) -> Result<String> {
        let row = sqlx::query(
            r#"
            SELECT url, is_deleted
            FROM shortener
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Err(StorageError::NotFound(token.to_owned()));
        };

        let url: String = row.try_get("url").map_err(map_sqlx_error)?;
        let deleted: bool = row.try_get("is_deleted").map_err(map_sqlx_error)?;

        if deleted {
            return Err(StorageError::Deleted(Token::new(token)));
        }
        Ok(url)
    }

    async fn get_short_url(&self, url: &str) -> Result<Token> {
        self.live_token_for(url)
            .await?
            .ok_or_else(|| StorageError::NotFound(url.to_owned()))
    }

    async fn get_all_user_urls(&self, owner_id: &str) -> Result<Vec<Record>> {
        let rows = sqlx::query(
            r#"
            SELECT token, url
            FROM shortener
            WHERE owner_id = $1
              AND NOT is_deleted
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                let token: String = row.try_get("token").map_err(map_sqlx_error)?;
                let url: String = row.try_get("url").map_err(map_sqlx_error)?;
                Ok(Record::new(Token::new(token), url, owner_id))
            })
            .collect()
    }

    async fn delete(&self, tokens: &[String], owner_id: &str) -> Result<u64> {
        if tokens.is_empty() {
            return Ok(0);
        }

        let _guard = self.delete_lock.lock().await;
        let deleted = tokio::time::timeout(self.delete_timeout, self.tombstone(tokens, owner_id))
            .await
            .map_err(|_| {
                StorageError::Timeout(format!(
                    "delete did not finish within {:?}",
                    self.delete_timeout
                ))
            })??;

        debug!(owner_id, requested = tokens.len(), deleted, "tombstoned records");
        Ok(deleted)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        conn.ping()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }

    async fn count_urls(&self) -> Result<u64> {
        let value: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shortener WHERE NOT is_deleted")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        count(value)
    }

    async fn count_users(&self) -> Result<u64> {
        let value: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT owner_id) FROM shortener")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        count(value)
    }
}
