use crate::error::{Result, StorageError};
use crate::record::Record;
use crate::token::Token;
use async_trait::async_trait;

/// Outcome of one url in a batch insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub token: Token,
    /// `true` when the url was already shortened and `token` is the existing one.
    pub existing: bool,
}

/// The storage contract every engine implements.
///
/// Engines are interchangeable: the transport only ever sees an
/// `Arc<dyn Storager>` chosen once at startup.
#[async_trait]
pub trait Storager: Send + Sync + 'static {
    /// Shortens `url` on behalf of `owner_id`.
    ///
    /// Returns the new token, or `Err(StorageError::Conflict(token))` carrying
    /// the existing token when the url is already shortened and live.
    /// Fails with [`StorageError::EmptyInput`] when either argument is blank.
    async fn insert_url(&self, url: &str, owner_id: &str) -> Result<Token>;

    /// Shortens every url in order. Conflicts are reported per item rather
    /// than failing the batch; the first hard error aborts it.
    async fn insert_urls(&self, urls: &[String], owner_id: &str) -> Result<Vec<BatchItem>> {
        let mut items = Vec::with_capacity(urls.len());
        for url in urls {
            let item = match self.insert_url(url, owner_id).await {
                Ok(token) => BatchItem {
                    token,
                    existing: false,
                },
                Err(StorageError::Conflict(token)) => BatchItem {
                    token,
                    existing: true,
                },
                Err(err) => return Err(err),
            };
            items.push(item);
        }
        Ok(items)
    }

    /// Resolves a token to its original url.
    ///
    /// Fails with [`StorageError::NotFound`] for unknown tokens and
    /// [`StorageError::Deleted`] for tombstones.
    async fn get_full_url(&self, token: &str) -> Result<String>;

    /// Reverse lookup of a live record by url.
    async fn get_short_url(&self, url: &str) -> Result<Token>;

    /// Every live record owned by `owner_id`, in no particular order.
    async fn get_all_user_urls(&self, owner_id: &str) -> Result<Vec<Record>>;

    /// Tombstones the given tokens that are owned by `owner_id`.
    ///
    /// Tokens that are unknown, owned by someone else or already deleted are
    /// skipped. Returns how many records were tombstoned.
    async fn delete(&self, tokens: &[String], owner_id: &str) -> Result<u64>;

    /// Liveness check of the backing engine.
    async fn ping(&self) -> Result<()>;

    /// Number of live records.
    async fn count_urls(&self) -> Result<u64>;

    /// Number of distinct owners that ever stored a record.
    async fn count_users(&self) -> Result<u64>;
}

/// Rejects blank urls and owner ids.
pub fn ensure_input(url: &str, owner_id: &str) -> Result<()> {
    if url.trim().is_empty() || owner_id.trim().is_empty() {
        return Err(StorageError::EmptyInput);
    }
    Ok(())
}
