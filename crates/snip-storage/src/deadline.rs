use async_trait::async_trait;
use snip_core::{BatchItem, Record, Result, StorageError, Storager, Token};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// A storage decorator that bounds every request-scoped call by a deadline.
///
/// Calls that do not finish in time fail with [`StorageError::Timeout`].
/// `delete` is passed through untouched: it runs detached from any request
/// and the engine applies its own timeout.
#[derive(Debug, Clone)]
pub struct DeadlineStorage<S> {
    inner: S,
    timeout: Duration,
}

impl<S: Storager> DeadlineStorage<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Returns a reference to the wrapped storage.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn within<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout = ?self.timeout, "storage call timed out");
                Err(StorageError::Timeout(format!(
                    "{operation} did not finish within {:?}",
                    self.timeout
                )))
            }
        }
    }
}

#[async_trait]
impl<S: Storager> Storager for DeadlineStorage<S> {
    async fn insert_url(&self, url: &str, owner_id: &str) -> Result<Token> {
        self.within("insert_url", self.inner.insert_url(url, owner_id))
            .await
    }

    async fn insert_urls(&self, urls: &[String], owner_id: &str) -> Result<Vec<BatchItem>> {
        self.within("insert_urls", self.inner.insert_urls(urls, owner_id))
            .await
    }

    async fn get_full_url(&self, token: &str) -> Result<String> {
        self.within("get_full_url", self.inner.get_full_url(token))
            .await
    }

    async fn get_short_url(&self, url: &str) -> Result<Token> {
        self.within("get_short_url", self.inner.get_short_url(url))
            .await
    }

    async fn get_all_user_urls(&self, owner_id: &str) -> Result<Vec<Record>> {
        self.within("get_all_user_urls", self.inner.get_all_user_urls(owner_id))
            .await
    }

    async fn delete(&self, tokens: &[String], owner_id: &str) -> Result<u64> {
        self.inner.delete(tokens, owner_id).await
    }

    async fn ping(&self) -> Result<()> {
        self.within("ping", self.inner.ping()).await
    }

    async fn count_urls(&self) -> Result<u64> {
        self.within("count_urls", self.inner.count_urls()).await
    }

    async fn count_users(&self) -> Result<u64> {
        self.within("count_users", self.inner.count_users()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use snip_generator::HashGenerator;

    /// Answers every call after `delay`.
    struct SlowStorage {
        delay: Duration,
    }

    #[async_trait]
    impl Storager for SlowStorage {
        async fn insert_url(&self, _url: &str, _owner_id: &str) -> Result<Token> {
            tokio::time::sleep(self.delay).await;
            Ok(Token::new("slow"))
        }

        async fn get_full_url(&self, _token: &str) -> Result<String> {
            tokio::time::sleep(self.delay).await;
            Ok("http://example.com/slow".to_string())
        }

        async fn get_short_url(&self, _url: &str) -> Result<Token> {
            tokio::time::sleep(self.delay).await;
            Ok(Token::new("slow"))
        }

        async fn get_all_user_urls(&self, _owner_id: &str) -> Result<Vec<Record>> {
            tokio::time::sleep(self.delay).await;
            Ok(Vec::new())
        }

        async fn delete(&self, tokens: &[String], _owner_id: &str) -> Result<u64> {
            tokio::time::sleep(self.delay).await;
            Ok(tokens.len() as u64)
        }

        async fn ping(&self) -> Result<()> {
            tokio::time::sleep(self.delay).await;
            Ok(())
        }

        async fn count_urls(&self) -> Result<u64> {
            tokio::time::sleep(self.delay).await;
            Ok(0)
        }

        async fn count_users(&self) -> Result<u64> {
            tokio::time::sleep(self.delay).await;
            Ok(0)
        }
    }

    fn slow(delay_ms: u64, timeout_ms: u64) -> DeadlineStorage<SlowStorage> {
        DeadlineStorage::new(
            SlowStorage {
                delay: Duration::from_millis(delay_ms),
            },
            Duration::from_millis(timeout_ms),
        )
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let storage = slow(500, 20);

        let err = storage.get_full_url("slow").await.unwrap_err();
        assert!(matches!(err, StorageError::Timeout(_)));

        let err = storage.ping().await.unwrap_err();
        assert!(matches!(err, StorageError::Timeout(_)));
    }

    #[tokio::test]
    async fn delete_is_not_bounded() {
        let storage = slow(100, 20);

        let deleted = storage
            .delete(&["a".to_string(), "b".to_string()], "u1")
            .await
            .unwrap();
        assert_eq!(deleted, 2);
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let storage = DeadlineStorage::new(
            MemoryStorage::new(HashGenerator::new()),
            DEFAULT_REQUEST_TIMEOUT,
        );

        let token = storage.insert_url("http://example.com/a", "u1").await.unwrap();
        assert_eq!(
            storage.get_full_url(token.as_str()).await.unwrap(),
            "http://example.com/a"
        );

        let err = storage
            .insert_url("http://example.com/a", "u1")
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::Conflict(token));
    }
}
