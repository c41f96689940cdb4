use snip_core::{Storager, Token};
use snip_storage::DeleteQueue;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    storage: Arc<dyn Storager>,
    deletes: DeleteQueue,
    base_url: Arc<str>,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn Storager>,
        deletes: DeleteQueue,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            deletes,
            base_url: Arc::from(public_base_url.into()),
        }
    }

    pub fn storage(&self) -> &dyn Storager {
        self.storage.as_ref()
    }

    pub fn deletes(&self) -> &DeleteQueue {
        &self.deletes
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Expands a token into the short URL handed to clients.
    pub fn short_url(&self, token: &Token) -> String {
        token.to_url(&self.base_url)
    }
}
