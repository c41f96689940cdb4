use crate::token::Token;
use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("url and owner id must not be empty")]
    EmptyInput,
    /// The url is already shortened. Carries the token it is stored under,
    /// so callers can answer with it instead of failing.
    #[error("url is already shortened as {0}")]
    Conflict(Token),
    #[error("short url not found: {0}")]
    NotFound(String),
    #[error("short url was deleted: {0}")]
    Deleted(Token),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("recovery log failure: {0}")]
    RecoveryLog(String),
    #[error("no free token after {0} attempts")]
    TokenExhausted(u32),
}

impl StorageError {
    /// Returns the existing token when this error is an insert conflict.
    pub fn conflict_token(&self) -> Option<&Token> {
        match self {
            StorageError::Conflict(token) => Some(token),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_exposes_existing_token() {
        let err = StorageError::Conflict(Token::new("a1b2c3"));
        assert_eq!(err.conflict_token().map(Token::as_str), Some("a1b2c3"));
        assert!(StorageError::EmptyInput.conflict_token().is_none());
    }

    #[test]
    fn messages_name_the_token() {
        let err = StorageError::Deleted(Token::new("a1b2c3"));
        assert_eq!(err.to_string(), "short url was deleted: a1b2c3");
    }
}
