use crate::token::Token;
use serde::{Deserialize, Serialize};

/// A stored association between a token and the url it shortens.
///
/// Records are never removed. Deleting one only sets `deleted`, after which
/// it is hidden from reverse lookups and owner listings while its token
/// stays reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub token: Token,
    pub original_url: String,
    pub owner_id: String,
    pub deleted: bool,
}

impl Record {
    /// Creates a live record.
    pub fn new(token: Token, original_url: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            token,
            original_url: original_url.into(),
            owner_id: owner_id.into(),
            deleted: false,
        }
    }

    pub fn is_live(&self) -> bool {
        !self.deleted
    }

    /// Projects the record for an owner listing, expanding the token under `base_url`.
    pub fn to_user_url(&self, base_url: &str) -> UserUrl {
        UserUrl {
            short_url: self.token.to_url(base_url),
            original_url: self.original_url.clone(),
        }
    }
}

/// One entry of an owner's url listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUrl {
    pub short_url: String,
    pub original_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_live() {
        let record = Record::new(Token::new("abc"), "http://example.com/a", "u1");
        assert!(record.is_live());
    }

    #[test]
    fn user_url_uses_base_url() {
        let record = Record::new(Token::new("abc"), "http://example.com/a", "u1");
        let listed = record.to_user_url("http://localhost:8080");
        assert_eq!(listed.short_url, "http://localhost:8080/abc");
        assert_eq!(listed.original_url, "http://example.com/a");
    }
}
