use crate::error::GeneratorError;
use crate::Generator;
use sha2::{Digest, Sha256};
use snip_core::Token;

pub const MIN_TOKEN_BYTES: usize = 3;
pub const MAX_TOKEN_BYTES: usize = 16;
pub const DEFAULT_TOKEN_BYTES: usize = 5;

/// Derives tokens from a SHA-256 digest of the url and owner id.
///
/// The digest is truncated to a fixed number of bytes and hex encoded, so a
/// token is `2 * bytes` characters long. Truncation makes collisions
/// possible; engines resolve them by asking again with a higher salt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashGenerator {
    bytes: usize,
}

impl HashGenerator {
    /// Creates a generator producing tokens of [`DEFAULT_TOKEN_BYTES`] bytes.
    pub fn new() -> Self {
        Self {
            bytes: DEFAULT_TOKEN_BYTES,
        }
    }

    /// Creates a generator producing tokens of `bytes` digest bytes.
    pub fn with_bytes(bytes: usize) -> Result<Self, GeneratorError> {
        if !(MIN_TOKEN_BYTES..=MAX_TOKEN_BYTES).contains(&bytes) {
            return Err(GeneratorError::InvalidLength {
                bytes,
                min: MIN_TOKEN_BYTES,
                max: MAX_TOKEN_BYTES,
            });
        }
        Ok(Self { bytes })
    }

    /// Length of produced tokens in characters.
    pub fn token_len(&self) -> usize {
        self.bytes * 2
    }
}

impl Default for HashGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for HashGenerator {
    fn generate(&self, url: &str, owner_id: &str, salt: u32) -> Token {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        // separator keeps ("ab", "c") and ("a", "bc") apart
        hasher.update([0u8]);
        hasher.update(owner_id.as_bytes());
        if salt > 0 {
            hasher.update([0u8]);
            hasher.update(salt.to_string().as_bytes());
        }
        let digest = hasher.finalize();
        Token::new(hex::encode(&digest[..self.bytes]))
    }
}
