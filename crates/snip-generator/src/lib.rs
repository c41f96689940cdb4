pub mod error;
pub mod hash;

pub use error::GeneratorError;
pub use hash::HashGenerator;

use snip_core::Token;

/// Trait for deriving tokens.
///
/// Implementations are pure functions of their inputs and never touch
/// storage: the same `(url, owner_id, salt)` always yields the same token,
/// which is what lets engines detect repeated submissions.
///
/// `salt` is `0` for the first candidate. Engines bump it when the candidate
/// is already taken by another record.
pub trait Generator: Send + Sync + 'static {
    fn generate(&self, url: &str, owner_id: &str, salt: u32) -> Token;
}

impl<G: Generator + ?Sized> Generator for std::sync::Arc<G> {
    fn generate(&self, url: &str, owner_id: &str, salt: u32) -> Token {
        (**self).generate(url, owner_id, salt)
    }
}
