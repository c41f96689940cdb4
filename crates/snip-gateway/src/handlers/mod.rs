mod health;
mod stats;
mod url;
mod user;

pub use health::ping_handler;
pub use stats::stats_handler;
pub use url::{redirect_handler, shorten_batch_handler, shorten_json_handler, shorten_text_handler};
pub use user::{delete_user_urls_handler, list_user_urls_handler};

use crate::error::{AppError, Result};
use serde::de::DeserializeOwned;

/// Decodes a JSON body regardless of its declared content type.
fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(e.to_string()))
}
