//! HTTP transport for the snip URL shortener.
//!
//! A thin axum layer over an `Arc<dyn Storager>`: it parses requests,
//! resolves the owner from the `shortener` cookie, and maps
//! [`StorageError`](snip_core::StorageError)s to status codes.

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod model;
pub mod state;
pub mod telemetry;

pub use app::App;
pub use config::{Cli, Config, ConfigError};
pub use error::AppError;
pub use state::AppState;
pub use telemetry::{init_tracing, LogFormat};
