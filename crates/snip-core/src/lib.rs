//! Core types and traits for the snip URL shortener.
//!
//! This crate provides the record model, the error taxonomy and the
//! [`Storager`] contract shared by every storage engine and by the
//! transport layer.

pub mod error;
pub mod record;
pub mod storager;
pub mod token;

pub use error::{Result, StorageError};
pub use record::{Record, UserUrl};
pub use storager::{ensure_input, BatchItem, Storager};
pub use token::Token;
