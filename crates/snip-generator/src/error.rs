use thiserror::Error;

/// Errors returned when configuring a generator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("invalid token length {bytes} bytes; expected {min}..={max}")]
    InvalidLength { bytes: usize, min: usize, max: usize },
}
