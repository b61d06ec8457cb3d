use thiserror::Error;

/// Errors raised by the statistical core. These are deterministic numeric
/// computations, so every error is surfaced synchronously and nothing is
/// retried or partially returned.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("numeric overflow: {0}")]
    NumericOverflow(String),
}
