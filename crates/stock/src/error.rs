//! Stock service call failures.

use thiserror::Error;

/// A remote stock call failed.
///
/// Callers never retry these; the error travels up unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    /// The service could not be reached (connect, timeout, broken stream).
    #[error("stock service unreachable: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("stock service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered with a body we could not decode.
    #[error("unexpected stock service response: {0}")]
    Decode(String),
}

impl StockError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}
