//! Error types for tidal-router.

use thiserror::Error;

use crate::MessageId;

/// Result type for tidal-router operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the relay engine.
///
/// Degenerate scores and thin candidate sets are handled in place and never
/// show up here.
#[derive(Debug, Error)]
pub enum Error {
    /// A setting is absent or outside its domain.
    #[error("invalid configuration for `{field}`: {reason}")]
    Configuration {
        field: &'static str,
        reason: String,
    },

    /// A message reached a lifecycle hook without a usable replica count.
    #[error("protocol violation on message {message}: {reason}")]
    ProtocolViolation { message: MessageId, reason: String },
}

impl Error {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Configuration {
            field,
            reason: reason.into(),
        }
    }
}
