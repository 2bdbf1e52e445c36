//! This module contains the error type for implementations of the chain
//! provider boundary.

use thiserror::Error;

/// The result type for chain provider operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a chain provider.
///
/// The core never retries these; timeout and retry policy belong to the
/// provider implementation, and its failures propagate unchanged.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    /// The provider could not complete the request against its transport.
    #[error("chain provider transport failure: {_0}")]
    Transport(String),

    /// The provider completed the request but the node rejected it.
    #[error("the node rejected the request: {_0}")]
    Rejected(String),
}

impl Error {
    /// Constructs a transport error with the provided `message`.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Constructs a rejection error with the provided `message`.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}
