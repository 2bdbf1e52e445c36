//! This module contains the primary error type for the deployer's interface.
//! It also re-exports the more specific error types that are
//! subsystem-specific.

pub mod container;
pub mod manifest;
pub mod provider;
pub mod proxy;
pub mod resolution;
pub mod safety;

use thiserror::Error;

/// The interface result type for the library.
///
/// # Usage
///
/// Any function considered to be part of the public interface of the library
/// should return this result type. Subsystems should return the more-specific
/// child error types as appropriate.
pub type Result<T> = std::result::Result<T, Error>;

/// The interface error type for the library.
///
/// All errors returned from the library interface (and hence encountered by
/// the clients of the library) should be members of this enum. The variants
/// follow the error taxonomy of the pipeline: input-resolution failures and
/// safety-gate failures abort before any transaction is sent, callback
/// failures propagate unchanged, and persistence failures after a successful
/// broadcast surface as the manifest's orphaned-deployment condition.
#[derive(Debug, Error)]
pub enum Error {
    /// Errors from resolving the deployment inputs.
    #[error(transparent)]
    Resolution(#[from] resolution::Error),

    /// Errors from the upgrade-safety gates.
    #[error(transparent)]
    Safety(#[from] safety::Error),

    /// Errors from classifying the proxy or beacon target.
    #[error(transparent)]
    Proxy(#[from] proxy::Error),

    /// Errors from the durable deployment manifest.
    #[error(transparent)]
    Manifest(#[from] manifest::Error),

    /// Errors from the chain provider boundary.
    #[error(transparent)]
    Provider(#[from] provider::Error),

    /// A failure inside the caller-supplied deployment callback, propagated
    /// unchanged and never retried by the core.
    #[error("the deployment callback failed")]
    Callback(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps a failure from the caller-supplied deployment callback.
    pub fn callback(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Callback(error.into())
    }
}
