//! This module contains errors raised by the durable deployment manifest.
//!
//! The orphaned-deployment condition is deliberately distinguished from
//! ordinary read/write failures: losing the record of a deployment that did
//! reach the chain would permit duplicate deployments on later runs, so the
//! caller must be able to recognise it and reconcile.

use thiserror::Error;

use crate::chain::Address;

/// The result type for manifest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading or writing the per-network manifest.
#[derive(Debug, Error)]
pub enum Error {
    /// The manifest file for the network could not be read or written.
    #[error("could not access the manifest for network `{network}`")]
    Io {
        /// The network whose manifest was being accessed.
        network: String,

        /// The underlying filesystem error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest file exists but does not parse as a manifest document.
    #[error("the manifest for network `{network}` is not a valid manifest document")]
    Corrupt {
        /// The network whose manifest failed to parse.
        network: String,

        /// The underlying deserialisation error.
        #[source]
        source: serde_json::Error,
    },

    /// The manifest lock could not be acquired within the retry budget,
    /// usually because another invocation crashed while holding it.
    #[error(
        "could not lock the manifest for network `{network}`; if no other deployment is running, \
         delete the stale lock file at {lock_path}"
    )]
    LockContended {
        /// The network whose manifest is locked.
        network: String,

        /// The path of the lock file that could not be acquired.
        lock_path: String,
    },

    /// A deployment reached the chain but its record could not be written to
    /// the manifest.
    ///
    /// The address is carried so the caller can reconcile: importing the
    /// record by hand, or accepting that the next run will deploy the same
    /// version again at a fresh address.
    #[error(
        "the implementation was deployed at {address} but recording version {version} in the \
         manifest failed; the deployment is unrecorded and must be reconciled"
    )]
    OrphanedDeployment {
        /// The address the implementation was deployed at.
        address: Address,

        /// The hex-encoded version identifier the record should be keyed by.
        version: String,

        /// The manifest failure that prevented the record from being written.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps a manifest failure that occurred after a successful broadcast
    /// into the orphaned-deployment condition for the deployment at
    /// `address` keyed by `version`.
    #[must_use]
    pub fn orphaned(address: Address, version: impl Into<String>, source: Error) -> Self {
        Self::OrphanedDeployment {
            address,
            version: version.into(),
            source: Box::new(source),
        }
    }
}
