//! This module contains errors raised while resolving deployment inputs:
//! matching bytecode to a validated artifact, matching a version to its
//! storage layout, and resolving the implementation behind an address.
//!
//! All of these are fatal before any network call is made.

use thiserror::Error;

use crate::chain::Address;

/// The result type for input-resolution operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving deployment inputs against the validation
/// snapshot and the manifest.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    /// The provided bytecode matched more than one validated artifact, so the
    /// implementation cannot be identified unambiguously.
    #[error(
        "the provided bytecode matches {} validated artifacts ({}); cannot identify the \
         implementation unambiguously",
        .matches.len(),
        .matches.join(", ")
    )]
    AmbiguousBytecode {
        /// The names of every artifact that matched.
        matches: Vec<String>,
    },

    /// The provided bytecode matched no validated artifact at all. This
    /// usually means the implementation was not part of the compile step that
    /// produced the validation snapshot.
    #[error("the provided bytecode matches no validated artifact; was the contract compiled?")]
    UnknownBytecode,

    /// The requested version has no corresponding artifact in the validation
    /// snapshot.
    #[error("no validated artifact corresponds to version {version}")]
    UnknownVersion {
        /// The hex-encoded identifier of the version that could not be found.
        version: String,
    },

    /// The implementation at `address` is not recorded in the manifest, so
    /// its storage layout cannot be reconstructed.
    ///
    /// This deliberately fails closed rather than guessing a layout from
    /// on-chain bytecode. Operators that know the deployed layout is
    /// compatible can skip the storage gate explicitly.
    #[error(
        "the implementation at {address} is not recorded in the manifest (was it deployed by \
         another tool?); aborting rather than guessing its storage layout"
    )]
    UnrecordedImplementation {
        /// The address whose implementation record is missing.
        address: Address,
    },
}
