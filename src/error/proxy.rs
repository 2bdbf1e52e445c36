//! This module contains errors raised while classifying the proxy or beacon
//! target of a deployment.

use thiserror::Error;

use crate::{chain::Address, proxy::ProxyKind};

/// The result type for proxy-classification operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while classifying the target of an upgrade.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    /// The account at the target address has no code at all.
    #[error("there is no code at {address}; it cannot be the target of an upgrade")]
    EmptyAccount {
        /// The address that was expected to hold a contract.
        address: Address,
    },

    /// The code at the target address matches no known proxy pattern.
    #[error("the code at {address} matches no known proxy pattern")]
    NotAProxy {
        /// The address that was expected to be a proxy.
        address: Address,
    },

    /// The code at the target address is a minimal (EIP-1167) clone, which
    /// forwards to a fixed implementation and can never be upgraded.
    #[error("the code at {address} is a minimal (EIP-1167) clone, which cannot be upgraded")]
    NotUpgradeable {
        /// The address of the minimal clone.
        address: Address,
    },

    /// The detected proxy kind disagrees with the kind the caller requested.
    ///
    /// The kind attached to a proxy at creation must remain stable across its
    /// lifetime, so this is never silently resolved in either direction.
    #[error("requested proxy kind `{requested}` but the code at {address} is a `{detected}` proxy")]
    KindMismatch {
        /// The address whose kind was being checked.
        address: Address,

        /// The kind the caller asked for.
        requested: ProxyKind,

        /// The kind detected from the on-chain code.
        detected: ProxyKind,
    },

    /// A beacon must point at a plain implementation, but the target address
    /// matches a known proxy pattern.
    #[error(
        "the beacon target at {address} matches a known proxy pattern; beacons must point at \
         plain implementations"
    )]
    TargetIsProxy {
        /// The address that was expected to be a plain implementation.
        address: Address,
    },
}
