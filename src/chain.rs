//! This module contains the primitive types for talking about a chain
//! (addresses, transaction hashes, and transactions) together with the
//! [`ChainProvider`] boundary behind which all network access happens.
//!
//! The core never broadcasts a deployment itself; that is the job of the
//! caller-supplied deployment callback. The provider exists so the pipeline
//! can read on-chain state: the code at an address for proxy classification
//! and cache revalidation, and storage slots for resolving the
//! implementation currently behind a proxy or beacon.

use std::{
    fmt::{Debug, Display, Formatter},
    str::FromStr,
};

use ethnum::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::provider;

/// The width of an address in bytes.
pub const ADDRESS_WIDTH_BYTES: usize = 20;

/// The width of a transaction hash in bytes.
pub const TX_HASH_WIDTH_BYTES: usize = 32;

/// A 20-byte account address.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Address([u8; ADDRESS_WIDTH_BYTES]);

impl Address {
    /// Constructs an address from its raw bytes.
    #[must_use]
    pub fn new(bytes: [u8; ADDRESS_WIDTH_BYTES]) -> Self {
        Self(bytes)
    }

    /// Constructs an address from the low 20 bytes of a 32-byte storage
    /// word, which is how addresses are stored in proxy slots.
    #[must_use]
    pub fn from_word(word: [u8; 32]) -> Self {
        let mut bytes = [0u8; ADDRESS_WIDTH_BYTES];
        bytes.copy_from_slice(&word[12..]);
        Self(bytes)
    }

    /// Gets the raw bytes of the address.
    #[must_use]
    pub fn bytes(&self) -> &[u8; ADDRESS_WIDTH_BYTES] {
        &self.0
    }

    /// Checks whether this is the all-zero address, which proxy slots use to
    /// mean "nothing is set here".
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|byte| *byte == 0)
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let no_0x_prefix = s.strip_prefix("0x").unwrap_or(s);
        let decoded = hex::decode(no_0x_prefix)?;
        let bytes: [u8; ADDRESS_WIDTH_BYTES] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A 32-byte transaction hash.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct TxHash([u8; TX_HASH_WIDTH_BYTES]);

impl TxHash {
    /// Constructs a transaction hash from its raw bytes.
    #[must_use]
    pub fn new(bytes: [u8; TX_HASH_WIDTH_BYTES]) -> Self {
        Self(bytes)
    }

    /// Gets the raw bytes of the hash.
    #[must_use]
    pub fn bytes(&self) -> &[u8; TX_HASH_WIDTH_BYTES] {
        &self.0
    }
}

impl Debug for TxHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for TxHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for TxHash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let no_0x_prefix = s.strip_prefix("0x").unwrap_or(s);
        let decoded = hex::decode(no_0x_prefix)?;
        let bytes: [u8; TX_HASH_WIDTH_BYTES] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(bytes))
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A transaction to be broadcast by a provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransactionRequest {
    /// The recipient, or `None` for a contract-creation transaction.
    pub to: Option<Address>,

    /// The calldata, or the creation bytecode for a creation transaction.
    pub data: Vec<u8>,
}

/// A transaction as reported back by a provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transaction {
    /// The hash of the transaction.
    pub hash: TxHash,

    /// The block the transaction was included in, if it has been.
    pub block_number: Option<u64>,

    /// The recipient, or `None` for a contract-creation transaction.
    pub to: Option<Address>,

    /// The calldata or creation bytecode carried by the transaction.
    pub input: Vec<u8>,
}

/// The boundary through which the pipeline reads and writes chain state.
///
/// Implementations own all transport concerns: endpoints, retries, timeouts,
/// and cancellation. The pipeline itself never retries a provider call; a
/// failure here propagates out of the pipeline unchanged.
pub trait ChainProvider {
    /// Gets the runtime code of the account at `address`.
    ///
    /// An account with no code yields an empty vector.
    ///
    /// # Errors
    ///
    /// If the request cannot be completed against the node.
    fn get_code(&self, address: Address) -> provider::Result<Vec<u8>>;

    /// Reads the 32-byte storage word of the account at `address` at the
    /// given `slot`.
    ///
    /// # Errors
    ///
    /// If the request cannot be completed against the node.
    fn get_storage_at(&self, address: Address, slot: U256) -> provider::Result<[u8; 32]>;

    /// Broadcasts `request` and returns the resulting transaction hash.
    ///
    /// # Errors
    ///
    /// If the request cannot be completed against the node, or the node
    /// rejects the transaction.
    fn send_transaction(&self, request: TransactionRequest) -> provider::Result<TxHash>;

    /// Looks up a previously broadcast transaction by its hash.
    ///
    /// Yields `None` when the node does not know the transaction.
    ///
    /// # Errors
    ///
    /// If the request cannot be completed against the node.
    fn get_transaction(&self, hash: TxHash) -> provider::Result<Option<Transaction>>;
}
