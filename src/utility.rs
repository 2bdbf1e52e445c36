//! Utility functions and wrapper types useful throughout the codebase.

use std::{
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
};

use ethnum::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

/// Calculates the keccak256 hash of the provided `data`.
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);

    let hash = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(hash.as_slice());
    output
}

/// A type alias to make [`U256Wrapper`] easier to type internally.
pub type U256W = U256Wrapper;

/// The `U256Wrapper` is responsible for allowing the serialisation of the
/// [`U256`] type to JSON.
///
/// It provides reasonable conversions from a number of common types used
/// within the library. Storage slot indices are the main use, as patterns
/// like EIP-1967 place data at slots far beyond anything a machine word can
/// index.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
#[repr(transparent)]
pub struct U256Wrapper(pub U256);

impl U256Wrapper {
    /// Gets the big-endian byte representation of the wrapped value.
    #[must_use]
    pub fn to_be_bytes(self) -> [u8; 32] {
        self.0.to_be_bytes()
    }

    /// Parses a wrapper from a hex string with or without the `0x` prefix.
    ///
    /// # Errors
    ///
    /// If `input` is not valid hexadecimal of at most 32 bytes.
    pub fn from_str_hex(input: &str) -> Result<Self, hex::FromHexError> {
        let no_0x_prefix = input.strip_prefix("0x").unwrap_or(input);
        let padded = format!("{no_0x_prefix:0>64}");

        let decoded = hex::decode(&padded)?;
        let bytes: [u8; 32] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;

        Ok(Self(U256::from_be_bytes(bytes)))
    }
}

impl Debug for U256Wrapper {
    /// The wrapper has absolutely no semantic meaning, so we print the
    /// underlying value for the debug representation.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for U256Wrapper {
    /// Slots read far better in hex, as the well-known proxy slots are
    /// 32-byte hash outputs.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.to_be_bytes()))
    }
}

impl PartialOrd for U256Wrapper {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256Wrapper {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl From<U256> for U256Wrapper {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<U256Wrapper> for U256 {
    fn from(U256Wrapper(value): U256Wrapper) -> Self {
        value
    }
}

impl From<u64> for U256Wrapper {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<usize> for U256Wrapper {
    fn from(value: usize) -> Self {
        Self(U256::from(value as u64))
    }
}

impl From<[u8; 32]> for U256Wrapper {
    fn from(value: [u8; 32]) -> Self {
        Self(U256::from_be_bytes(value))
    }
}

impl Serialize for U256Wrapper {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut value = String::from("0x");
        value.push_str(&hex::encode(self.0.to_be_bytes()));

        serializer.serialize_str(&value)
    }
}

impl<'de> Deserialize<'de> for U256Wrapper {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        let u256 = U256::from_str_hex(&s).map_err(serde::de::Error::custom)?;
        Ok(U256Wrapper(u256))
    }
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use super::U256Wrapper;

    #[test]
    fn round_trips_through_json() -> anyhow::Result<()> {
        // Create a value with a huge slot index
        let slot = U256Wrapper::from_str_hex(
            "0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc",
        )?;

        // Check that it survives serialisation unchanged
        let encoded = serde_json::to_string(&slot)?;
        let decoded: U256Wrapper = serde_json::from_str(&encoded)?;
        assert_eq!(decoded, slot);

        Ok(())
    }

    #[test]
    fn orders_by_numeric_value() {
        let small = U256Wrapper::from(1u64);
        let large = U256Wrapper(U256::from_words(1, 0));

        assert!(small < large);
    }
}
