//! This module contains the content-addressed version identity for a
//! compiled implementation together with its constructor arguments.
//!
//! A [`Version`] is a triple of keccak256 digests rather than a single hash
//! because the three components answer different questions:
//!
//! - the *unlinked* digest identifies the logical implementation, stable
//!   across metadata churn and across different library link results;
//! - the *linked* digest pins the exact bytes that will go on chain;
//! - the *constructor arguments* digest distinguishes deployments of the
//!   same code initialised differently.
//!
//! Two versions compare equal exactly when the deployable artifact and its
//! constructor input are byte-for-byte identical.

use std::{
    fmt::{Debug, Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    bytecode::{Bytecode, LinkReference},
    constant::WORD_SIZE_BYTES,
    utility::keccak256,
};

/// A 32-byte keccak256 digest.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Constructs a digest from its raw bytes.
    #[must_use]
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Gets the raw bytes of the digest.
    #[must_use]
    pub fn bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Debug for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Digest {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let no_0x_prefix = s.strip_prefix("0x").unwrap_or(s);
        let decoded = hex::decode(no_0x_prefix)?;
        let bytes: [u8; 32] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// The content-addressed identity of a compiled implementation plus its
/// constructor arguments.
///
/// # Invariants
///
/// A version is immutable once computed and is recomputed fresh for every
/// deployment request; nothing in the pipeline ever mutates one. Versions
/// are equal if and only if the fully linked bytecode and the encoded
/// constructor arguments are byte-for-byte identical.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Version {
    /// The digest of the unlinked creation bytecode with link-reference
    /// spans zeroed and the metadata section stripped.
    pub unlinked: Digest,

    /// The digest of the fully linked creation bytecode, metadata included.
    pub linked: Digest,

    /// The digest of the ABI-encoded constructor arguments.
    pub constructor_args: Digest,
}

impl Version {
    /// Derives the version of the implementation whose unlinked creation
    /// bytecode is `unlinked` (with the provided `link_references`), whose
    /// deployable creation bytecode is `linked`, and whose ABI-encoded
    /// constructor arguments are `constructor_args`.
    ///
    /// This is a pure function of its inputs: no network, no filesystem, and
    /// the same inputs always produce the same version.
    #[must_use]
    pub fn resolve(
        unlinked: &Bytecode,
        link_references: &[LinkReference],
        linked: &Bytecode,
        constructor_args: &[u8],
    ) -> Self {
        let unlinked = Digest::new(unlinked.fingerprint(link_references));
        let linked = Digest::new(keccak256(linked.bytes()));
        let constructor_args = Digest::new(keccak256(constructor_args));

        Self {
            unlinked,
            linked,
            constructor_args,
        }
    }

    /// Derives the single digest under which deployments of this version are
    /// keyed in the manifest.
    ///
    /// The key covers the linked bytecode and the constructor arguments, so
    /// any semantic difference in what would go on chain produces a
    /// different key.
    #[must_use]
    pub fn id(&self) -> Digest {
        let mut preimage = Vec::with_capacity(WORD_SIZE_BYTES * 3);
        preimage.extend_from_slice(self.unlinked.bytes());
        preimage.extend_from_slice(self.linked.bytes());
        preimage.extend_from_slice(self.constructor_args.bytes());

        Digest::new(keccak256(preimage.as_slice()))
    }

    /// Gets the hex encoding of [`Self::id`], which is the form used as a
    /// key in manifest documents.
    #[must_use]
    pub fn id_hex(&self) -> String {
        self.id().to_string()
    }
}

#[cfg(test)]
mod test {
    use crate::{
        bytecode::{Bytecode, LinkReference},
        version::Version,
    };

    fn math_lib_reference() -> LinkReference {
        LinkReference {
            library: "MathLib".into(),
            offset:  2,
            length:  4,
        }
    }

    #[test]
    fn is_deterministic() {
        let unlinked = Bytecode::new(vec![0x60, 0x80, 0x00, 0x00, 0x00, 0x00, 0x60, 0x40]);
        let linked = Bytecode::new(vec![0x60, 0x80, 0xaa, 0xaa, 0xaa, 0xaa, 0x60, 0x40]);
        let args = vec![0x01, 0x02];

        let first = Version::resolve(&unlinked, &[math_lib_reference()], &linked, &args);
        let second = Version::resolve(&unlinked, &[math_lib_reference()], &linked, &args);

        assert_eq!(first, second);
        assert_eq!(first.id(), second.id());
    }

    #[test]
    fn changing_linked_bytecode_changes_the_version() {
        let unlinked = Bytecode::new(vec![0x60, 0x80, 0x00, 0x00, 0x00, 0x00, 0x60, 0x40]);
        let linked_a = Bytecode::new(vec![0x60, 0x80, 0xaa, 0xaa, 0xaa, 0xaa, 0x60, 0x40]);
        let linked_b = Bytecode::new(vec![0x60, 0x80, 0xbb, 0xbb, 0xbb, 0xbb, 0x60, 0x40]);
        let args = vec![0x01, 0x02];

        let version_a = Version::resolve(&unlinked, &[math_lib_reference()], &linked_a, &args);
        let version_b = Version::resolve(&unlinked, &[math_lib_reference()], &linked_b, &args);

        // The logical implementation is unchanged but the deployable bytes
        // are not
        assert_eq!(version_a.unlinked, version_b.unlinked);
        assert_ne!(version_a.linked, version_b.linked);
        assert_ne!(version_a, version_b);
        assert_ne!(version_a.id(), version_b.id());
    }

    #[test]
    fn changing_constructor_args_changes_the_version() {
        let unlinked = Bytecode::new(vec![0x60, 0x80, 0x60, 0x40]);

        let version_a = Version::resolve(&unlinked, &[], &unlinked, &[0x01]);
        let version_b = Version::resolve(&unlinked, &[], &unlinked, &[0x02]);

        assert_ne!(version_a, version_b);
        assert_ne!(version_a.id(), version_b.id());
    }

    #[test]
    fn id_hex_round_trips_as_a_digest() -> anyhow::Result<()> {
        use std::str::FromStr;

        let bytecode = Bytecode::new(vec![0x60, 0x80]);
        let version = Version::resolve(&bytecode, &[], &bytecode, &[]);

        let parsed = super::Digest::from_str(&version.id_hex())?;
        assert_eq!(parsed, version.id());

        Ok(())
    }
}
