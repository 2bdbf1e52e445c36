//! This module contains types useful for dealing with the compiled bytecode
//! of the implementations you want to deploy.
//!
//! Two normalisations matter for identity:
//!
//! 1. Solidity appends a CBOR-encoded metadata section to everything it
//!    compiles, so two compilations of identical source can differ in their
//!    final bytes. The trailer is framed by a two-byte length, which lets it
//!    be stripped before hashing.
//! 2. Bytecode that references external libraries is produced *unlinked*,
//!    with placeholder spans that the linker later fills with library
//!    addresses. Zeroing those spans gives an identity that is stable across
//!    different link results, while the fully linked bytes still
//!    distinguish deployments for record keying.

use serde::{Deserialize, Serialize};

use crate::{
    constant::{METADATA_CBOR_MAP_MAX, METADATA_CBOR_MAP_MIN, METADATA_LENGTH_FIELD_BYTES},
    utility::keccak256,
};

/// A representation of some contract creation bytecode passed to the
/// library.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Bytecode {
    bytes: Vec<u8>,
}

impl Bytecode {
    /// Creates a new bytecode container from the provided raw `bytes`.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Creates a new bytecode container from the hex-encoded `code`, with or
    /// without the `0x` prefix.
    ///
    /// # Errors
    ///
    /// If `code` is not valid hexadecimal.
    pub fn from_hex(code: impl Into<String>) -> Result<Self, hex::FromHexError> {
        let code = code.into();
        // Generally unsafe but fine for ASCII.
        let no_0x_prefix = match code.strip_prefix("0x") {
            Some(no_0x_prefix) => no_0x_prefix,
            None => &code,
        };

        let bytes = hex::decode(no_0x_prefix)?;
        Ok(Self { bytes })
    }

    /// Gets a reference to the raw bytes of the bytecode.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    /// Gets the length of the bytecode in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Checks if the bytecode is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Gets the bytecode with the trailing Solidity metadata section
    /// removed, if one is present.
    ///
    /// The metadata section is a CBOR map whose length is encoded in the
    /// final two bytes of the bytecode. Contracts compiled without metadata
    /// end in arbitrary bytes, so the framing is only trusted when it is
    /// internally consistent: the claimed section fits within the bytecode
    /// and begins with a CBOR map header.
    #[must_use]
    pub fn without_metadata(&self) -> &[u8] {
        let Some(split) = self.metadata_offset() else {
            return self.bytes.as_slice();
        };
        &self.bytes[..split]
    }

    /// Gets the byte offset at which the metadata section (including its
    /// length framing) begins, or [`None`] if no plausible section is
    /// present.
    #[must_use]
    pub fn metadata_offset(&self) -> Option<usize> {
        if self.bytes.len() < METADATA_LENGTH_FIELD_BYTES {
            return None;
        }

        let length_field = &self.bytes[self.bytes.len() - METADATA_LENGTH_FIELD_BYTES..];
        let metadata_length = usize::from(u16::from_be_bytes([length_field[0], length_field[1]]));

        let section_length = metadata_length + METADATA_LENGTH_FIELD_BYTES;
        if metadata_length == 0 || section_length > self.bytes.len() {
            return None;
        }

        let split = self.bytes.len() - section_length;
        let map_header = self.bytes[split];
        if !(METADATA_CBOR_MAP_MIN..=METADATA_CBOR_MAP_MAX).contains(&map_header) {
            return None;
        }

        Some(split)
    }

    /// Computes the normalised identity bytes of this bytecode: link
    /// reference spans zeroed and the metadata section stripped.
    ///
    /// Spans in `link_references` that fall outside the bytecode are
    /// ignored rather than panicking, as they describe a different artifact
    /// than the one provided.
    #[must_use]
    pub fn normalised(&self, link_references: &[LinkReference]) -> Vec<u8> {
        let mut bytes = self.without_metadata().to_vec();

        for reference in link_references {
            let end = reference.offset.saturating_add(reference.length);
            if end > bytes.len() {
                continue;
            }
            bytes[reference.offset..end].fill(0);
        }

        bytes
    }

    /// Computes the keccak256 fingerprint of the normalised identity bytes
    /// of this bytecode.
    ///
    /// Two artifacts that differ only in linked library addresses or in
    /// their metadata sections share a fingerprint.
    #[must_use]
    pub fn fingerprint(&self, link_references: &[LinkReference]) -> [u8; 32] {
        keccak256(self.normalised(link_references).as_slice())
    }
}

/// A span of creation bytecode that the linker fills in with the address of
/// an external library.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct LinkReference {
    /// The name of the library the span will be linked against.
    pub library: String,

    /// The byte offset of the span within the creation bytecode.
    pub offset: usize,

    /// The length of the span in bytes.
    pub length: usize,
}
