//! This module contains constants that are needed throughout the codebase.

/// The storage slot holding the implementation address in an
/// [EIP-1967](https://eips.ethereum.org/EIPS/eip-1967) proxy.
///
/// Calculated as `keccak256("eip1967.proxy.implementation") - 1`.
pub const EIP1967_IMPLEMENTATION_SLOT: &str =
    "0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc";

/// The storage slot holding the admin address in an
/// [EIP-1967](https://eips.ethereum.org/EIPS/eip-1967) transparent proxy.
///
/// Calculated as `keccak256("eip1967.proxy.admin") - 1`.
pub const EIP1967_ADMIN_SLOT: &str =
    "0xb53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103";

/// The storage slot holding the beacon address in an
/// [EIP-1967](https://eips.ethereum.org/EIPS/eip-1967) beacon proxy.
///
/// Calculated as `keccak256("eip1967.proxy.beacon") - 1`.
pub const EIP1967_BEACON_SLOT: &str =
    "0xa3f0ad74e5423aebfd80d3ef4346578335a9a72aeaee59ff6cb3582b35133d50";

/// The storage slot holding the implementation address in an
/// [EIP-1822](https://eips.ethereum.org/EIPS/eip-1822) (UUPS) proxy.
///
/// Calculated as `keccak256("PROXIABLE")`.
pub const EIP1822_PROXIABLE_SLOT: &str =
    "0xc5f16f0fcc639fa48a6947836d9850f504798523bf8c9a3a87d5876cf622bcf7";

/// The storage slot at which the standard upgradeable beacon contract keeps
/// the implementation address it points at.
///
/// The beacon is a plain contract rather than a proxy, so this is simply its
/// first declared state variable.
pub const BEACON_IMPLEMENTATION_SLOT: u64 = 0;

/// The leading bytes of an [EIP-1167](https://eips.ethereum.org/EIPS/eip-1167)
/// minimal proxy's runtime code, up to where the implementation address is
/// embedded.
pub const EIP1167_RUNTIME_PREFIX: &str = "0x363d3d373d3d3d363d73";

/// The trailing bytes of an [EIP-1167](https://eips.ethereum.org/EIPS/eip-1167)
/// minimal proxy's runtime code, following the embedded implementation
/// address.
pub const EIP1167_RUNTIME_SUFFIX: &str = "0x5af43d82803e903d91602b57fd5bf3";

/// The total length in bytes of an EIP-1167 minimal proxy's runtime code:
/// the prefix, a 20-byte implementation address, and the suffix.
pub const EIP1167_RUNTIME_LENGTH_BYTES: usize = 45;

/// The number of trailing bytes of contract bytecode that encode the length
/// of the CBOR metadata section that Solidity appends to what it compiles.
pub const METADATA_LENGTH_FIELD_BYTES: usize = 2;

/// The smallest CBOR map header byte that can begin a Solidity metadata
/// section (a map with one entry).
pub const METADATA_CBOR_MAP_MIN: u8 = 0xa1;

/// The largest CBOR map header byte that can begin a Solidity metadata
/// section (a map with three entries, as emitted when experimental features
/// are enabled).
pub const METADATA_CBOR_MAP_MAX: u8 = 0xa3;

/// The width of word on the EVM in bits.
pub const WORD_SIZE_BITS: usize = 256;

/// The width of a byte on the EVM (and most other places) in bits.
pub const BYTE_SIZE_BITS: usize = 8;

/// The width of a word on the EVM in bytes.
pub const WORD_SIZE_BYTES: usize = WORD_SIZE_BITS / BYTE_SIZE_BITS;

/// The schema version written into manifest documents produced by this
/// version of the library.
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// The default number of times the manifest store will retry acquiring the
/// per-network lock before giving up.
pub const DEFAULT_MANIFEST_LOCK_RETRIES: usize = 50;

/// The default number of milliseconds the manifest store sleeps between
/// attempts to acquire the per-network lock.
pub const DEFAULT_MANIFEST_LOCK_RETRY_DELAY_MS: u64 = 100;
