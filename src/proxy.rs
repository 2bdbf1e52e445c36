//! This module contains the classification of on-chain code into the proxy
//! patterns the deployer understands, and the assertions the pipeline makes
//! about upgrade targets.
//!
//! Classification works by pattern matching the runtime code itself rather
//! than by probing storage: the well-known proxy implementations embed their
//! 32-byte slot constants directly in their code, and the minimal
//! (EIP-1167) clone has a fixed runtime shape. This keeps classification to
//! a single `get_code` call.

use std::fmt::{Display, Formatter};

use ethnum::U256;
use serde::{Deserialize, Serialize};

use crate::{
    chain::{Address, ChainProvider},
    constant::{
        BEACON_IMPLEMENTATION_SLOT,
        EIP1167_RUNTIME_LENGTH_BYTES,
        EIP1167_RUNTIME_PREFIX,
        EIP1167_RUNTIME_SUFFIX,
        EIP1822_PROXIABLE_SLOT,
        EIP1967_ADMIN_SLOT,
        EIP1967_BEACON_SLOT,
        EIP1967_IMPLEMENTATION_SLOT,
    },
    error,
    error::proxy::Error,
};

/// The proxy patterns behind which an implementation can be deployed.
///
/// The kind is attached to a proxy when it is created and must remain
/// stable for that address across its lifetime; a detected kind that
/// disagrees with a requested one is an error, never silently resolved.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    /// A transparent proxy, upgraded through its admin.
    Transparent,

    /// A UUPS proxy, upgraded through the implementation itself.
    Uups,

    /// A beacon proxy, upgraded by repointing its shared beacon.
    Beacon,
}

impl Display for ProxyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Transparent => "transparent",
            Self::Uups => "uups",
            Self::Beacon => "beacon",
        };
        write!(f, "{name}")
    }
}

/// The result of pattern matching a piece of runtime code against the known
/// proxy shapes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProxyPattern {
    /// One of the upgradeable proxy kinds.
    Kind(ProxyKind),

    /// A minimal (EIP-1167) clone, which is a proxy but can never be
    /// upgraded.
    MinimalClone,
}

/// Classifies the provided runtime `code` against the known proxy patterns,
/// yielding [`None`] when the code matches none of them.
///
/// The beacon slot constant is checked before the implementation slot
/// because a beacon proxy's code carries only the former, while both the
/// transparent and UUPS shapes carry the latter; the admin slot constant is
/// what separates a transparent proxy from a UUPS one.
#[must_use]
pub fn classify_code(code: &[u8]) -> Option<ProxyPattern> {
    if is_minimal_clone(code) {
        return Some(ProxyPattern::MinimalClone);
    }

    if contains_word(code, &slot_needle(EIP1967_BEACON_SLOT)) {
        return Some(ProxyPattern::Kind(ProxyKind::Beacon));
    }

    let has_implementation_slot = contains_word(code, &slot_needle(EIP1967_IMPLEMENTATION_SLOT))
        || contains_word(code, &slot_needle(EIP1822_PROXIABLE_SLOT));
    if has_implementation_slot {
        let kind = if contains_word(code, &slot_needle(EIP1967_ADMIN_SLOT)) {
            ProxyKind::Transparent
        } else {
            ProxyKind::Uups
        };
        return Some(ProxyPattern::Kind(kind));
    }

    None
}

/// Checks whether `code` has the fixed runtime shape of an EIP-1167 minimal
/// clone: the standard prefix, a 20-byte implementation address, and the
/// standard suffix.
#[must_use]
pub fn is_minimal_clone(code: &[u8]) -> bool {
    let prefix = hex_constant(EIP1167_RUNTIME_PREFIX);
    let suffix = hex_constant(EIP1167_RUNTIME_SUFFIX);

    code.len() == EIP1167_RUNTIME_LENGTH_BYTES
        && code.starts_with(prefix.as_slice())
        && code.ends_with(suffix.as_slice())
}

/// Detects the proxy kind of the contract at `address`.
///
/// # Errors
///
/// - [`Error::EmptyAccount`] when there is no code at the address.
/// - [`Error::NotAProxy`] when the code matches no known proxy pattern.
/// - [`Error::NotUpgradeable`] when the code is a minimal clone.
pub fn detect_proxy_kind<P: ChainProvider>(
    provider: &P,
    address: Address,
) -> error::Result<ProxyKind> {
    let code = provider.get_code(address)?;
    if code.is_empty() {
        return Err(Error::EmptyAccount { address }.into());
    }

    match classify_code(code.as_slice()) {
        Some(ProxyPattern::Kind(kind)) => Ok(kind),
        Some(ProxyPattern::MinimalClone) => Err(Error::NotUpgradeable { address }.into()),
        None => Err(Error::NotAProxy { address }.into()),
    }
}

/// Detects the proxy kind of the contract at `address` and cross-checks it
/// against the kind the caller `requested`, if any.
///
/// # Errors
///
/// As [`detect_proxy_kind`], plus [`Error::KindMismatch`] when the detected
/// kind disagrees with the requested one.
pub fn assert_proxy_kind<P: ChainProvider>(
    provider: &P,
    address: Address,
    requested: Option<ProxyKind>,
) -> error::Result<ProxyKind> {
    let detected = detect_proxy_kind(provider, address)?;

    if let Some(requested) = requested {
        if requested != detected {
            return Err(Error::KindMismatch {
                address,
                requested,
                detected,
            }
            .into());
        }
    }

    Ok(detected)
}

/// Asserts that the contract at `address` is *not* a proxy of any known
/// pattern, minimal clones included.
///
/// An empty account passes: the assertion checks exactly that no proxy is
/// present, and what else the caller requires of the address is its own
/// concern.
///
/// # Errors
///
/// [`Error::TargetIsProxy`] when any proxy pattern matches.
pub fn assert_not_proxy<P: ChainProvider>(provider: &P, address: Address) -> error::Result<()> {
    let code = provider.get_code(address)?;

    if classify_code(code.as_slice()).is_some() {
        return Err(Error::TargetIsProxy { address }.into());
    }

    Ok(())
}

/// Reads the address of the implementation currently behind the proxy at
/// `proxy`, yielding [`None`] when the slot is unset.
///
/// Both the transparent and UUPS shapes keep the implementation in the
/// EIP-1967 slot; the legacy EIP-1822 slot is consulted as a fallback for
/// older UUPS proxies.
///
/// # Errors
///
/// If the provider cannot complete the storage reads.
pub fn implementation_at_proxy<P: ChainProvider>(
    provider: &P,
    proxy: Address,
) -> error::Result<Option<Address>> {
    let word = provider.get_storage_at(proxy, slot_word(EIP1967_IMPLEMENTATION_SLOT))?;
    let implementation = Address::from_word(word);
    if !implementation.is_zero() {
        return Ok(Some(implementation));
    }

    let word = provider.get_storage_at(proxy, slot_word(EIP1822_PROXIABLE_SLOT))?;
    let implementation = Address::from_word(word);
    Ok((!implementation.is_zero()).then_some(implementation))
}

/// Reads the address of the implementation the beacon at `beacon` currently
/// points at, yielding [`None`] when the slot is unset.
///
/// The standard upgradeable beacon keeps its implementation in its first
/// storage slot.
///
/// # Errors
///
/// If the provider cannot complete the storage read.
pub fn implementation_at_beacon<P: ChainProvider>(
    provider: &P,
    beacon: Address,
) -> error::Result<Option<Address>> {
    let word = provider.get_storage_at(beacon, U256::from(BEACON_IMPLEMENTATION_SLOT))?;
    let implementation = Address::from_word(word);
    Ok((!implementation.is_zero()).then_some(implementation))
}

/// Checks whether the 32-byte `needle` appears verbatim anywhere in `code`.
fn contains_word(code: &[u8], needle: &[u8; 32]) -> bool {
    code.windows(needle.len()).any(|window| window == needle)
}

/// Decodes one of the module's hex constants into its bytes.
#[allow(clippy::missing_panics_doc)] // Panics are guarded as to never happen
fn hex_constant(constant: &str) -> Vec<u8> {
    hex::decode(&constant[2..]).expect("The embedded constant was not valid hexadecimal")
}

/// Decodes one of the module's slot constants into the 32-byte word that
/// appears verbatim in proxy runtime code.
#[allow(clippy::missing_panics_doc)] // Panics are guarded as to never happen
fn slot_needle(slot: &str) -> [u8; 32] {
    hex_constant(slot)
        .as_slice()
        .try_into()
        .expect("The embedded slot constant was not 32 bytes")
}

/// Decodes one of the module's slot constants into the word used as a
/// storage key.
#[allow(clippy::missing_panics_doc)] // Panics are guarded as to never happen
fn slot_word(slot: &str) -> U256 {
    U256::from_str_hex(slot).expect("The embedded slot constant was not valid hexadecimal")
}
