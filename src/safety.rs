//! This module contains the two gates that stand between a resolved
//! deployment and the network.
//!
//! The first gate checks the candidate implementation on its own: the
//! validation step has already flagged constructs that misbehave behind a
//! proxy, and the gate rejects the deployment unless every finding is
//! explicitly waived. The second gate checks the candidate against the
//! implementation it would replace: the new storage layout must be a safe
//! extension of the deployed one, because the proxy's storage outlives the
//! implementation that wrote it.
//!
//! Both gates run before any transaction is sent and are all-or-nothing: a
//! rejection carries the complete list of violations, and there is no path
//! on which a deployment proceeds with only some checks having passed.

use itertools::{EitherOrBoth, Itertools};

use crate::{
    deploy::DeployConfig,
    error,
    error::{
        container::Errors,
        resolution,
        safety::{Error, Result, StorageViolation, Violation},
    },
    layout::StorageLayout,
    validation::ValidationData,
    version::Version,
};

/// Asserts that the implementation identified by `version` is safe to use
/// behind a proxy or beacon.
///
/// Findings whose check appears in `config.unsafe_allow` are waived; every
/// other finding is a violation. Waivers are per-check, so waiving
/// `delegatecall` does not quiet a `selfdestruct` finding in the same
/// contract.
///
/// # Errors
///
/// - [`resolution::Error::UnknownVersion`] when the snapshot has no artifact
///   for `version`.
/// - [`Error::UnsafeImplementation`] carrying every unwaived finding.
pub fn assert_upgrade_safe(
    validations: &ValidationData,
    version: &Version,
    config: &DeployConfig,
) -> error::Result<()> {
    let artifact = validations.artifact_for_version(version).ok_or_else(|| {
        resolution::Error::UnknownVersion {
            version: version.id_hex(),
        }
    })?;

    let mut violations: Errors<Violation> = Errors::new();
    for finding in &artifact.findings {
        if config.unsafe_allow.contains(&finding.check) {
            continue;
        }

        violations.add(Violation {
            check:    finding.check,
            contract: finding.contract.clone(),
            detail:   finding.detail.clone(),
        });
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(Error::UnsafeImplementation(violations).into())
    }
}

/// Asserts that `new` is a storage-compatible replacement for the deployed
/// layout `old`.
///
/// The predicate is directional: `new` must declare everything `old`
/// declares, in the same order and at the same storage positions, with
/// types that have not changed or narrowed. Variables appended after the
/// last deployed item are always acceptable.
///
/// # Errors
///
/// [`Error::IncompatibleLayout`] enumerating every incompatibility between
/// the two layouts; the list is never truncated.
pub fn assert_storage_upgrade_safe(old: &StorageLayout, new: &StorageLayout) -> Result<()> {
    let mut violations: Errors<StorageViolation> = Errors::new();

    for pair in old.items().iter().zip_longest(new.items().iter()) {
        match pair {
            // The deployed layout declares something the candidate no
            // longer has room for
            EitherOrBoth::Left(old_item) => violations.add(StorageViolation::Deleted {
                label: old_item.label.clone(),
                slot:  old_item.slot,
            }),

            // Variables appended past the end of the deployed layout
            EitherOrBoth::Right(_) => {}

            EitherOrBoth::Both(old_item, new_item) => {
                if old_item.label != new_item.label {
                    violations.add(StorageViolation::Replaced {
                        expected: old_item.label.clone(),
                        found:    new_item.label.clone(),
                        slot:     old_item.slot,
                    });
                    continue;
                }

                if old_item.typ.label != new_item.typ.label {
                    violations.add(StorageViolation::TypeChanged {
                        label:    old_item.label.clone(),
                        old_type: old_item.typ.label.clone(),
                        new_type: new_item.typ.label.clone(),
                    });
                } else if new_item.typ.number_of_bytes < old_item.typ.number_of_bytes {
                    violations.add(StorageViolation::Narrowed {
                        label:     old_item.label.clone(),
                        old_bytes: old_item.typ.number_of_bytes,
                        new_bytes: new_item.typ.number_of_bytes,
                    });
                }

                if old_item.slot != new_item.slot || old_item.offset != new_item.offset {
                    violations.add(StorageViolation::Moved {
                        label:      old_item.label.clone(),
                        old_slot:   old_item.slot,
                        old_offset: old_item.offset,
                        new_slot:   new_item.slot,
                        new_offset: new_item.offset,
                    });
                }
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(Error::IncompatibleLayout(violations))
    }
}
