//! This module contains errors raised by the two upgrade-safety gates: the
//! static checks over a candidate implementation, and the storage-layout
//! compatibility check between the candidate and the deployed implementation.
//!
//! Both gates accumulate into the [`Errors`] container so that a rejection
//! always reports the complete list of violations, never just the first.

use thiserror::Error;

use crate::{error::container::Errors, utility::U256Wrapper, validation::SafetyCheck};

/// The result type for the upgrade-safety gates.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised when a candidate implementation fails one of the safety
/// gates.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    /// The candidate implementation contains constructs that are unsafe in an
    /// upgradeable deployment and were not explicitly waived.
    #[error("the implementation is not safe for upgradeable deployment\n{_0}")]
    UnsafeImplementation(Errors<Violation>),

    /// The candidate's storage layout is incompatible with the layout of the
    /// currently deployed implementation.
    #[error("the new storage layout is incompatible with the deployed storage layout\n{_0}")]
    IncompatibleLayout(Errors<StorageViolation>),
}

/// A single violated static check in a candidate implementation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("`{check}` in contract {contract}: {detail}")]
pub struct Violation {
    /// The check that the implementation violated.
    pub check: SafetyCheck,

    /// The contract in which the violation occurs.
    pub contract: String,

    /// A human-readable description of the violating construct.
    pub detail: String,
}

/// A single incompatibility between the deployed storage layout and the
/// candidate's storage layout.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum StorageViolation {
    /// A variable that exists in the deployed layout has no counterpart in
    /// the candidate layout.
    #[error("deleted `{label}` (slot {slot}); existing state would be orphaned")]
    Deleted {
        /// The label of the deleted variable.
        label: String,

        /// The slot the variable occupies in the deployed layout.
        slot: U256Wrapper,
    },

    /// The variable at a given position in the deployed layout has been
    /// replaced by a differently named variable, which also covers the case
    /// of two variables having been reordered.
    #[error("replaced `{expected}` with `{found}` (slot {slot}); declarations must keep their order")]
    Replaced {
        /// The label the deployed layout declares at this position.
        expected: String,

        /// The label the candidate layout declares at this position.
        found: String,

        /// The slot at which the mismatch occurs.
        slot: U256Wrapper,
    },

    /// A variable kept its name but changed to a different type.
    #[error("changed the type of `{label}` from {old_type} to {new_type}")]
    TypeChanged {
        /// The label of the retyped variable.
        label: String,

        /// The type the variable has in the deployed layout.
        old_type: String,

        /// The type the variable has in the candidate layout.
        new_type: String,
    },

    /// A variable kept its name and type label but now occupies fewer bytes,
    /// which truncates existing state.
    #[error("narrowed `{label}` from {old_bytes} bytes to {new_bytes} bytes")]
    Narrowed {
        /// The label of the narrowed variable.
        label: String,

        /// The byte width of the variable in the deployed layout.
        old_bytes: usize,

        /// The byte width of the variable in the candidate layout.
        new_bytes: usize,
    },

    /// A variable kept its name but was moved to a different slot or offset,
    /// so reads of existing state would hit the wrong storage.
    #[error(
        "moved `{label}` from slot {old_slot} (offset {old_offset}) to slot {new_slot} (offset \
         {new_offset})"
    )]
    Moved {
        /// The label of the moved variable.
        label: String,

        /// The slot the variable occupies in the deployed layout.
        old_slot: U256Wrapper,

        /// The intra-slot offset of the variable in the deployed layout.
        old_offset: usize,

        /// The slot the variable occupies in the candidate layout.
        new_slot: U256Wrapper,

        /// The intra-slot offset of the variable in the candidate layout.
        new_offset: usize,
    },
}
