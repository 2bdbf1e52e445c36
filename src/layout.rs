//! This module contains the definitions for the storage layout
//! representation types.
//!
//! A layout is the canonical shape of an implementation's persistent state:
//! which variables exist, what type each has, and where each lives in
//! storage. The compatibility rules between two layouts live in
//! [`crate::safety`]; this module is only the data model.

use serde::{Deserialize, Serialize};

use crate::utility::U256Wrapper;

/// The storage layout of one implementation contract.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StorageLayout {
    items: Vec<StorageItem>,
}

impl StorageLayout {
    /// Creates a new, empty storage layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `item` to the storage layout.
    pub fn add(&mut self, item: StorageItem) {
        self.items.push(item);

        // Keep them sorted by slot index with ties broken by slot offset
        self.items.sort_by_key(|i| (i.slot, i.offset));
    }

    /// Gets the storage items that make up this layout.
    ///
    /// These are guaranteed to be sorted in ascending order by slot index
    /// and then offset within the slot.
    #[must_use]
    pub fn items(&self) -> &[StorageItem] {
        self.items.as_slice()
    }
}

/// Additional utility functions to enable cleaner testing with the storage
/// layout.
impl StorageLayout {
    /// Checks if the layout declares a variable with the provided `label`.
    #[must_use]
    pub fn has_item(&self, label: &str) -> bool {
        self.items.iter().any(|i| i.label == label)
    }

    /// Gets the item with the provided `label`, if the layout declares one.
    #[must_use]
    pub fn item(&self, label: &str) -> Option<&StorageItem> {
        self.items.iter().find(|i| i.label == label)
    }

    /// Gets the number of items in the storage layout.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Checks if the storage layout is empty (has no items).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Allow building a layout directly from a collection of items.
impl FromIterator<StorageItem> for StorageLayout {
    fn from_iter<T: IntoIterator<Item = StorageItem>>(iter: T) -> Self {
        let mut layout = Self::new();
        for item in iter {
            layout.add(item);
        }
        layout
    }
}

/// A representation of one declared storage variable.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct StorageItem {
    /// The source-level name of the variable.
    pub label: String,

    #[serde(rename = "type")]
    /// The declared type of the variable.
    pub typ: StorageType,

    /// The index of the storage slot at which the variable starts.
    pub slot: U256Wrapper,

    /// The byte offset at which the variable starts within its slot.
    ///
    /// This will be 0 except where multiple small variables are packed into
    /// a single slot.
    pub offset: usize,

    /// The contract in whose source the variable is declared, which for
    /// inherited state differs from the implementation being deployed.
    pub contract: String,
}

impl StorageItem {
    /// Constructs a new storage item for the variable `label` of type `typ`
    /// declared in `contract`, living at `slot` and `offset`.
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        typ: StorageType,
        slot: impl Into<U256Wrapper>,
        offset: usize,
        contract: impl Into<String>,
    ) -> Self {
        let label = label.into();
        let slot = slot.into();
        let contract = contract.into();
        Self {
            label,
            typ,
            slot,
            offset,
            contract,
        }
    }
}

/// The declared type of a storage variable.
///
/// The canonical label (`t_uint256`, `t_address`, and so on, as the
/// compiler's own layout output names types) is what compatibility compares;
/// the byte width rides along so that a same-labelled type that shrank, such
/// as a struct that lost a member, is still detectable without this crate
/// carrying a full type system.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct StorageType {
    /// The canonical label of the type.
    pub label: String,

    /// The number of bytes a value of the type occupies in storage.
    pub number_of_bytes: usize,
}

impl StorageType {
    /// Constructs a new storage type with the provided canonical `label`
    /// occupying `number_of_bytes` in storage.
    #[must_use]
    pub fn new(label: impl Into<String>, number_of_bytes: usize) -> Self {
        let label = label.into();
        Self {
            label,
            number_of_bytes,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{StorageItem, StorageLayout, StorageType};

    fn uint256() -> StorageType {
        StorageType::new("t_uint256", 32)
    }

    #[test]
    fn keeps_items_sorted_by_slot_then_offset() {
        // Add the items out of declaration order
        let mut layout = StorageLayout::new();
        layout.add(StorageItem::new("b", uint256(), 1u64, 0, "Box"));
        layout.add(StorageItem::new("a", uint256(), 0u64, 0, "Box"));
        layout.add(StorageItem::new("c", StorageType::new("t_uint8", 1), 1u64, 16, "Box"));

        // Check that iteration follows storage order
        let labels: Vec<&str> = layout.items().iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
    }

    #[test]
    fn finds_items_by_label() {
        let layout: StorageLayout =
            [StorageItem::new("owner", StorageType::new("t_address", 20), 0u64, 0, "Vault")]
                .into_iter()
                .collect();

        assert!(layout.has_item("owner"));
        assert!(!layout.has_item("pending_owner"));
        assert_eq!(layout.item("owner").unwrap().offset, 0);
    }

    #[test]
    fn serialises_items_with_a_type_field() -> anyhow::Result<()> {
        let item = StorageItem::new("total", uint256(), 2u64, 0, "Vault");

        let encoded = serde_json::to_value(&item)?;
        assert_eq!(encoded["type"]["label"], "t_uint256");
        assert_eq!(encoded["slot"], "0x0000000000000000000000000000000000000000000000000000000000000002");

        Ok(())
    }
}
