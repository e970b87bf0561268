//! Item metadata and the slot tables that tie it to the flat index.
//!
//! [`MetadataTable`] keeps two maps in lock-step: slot -> metadata for live
//! entries, and item id -> slot as the reverse lookup. An orphaned slot is
//! simply absent from both.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::vector::SlotId;

/// Metadata stored next to every live vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub item_id: String,

    #[serde(alias = "user_id")]
    pub owner: String,

    pub category: String,

    /// Where the image was fetched from; informational only.
    #[serde(default, alias = "image_url", skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,

    #[serde(default)]
    pub name: String,

    /// Open attributes (color, brand, season, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ItemMetadata {
    /// Creates metadata with the default display name `"{category} item"`.
    pub fn new(
        item_id: impl Into<String>,
        owner: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        let category = category.into();
        Self {
            item_id: item_id.into(),
            owner: owner.into(),
            name: default_name(&category),
            category,
            image_ref: None,
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_image_ref(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Display name used when an item arrives without one.
pub fn default_name(category: &str) -> String {
    format!("{category} item")
}

/// Forward and reverse tables for live entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTable {
    entries: BTreeMap<SlotId, ItemMetadata>,
    item_slots: BTreeMap<String, SlotId>,
}

impl MetadataTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a table from persisted parts without checking them.
    ///
    /// Call [`MetadataTable::validate`] before trusting the result.
    pub fn from_parts(
        entries: BTreeMap<SlotId, ItemMetadata>,
        item_slots: BTreeMap<String, SlotId>,
    ) -> Self {
        Self {
            entries,
            item_slots,
        }
    }

    /// Live slot of an item.
    #[must_use]
    pub fn slot_of(&self, item_id: &str) -> Option<SlotId> {
        self.item_slots.get(item_id).copied()
    }

    /// Metadata stored at a slot; `None` for orphaned slots.
    #[must_use]
    pub fn get(&self, slot: SlotId) -> Option<&ItemMetadata> {
        self.entries.get(&slot)
    }

    /// Live entry of an item together with its slot.
    #[must_use]
    pub fn entry_for(&self, item_id: &str) -> Option<(SlotId, &ItemMetadata)> {
        let slot = self.slot_of(item_id)?;
        self.entries.get(&slot).map(|meta| (slot, meta))
    }

    /// Records `metadata` at `slot`, returning the entry this item previously had.
    ///
    /// The previous slot, if any, becomes an orphan.
    pub fn insert(&mut self, slot: SlotId, metadata: ItemMetadata) -> Option<(SlotId, ItemMetadata)> {
        let previous = self.remove_item(&metadata.item_id);
        self.item_slots.insert(metadata.item_id.clone(), slot);
        self.entries.insert(slot, metadata);
        previous
    }

    /// Drops whatever lives at `slot` from both tables.
    pub fn remove_slot(&mut self, slot: SlotId) -> Option<ItemMetadata> {
        let metadata = self.entries.remove(&slot)?;
        if self.item_slots.get(&metadata.item_id) == Some(&slot) {
            self.item_slots.remove(&metadata.item_id);
        }
        Some(metadata)
    }

    /// Drops the live entry of an item from both tables.
    pub fn remove_item(&mut self, item_id: &str) -> Option<(SlotId, ItemMetadata)> {
        let slot = self.item_slots.remove(item_id)?;
        self.entries.remove(&slot).map(|meta| (slot, meta))
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &ItemMetadata)> {
        self.entries.iter().map(|(slot, meta)| (*slot, meta))
    }

    pub(crate) fn entries(&self) -> &BTreeMap<SlotId, ItemMetadata> {
        &self.entries
    }

    pub(crate) fn item_slots(&self) -> &BTreeMap<String, SlotId> {
        &self.item_slots
    }

    /// Checks that both tables agree and only reference slots below `slot_count`.
    pub fn validate(&self, slot_count: usize) -> Result<(), String> {
        if self.entries.len() != self.item_slots.len() {
            return Err(format!(
                "{} entries but {} reverse lookups",
                self.entries.len(),
                self.item_slots.len()
            ));
        }
        for (item_id, slot) in &self.item_slots {
            if slot.index() >= slot_count {
                return Err(format!(
                    "item '{item_id}' points at slot {slot} beyond {slot_count} stored vectors"
                ));
            }
            match self.entries.get(slot) {
                Some(meta) if meta.item_id == *item_id => {}
                Some(meta) => {
                    return Err(format!(
                        "slot {slot} holds '{}' but is registered for '{item_id}'",
                        meta.item_id
                    ));
                }
                None => return Err(format!("item '{item_id}' points at empty slot {slot}")),
            }
        }
        Ok(())
    }
}
