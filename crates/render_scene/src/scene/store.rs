//! Backing storage for scene items

use std::collections::HashSet;

use crate::scene::item::{Item, ItemId, INVALID_ITEM_ID};

/// Set of IDs for live items with no spatial key
pub type NonspatialSet = HashSet<ItemId>;

/// Growable array of item records addressed by [`ItemId`]
///
/// Slot 0 is permanently dead so that `INVALID_ITEM_ID` never resolves to
/// a live item. Slots are never shrunk or recycled while the scene is
/// alive.
pub struct ItemStore {
    slots: Vec<Item>,
}

impl ItemStore {
    /// Create a store holding only the reserved slot 0
    pub fn new() -> Self {
        let mut slots = Vec::new();
        slots.push(Item::default());
        Self { slots }
    }

    /// Grow the backing array so every ID below `max_id` has a slot,
    /// over-allocating by `slack` to avoid per-commit reallocation
    pub fn ensure_allocated(&mut self, max_id: ItemId, slack: u32) {
        let needed = max_id as usize;
        if needed > self.slots.len() {
            self.slots.resize_with(needed + slack as usize, Item::default);
        }
    }

    /// Access an item slot
    pub fn get(&self, id: ItemId) -> Option<&Item> {
        if id == INVALID_ITEM_ID {
            return None;
        }
        self.slots.get(id as usize)
    }

    /// Mutably access an item slot
    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        if id == INVALID_ITEM_ID {
            return None;
        }
        self.slots.get_mut(id as usize)
    }

    /// Number of slots, including dead ones
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the store holds nothing beyond the reserved slot
    pub fn is_empty(&self) -> bool {
        self.slots.len() <= 1
    }
}

impl Default for ItemStore {
    fn default() -> Self {
        Self::new()
    }
}
