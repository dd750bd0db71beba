//! Batched scene edits
//!
//! A [`Transaction`] accumulates structural edits on a producer thread and
//! is handed to the scene whole. The scene consumer merges all pending
//! transactions into one consolidated batch before applying it.

use log::warn;

use crate::scene::item::{ItemId, PayloadBox, UpdateFn, INVALID_ITEM_ID};
use crate::scene::selection::Selection;
use crate::scene::transition::TransitionType;

/// One pending transition change for an item
///
/// `transition_type == TransitionType::None` encodes removal of the
/// item's current transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionDescriptor {
    /// Item the transition applies to
    pub item: ItemId,
    /// Kind of transition, or `None` for removal
    pub transition_type: TransitionType,
    /// Item whose bound drives the transition, or `INVALID_ITEM_ID`
    pub bound_item: ItemId,
}

/// Append-only batch of pending scene operations
///
/// Built by a single producer thread, immutable once enqueued. Operations
/// targeting different items carry no ordering; operations targeting the
/// same item are applied in append order across merged batches.
#[derive(Default)]
pub struct Transaction {
    pub(crate) reset_items: Vec<ItemId>,
    pub(crate) reset_payloads: Vec<PayloadBox>,
    pub(crate) removed_items: Vec<ItemId>,
    pub(crate) updated_items: Vec<ItemId>,
    pub(crate) update_functors: Vec<UpdateFn>,
    pub(crate) transitions: Vec<TransitionDescriptor>,
    pub(crate) reset_selections: Vec<Selection>,
}

impl Transaction {
    /// Create an empty transaction
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace the item's payload
    ///
    /// A reset with no content is a caller error and degrades to
    /// [`Self::remove_item`].
    pub fn reset_item(&mut self, id: ItemId, payload: Option<PayloadBox>) {
        if let Some(payload) = payload {
            self.reset_items.push(id);
            self.reset_payloads.push(payload);
        } else {
            warn!("Transaction::reset_item called with no payload for item {id}, removing instead");
            self.remove_item(id);
        }
    }

    /// Destroy the item at commit time
    pub fn remove_item(&mut self, id: ItemId) {
        self.removed_items.push(id);
    }

    /// Apply a mutation to the item's payload at commit time
    pub fn update_item(&mut self, id: ItemId, functor: UpdateFn) {
        self.updated_items.push(id);
        self.update_functors.push(functor);
    }

    /// Attach a transition to the item, replacing any existing one
    pub fn add_transition_to_item(
        &mut self,
        id: ItemId,
        transition_type: TransitionType,
        bound_item: ItemId,
    ) {
        self.transitions.push(TransitionDescriptor {
            item: id,
            transition_type,
            bound_item,
        });
    }

    /// Detach the item's transition
    pub fn remove_transition_from_item(&mut self, id: ItemId) {
        self.transitions.push(TransitionDescriptor {
            item: id,
            transition_type: TransitionType::None,
            bound_item: INVALID_ITEM_ID,
        });
    }

    /// Replace the named selection wholesale at commit time
    pub fn reset_selection(&mut self, selection: Selection) {
        self.reset_selections.push(selection);
    }

    /// Concatenate all operation streams of `other` onto this batch,
    /// preserving relative order
    pub fn merge(&mut self, mut other: Transaction) {
        self.reset_items.append(&mut other.reset_items);
        self.reset_payloads.append(&mut other.reset_payloads);
        self.removed_items.append(&mut other.removed_items);
        self.updated_items.append(&mut other.updated_items);
        self.update_functors.append(&mut other.update_functors);
        self.transitions.append(&mut other.transitions);
        self.reset_selections.append(&mut other.reset_selections);
    }

    /// Whether applying this batch requires taking the selections lock
    pub fn touches_selections(&self) -> bool {
        !self.reset_selections.is_empty()
    }

    /// IDs in the reset stream
    pub fn reset_ids(&self) -> &[ItemId] {
        &self.reset_items
    }

    /// IDs in the remove stream
    pub fn removed_ids(&self) -> &[ItemId] {
        &self.removed_items
    }

    /// IDs in the update stream
    pub fn updated_ids(&self) -> &[ItemId] {
        &self.updated_items
    }

    /// Pending transition descriptors
    pub fn transition_descriptors(&self) -> &[TransitionDescriptor] {
        &self.transitions
    }

    /// Pending selection replacements
    pub fn selections(&self) -> &[Selection] {
        &self.reset_selections
    }
}
