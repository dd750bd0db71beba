//! Scene item records and the payload contract

use std::any::Any;

use bitflags::bitflags;

use crate::scene::transition::TransitionId;
use crate::spatial::{Aabb, CellId};

/// Stable integer identity of a scene item
///
/// `0` is reserved as "no item". IDs are allocated monotonically and never
/// reused while the scene is alive.
pub type ItemId = u32;

/// Sentinel for "no item"
pub const INVALID_ITEM_ID: ItemId = 0;

bitflags! {
    /// Classification bitset of a scene item
    ///
    /// The spatial flag decides which storage the item lives in; the
    /// remaining bits are free-form tags carried along for filtering.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ItemKey: u32 {
        /// Item has a bounding volume and lives in the spatial index
        const SPATIAL = 1 << 0;
        /// Item is small relative to the cell granularity of the index
        const SMALL = 1 << 1;
        /// Free-form tag bit
        const TAG_0 = 1 << 8;
        /// Free-form tag bit
        const TAG_1 = 1 << 9;
        /// Free-form tag bit
        const TAG_2 = 1 << 10;
        /// Free-form tag bit
        const TAG_3 = 1 << 11;
    }
}

impl ItemKey {
    /// Whether the item belongs in the spatial index
    pub fn is_spatial(self) -> bool {
        self.contains(Self::SPATIAL)
    }

    /// Whether the item is flagged as small
    pub fn is_small(self) -> bool {
        self.contains(Self::SMALL)
    }
}

/// Per-item renderable content
///
/// Implementations own the renderable state of one item and report its
/// classification and bounding volume. Sub-item graphs must be acyclic by
/// construction; the scene additionally guards propagation with a visited
/// set.
pub trait ItemPayload: Send {
    /// Current classification of the item
    fn key(&self) -> ItemKey;

    /// Current bounding volume; only meaningful when the key is spatial
    fn bound(&self) -> Aabb;

    /// Append the IDs of direct sub-items to `out`, returning how many
    /// were appended
    fn sub_items(&self, out: &mut Vec<ItemId>) -> usize {
        let _ = out;
        0
    }

    /// Downcast support for typed update functors
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Owning handle to an item payload
pub type PayloadBox = Box<dyn ItemPayload>;

/// Opaque mutation applied in place to an item's payload at commit time
pub type UpdateFn = Box<dyn FnOnce(&mut dyn ItemPayload) + Send>;

/// One slot of the item store
///
/// Dead slots keep their ID reserved; the payload, key, cell and
/// transition are all cleared by [`Item::kill`].
#[derive(Default)]
pub struct Item {
    payload: Option<PayloadBox>,
    key: ItemKey,
    cell: Option<CellId>,
    small: bool,
    transition: Option<TransitionId>,
}

impl Item {
    /// Whether the slot holds a live payload
    pub fn exists(&self) -> bool {
        self.payload.is_some()
    }

    /// Cached classification key
    pub fn key(&self) -> ItemKey {
        self.key
    }

    /// Current bounding volume of the payload
    pub fn bound(&self) -> Aabb {
        self.payload.as_ref().map(|p| p.bound()).unwrap_or_default()
    }

    /// Cell the item occupies in the spatial index, if spatial
    pub fn cell(&self) -> Option<CellId> {
        self.cell
    }

    /// Whether the item was inserted with the small flag
    pub fn is_small(&self) -> bool {
        self.small
    }

    /// Active transition entry, if any
    pub fn transition_id(&self) -> Option<TransitionId> {
        self.transition
    }

    /// Install or replace the payload and refresh the cached key
    pub fn reset_payload(&mut self, payload: PayloadBox) {
        self.key = payload.key();
        self.payload = Some(payload);
    }

    /// Apply a mutation functor to the payload and refresh the cached key
    pub fn update(&mut self, functor: UpdateFn) {
        if let Some(payload) = self.payload.as_mut() {
            functor(payload.as_mut());
            self.key = payload.key();
        }
    }

    /// Record the item's placement in the spatial index
    pub fn reset_cell(&mut self, cell: CellId, small: bool) {
        self.cell = Some(cell);
        self.small = small;
    }

    /// Forget the item's spatial placement
    pub fn clear_cell(&mut self) {
        self.cell = None;
        self.small = false;
    }

    /// Attach or detach the item's transition
    pub fn set_transition_id(&mut self, transition: Option<TransitionId>) {
        self.transition = transition;
    }

    /// Append the payload's direct sub-item IDs to `out`
    pub fn fetch_sub_items(&self, out: &mut Vec<ItemId>) -> usize {
        self.payload.as_ref().map_or(0, |p| p.sub_items(out))
    }

    /// Destroy the item, leaving a tombstoned slot
    pub fn kill(&mut self) {
        self.payload = None;
        self.key = ItemKey::empty();
        self.cell = None;
        self.small = false;
        self.transition = None;
    }
}
