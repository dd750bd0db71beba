//! Transition registry stage
//!
//! Transitions are timed visual-state changes (fades and the like)
//! attached to an item and propagated to its sub-items. The stage owns
//! the entries; items refer to them weakly through [`TransitionId`].

use std::any::Any;
use std::sync::{Arc, Mutex};

use slotmap::{new_key_type, SlotMap};

use crate::scene::item::ItemId;
use crate::scene::stage::SceneStage;

new_key_type! {
    /// Stable handle to a transition-stage entry
    pub struct TransitionId;
}

/// Kind of visual transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionType {
    /// No transition; encodes removal in a transition descriptor
    None,
    /// Item entering the domain
    ElementEnter,
    /// Item leaving the domain
    ElementLeave,
    /// Local user entering the domain
    UserEnter,
    /// Local user leaving the domain
    UserLeave,
    /// Avatar representation changed
    AvatarChange,
}

/// One registered transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Item the transition animates
    pub item: ItemId,
    /// Kind of transition
    pub transition_type: TransitionType,
    /// Item whose bound drives the transition, if any
    pub bound_item: ItemId,
}

/// Registry mapping transition IDs to their entries
///
/// Registered on the scene under [`TransitionStage::NAME`].
#[derive(Default)]
pub struct TransitionStage {
    transitions: Mutex<SlotMap<TransitionId, Transition>>,
}

impl TransitionStage {
    /// Name the stage is registered under
    pub const NAME: &'static str = "transitions";

    /// Create an empty stage
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transition, returning its handle
    pub fn add_transition(
        &self,
        item: ItemId,
        transition_type: TransitionType,
        bound_item: ItemId,
    ) -> TransitionId {
        self.transitions.lock().unwrap().insert(Transition {
            item,
            transition_type,
            bound_item,
        })
    }

    /// Deregister a transition; stale handles are ignored
    pub fn remove_transition(&self, id: TransitionId) {
        self.transitions.lock().unwrap().remove(id);
    }

    /// Look up a transition by handle
    pub fn transition(&self, id: TransitionId) -> Option<Transition> {
        self.transitions.lock().unwrap().get(id).copied()
    }

    /// Number of live transitions
    pub fn transition_count(&self) -> usize {
        self.transitions.lock().unwrap().len()
    }
}

impl SceneStage for TransitionStage {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
