//! Versioned scene graph with batched transaction commits
//!
//! Producers on arbitrary threads build [`Transaction`] batches and
//! enqueue them; a single consumer thread drains the queue once per tick
//! with [`Scene::process_transaction_queue`], merging everything pending
//! into one consolidated batch and applying it in a fixed operation
//! order. Items are classified into the spatial index or the non-spatial
//! set based on their key, and re-classified when a payload mutation
//! flips the spatial flag.

mod item;
mod selection;
mod stage;
mod store;
mod transaction;
mod transition;

pub use item::{Item, ItemId, ItemKey, ItemPayload, PayloadBox, UpdateFn, INVALID_ITEM_ID};
pub use selection::Selection;
pub use stage::SceneStage;
pub use store::{ItemStore, NonspatialSet};
pub use transaction::{Transaction, TransitionDescriptor};
pub use transition::{Transition, TransitionId, TransitionStage, TransitionType};

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, error, warn};

use crate::config::SceneConfig;
use crate::spatial::{Aabb, FlatCellIndex, SpatialIndex};

/// Item storage guarded by the store lock as one unit
///
/// The spatial index and the non-spatial set are only ever mutated
/// together with the item records, so a single lock covers all three.
struct SceneStore {
    items: ItemStore,
    spatial: Box<dyn SpatialIndex>,
    nonspatial: NonspatialSet,
}

/// Thread-safe, versioned scene graph
///
/// Four independent locks guard the transaction queue, the item storage,
/// the selections and the stage registry. The queue lock is always
/// released before the store lock is taken, so a producer enqueue never
/// blocks behind item-mutation work. The scene spawns no threads;
/// [`Scene::process_transaction_queue`] must be serialized by the caller
/// (one logical frame).
pub struct Scene {
    config: SceneConfig,
    /// Next ID to hand out; starts at 1, ID 0 is reserved
    id_allocator: AtomicU32,
    /// Highest ID readers may index without taking the store lock
    visible_count: AtomicU32,
    queue: Mutex<VecDeque<Transaction>>,
    store: Mutex<SceneStore>,
    selections: Mutex<HashMap<String, Selection>>,
    stages: Mutex<HashMap<String, Arc<dyn SceneStage>>>,
}

impl Scene {
    /// Create a scene with the default configuration and flat spatial index
    pub fn new() -> Self {
        Self::with_index(SceneConfig::default(), Box::new(FlatCellIndex::new()))
    }

    /// Create a scene with an explicit configuration and spatial index
    pub fn with_index(config: SceneConfig, spatial: Box<dyn SpatialIndex>) -> Self {
        let scene = Self {
            config,
            id_allocator: AtomicU32::new(1),
            visible_count: AtomicU32::new(1),
            queue: Mutex::new(VecDeque::new()),
            store: Mutex::new(SceneStore {
                items: ItemStore::new(),
                spatial,
                nonspatial: NonspatialSet::new(),
            }),
            selections: Mutex::new(HashMap::new()),
            stages: Mutex::new(HashMap::new()),
        };
        scene.reset_stage(TransitionStage::NAME, Arc::new(TransitionStage::new()));
        scene
    }

    /// Allocate the next item ID
    ///
    /// Safe from any thread; the ID becomes visible to readers only after
    /// the commit that first resets it.
    pub fn allocate_id(&self) -> ItemId {
        self.id_allocator.fetch_add(1, Ordering::AcqRel)
    }

    /// Whether an ID is below the most recently published visible-ID
    /// counter; never blocks on a commit
    pub fn is_allocated_id(&self, id: ItemId) -> bool {
        id != INVALID_ITEM_ID && id < self.visible_count.load(Ordering::Acquire)
    }

    /// Enqueue a change batch; safe from any thread, any time
    pub fn enqueue_transaction(&self, transaction: Transaction) {
        self.queue.lock().unwrap().push_back(transaction);
    }

    /// Drain and apply all pending transactions
    ///
    /// Single-consumer entry point, expected to run once per frame on one
    /// dedicated thread. Overlapping calls are not supported; callers
    /// must serialize invocation.
    pub fn process_transaction_queue(&self) {
        let mut consolidated = Transaction::new();
        {
            let mut queue = self.queue.lock().unwrap();
            while let Some(transaction) = queue.pop_front() {
                consolidated.merge(transaction);
            }
        }

        let Transaction {
            reset_items,
            reset_payloads,
            removed_items,
            updated_items,
            update_functors,
            transitions,
            reset_selections,
        } = consolidated;
        let touches_selections = !reset_selections.is_empty();

        {
            let mut store = self.store.lock().unwrap();
            let max_id = self.id_allocator.load(Ordering::Acquire);
            store
                .items
                .ensure_allocated(max_id, self.config.grow_slack);

            let store = &mut *store;
            Self::apply_resets(store, reset_items, reset_payloads);

            // Publish after resets so readers may index the new items
            self.visible_count.swap(max_id, Ordering::AcqRel);

            Self::apply_updates(store, updated_items, update_functors);
            self.apply_removes(store, removed_items);
            self.apply_transitions(store, transitions);

            // Removal never shrinks the counter; re-publish to keep the
            // semantics explicit
            self.visible_count.swap(max_id, Ordering::AcqRel);
        }

        if touches_selections {
            let mut selections = self.selections.lock().unwrap();
            for selection in reset_selections {
                selections.insert(selection.name().to_string(), selection);
            }
        }
    }

    fn apply_resets(store: &mut SceneStore, ids: Vec<ItemId>, payloads: Vec<PayloadBox>) {
        for (id, payload) in ids.into_iter().zip(payloads) {
            let Some(item) = store.items.get_mut(id) else {
                warn!("reset for unallocated item {id}, dropping");
                continue;
            };
            let old_key = item.key();
            let old_cell = item.cell();

            item.reset_payload(payload);
            let new_key = item.key();
            let bound = item.bound();

            // An item may not change spatial classification across a reset
            // unless this is its first-time creation
            if !(old_key.is_empty() || old_key.is_spatial() == new_key.is_spatial()) {
                debug_assert!(false, "item {id} changed spatial classification on reset");
                error!("item {id} changed spatial classification on reset, relocating");
            }

            if new_key.is_spatial() {
                store.nonspatial.remove(&id);
                let new_cell = store.spatial.reset_item(old_cell, old_key, bound, id, new_key);
                item.reset_cell(new_cell, new_key.is_small());
            } else {
                if old_key.is_spatial() {
                    store.spatial.remove_item(old_cell, old_key, id);
                    item.clear_cell();
                }
                store.nonspatial.insert(id);
            }
        }
    }

    fn apply_updates(store: &mut SceneStore, ids: Vec<ItemId>, functors: Vec<UpdateFn>) {
        for (id, functor) in ids.into_iter().zip(functors) {
            // Sentinel entries keep the id stream aligned with the functor
            // stream when a pending update was dropped upstream
            if id == INVALID_ITEM_ID {
                continue;
            }
            let Some(item) = store.items.get_mut(id) else {
                warn!("update for unallocated item {id}, dropping");
                continue;
            };
            let old_key = item.key();
            let old_cell = item.cell();

            item.update(functor);
            let new_key = item.key();
            let bound = item.bound();

            if old_key.is_spatial() == new_key.is_spatial() {
                if new_key.is_spatial() {
                    let new_cell =
                        store.spatial.reset_item(old_cell, old_key, bound, id, new_key);
                    item.reset_cell(new_cell, new_key.is_small());
                }
            } else if new_key.is_spatial() {
                store.nonspatial.remove(&id);
                let new_cell = store.spatial.reset_item(old_cell, old_key, bound, id, new_key);
                item.reset_cell(new_cell, new_key.is_small());
            } else {
                store.spatial.remove_item(old_cell, old_key, id);
                item.clear_cell();
                store.nonspatial.insert(id);
            }
        }
    }

    fn apply_removes(&self, store: &mut SceneStore, ids: Vec<ItemId>) {
        for id in ids {
            let Some(item) = store.items.get_mut(id) else {
                warn!("remove for unallocated item {id}, dropping");
                continue;
            };
            if !item.exists() {
                debug!("removing already-dead item {id}");
                continue;
            }
            let old_key = item.key();
            let old_cell = item.cell();
            let transition = item.transition_id();
            item.kill();

            if old_key.is_spatial() {
                store.spatial.remove_item(old_cell, old_key, id);
            } else {
                store.nonspatial.remove(&id);
            }

            if let Some(transition) = transition {
                if let Some(stage) = self.get_stage_as::<TransitionStage>(TransitionStage::NAME) {
                    stage.remove_transition(transition);
                }
            }
        }
    }

    fn apply_transitions(&self, store: &mut SceneStore, descriptors: Vec<TransitionDescriptor>) {
        if descriptors.is_empty() {
            return;
        }
        let Some(stage) = self.get_stage_as::<TransitionStage>(TransitionStage::NAME) else {
            warn!("transition stage is not registered, dropping transition descriptors");
            return;
        };

        for descriptor in descriptors {
            let (exists, old_transition) = match store.items.get(descriptor.item) {
                Some(item) => (item.exists(), item.transition_id()),
                None => {
                    warn!("transition for unallocated item {}, dropping", descriptor.item);
                    continue;
                }
            };
            if !exists {
                // The subject may have been removed earlier in this same
                // consolidated batch
                debug!("transition on dead item {}, skipping", descriptor.item);
                continue;
            }

            // Tear the old transition down before installing the new one
            if let Some(old) = old_transition {
                stage.remove_transition(old);
            }
            let transition = if descriptor.transition_type == TransitionType::None {
                None
            } else {
                Some(stage.add_transition(
                    descriptor.item,
                    descriptor.transition_type,
                    descriptor.bound_item,
                ))
            };

            Self::set_item_transition(store, descriptor.item, transition);
        }
    }

    /// Set an item's transition and propagate it to every transitively
    /// discovered sub-item
    fn set_item_transition(store: &mut SceneStore, id: ItemId, transition: Option<TransitionId>) {
        let Some(item) = store.items.get_mut(id) else {
            return;
        };
        if !item.exists() {
            warn!("setting transition on item {id} without payload");
            return;
        }
        item.set_transition_id(transition);

        let mut sub_items = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(id);
        Self::collect_sub_items(&store.items, id, &mut sub_items, &mut visited);

        for sub_item in sub_items {
            if let Some(sub) = store.items.get_mut(sub_item) {
                sub.set_transition_id(transition);
            }
        }
    }

    /// Depth-first sub-item discovery
    ///
    /// The visited set terminates propagation if a payload ever reports a
    /// cyclic sub-item graph.
    fn collect_sub_items(
        items: &ItemStore,
        parent: ItemId,
        out: &mut Vec<ItemId>,
        visited: &mut HashSet<ItemId>,
    ) {
        let Some(item) = items.get(parent) else {
            return;
        };
        if !item.exists() {
            return;
        }
        let begin = out.len();
        let count = item.fetch_sub_items(out);
        for i in begin..begin + count {
            let sub_item = out[i];
            if visited.insert(sub_item) {
                Self::collect_sub_items(items, sub_item, out, visited);
            }
        }
    }

    /// Get a copy of the named selection; empty if absent
    pub fn get_selection(&self, name: &str) -> Selection {
        self.selections
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace or insert selections immediately, bypassing the queue
    pub fn reset_selections(&self, incoming: Vec<Selection>) {
        let mut selections = self.selections.lock().unwrap();
        for selection in incoming {
            selections.insert(selection.name().to_string(), selection);
        }
    }

    /// Look up a stage by name; `None` on miss, callers must check
    pub fn get_stage(&self, name: &str) -> Option<Arc<dyn SceneStage>> {
        self.stages.lock().unwrap().get(name).cloned()
    }

    /// Look up a stage by name and concrete type
    pub fn get_stage_as<T: SceneStage>(&self, name: &str) -> Option<Arc<T>> {
        self.get_stage(name)
            .and_then(|stage| stage.into_any().downcast::<T>().ok())
    }

    /// Register or replace a stage under the given name
    pub fn reset_stage(&self, name: &str, stage: Arc<dyn SceneStage>) {
        self.stages.lock().unwrap().insert(name.to_string(), stage);
    }

    /// Cached classification key of an item; `None` for unallocated slots
    pub fn item_key(&self, id: ItemId) -> Option<ItemKey> {
        self.store.lock().unwrap().items.get(id).map(Item::key)
    }

    /// Transition handle attached to an item, if any
    pub fn item_transition(&self, id: ItemId) -> Option<TransitionId> {
        self.store
            .lock()
            .unwrap()
            .items
            .get(id)
            .and_then(Item::transition_id)
    }

    /// Bounding volume of the cell an item occupies in the spatial index
    pub fn item_cell_bound(&self, id: ItemId) -> Option<Aabb> {
        let store = self.store.lock().unwrap();
        let cell = store.items.get(id).and_then(Item::cell)?;
        store.spatial.cell_bound(cell)
    }

    /// Whether the item is currently stored in the spatial index
    pub fn in_spatial_index(&self, id: ItemId) -> bool {
        self.store.lock().unwrap().spatial.contains(id)
    }

    /// Whether the item is currently stored in the non-spatial set
    pub fn in_nonspatial_set(&self, id: ItemId) -> bool {
        self.store.lock().unwrap().nonspatial.contains(&id)
    }

    /// Number of items in the spatial index
    pub fn spatial_item_count(&self) -> usize {
        self.store.lock().unwrap().spatial.item_count()
    }

    /// Number of items in the non-spatial set
    pub fn nonspatial_item_count(&self) -> usize {
        self.store.lock().unwrap().nonspatial.len()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use std::any::Any;

    #[derive(Clone)]
    struct TestPayload {
        key: ItemKey,
        bound: Aabb,
        sub_items: Vec<ItemId>,
    }

    impl TestPayload {
        fn spatial(bound: Aabb) -> Self {
            Self {
                key: ItemKey::SPATIAL,
                bound,
                sub_items: Vec::new(),
            }
        }

        fn nonspatial() -> Self {
            Self {
                key: ItemKey::TAG_0,
                bound: Aabb::default(),
                sub_items: Vec::new(),
            }
        }

        fn with_sub_items(mut self, sub_items: Vec<ItemId>) -> Self {
            self.sub_items = sub_items;
            self
        }

        fn boxed(self) -> Option<PayloadBox> {
            Some(Box::new(self))
        }
    }

    impl ItemPayload for TestPayload {
        fn key(&self) -> ItemKey {
            self.key
        }

        fn bound(&self) -> Aabb {
            self.bound
        }

        fn sub_items(&self, out: &mut Vec<ItemId>) -> usize {
            out.extend_from_slice(&self.sub_items);
            self.sub_items.len()
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn unit_bound(center: f32) -> Aabb {
        Aabb::from_center_extents(Vec3::new(center, 0.0, 0.0), Vec3::new(0.5, 0.5, 0.5))
    }

    fn commit_reset(scene: &Scene, id: ItemId, payload: TestPayload) {
        let mut txn = Transaction::new();
        txn.reset_item(id, payload.boxed());
        scene.enqueue_transaction(txn);
        scene.process_transaction_queue();
    }

    fn transition_stage(scene: &Scene) -> Arc<TransitionStage> {
        scene
            .get_stage_as::<TransitionStage>(TransitionStage::NAME)
            .unwrap()
    }

    #[test]
    fn test_visible_id_published_by_commit() {
        let scene = Scene::new();
        let id = scene.allocate_id();
        assert_eq!(id, 1);
        assert!(!scene.is_allocated_id(id));
        assert!(!scene.is_allocated_id(INVALID_ITEM_ID));

        commit_reset(&scene, id, TestPayload::nonspatial());
        assert!(scene.is_allocated_id(id));
        assert!(!scene.is_allocated_id(id + 1));
    }

    #[test]
    fn test_spatial_reset_then_nonspatial_update() {
        let scene = Scene::new();
        let id = scene.allocate_id();
        let bound = unit_bound(2.0);

        commit_reset(&scene, id, TestPayload::spatial(bound));
        assert!(scene.is_allocated_id(id));
        assert!(scene.in_spatial_index(id));
        assert!(!scene.in_nonspatial_set(id));
        assert!(scene.item_cell_bound(id).unwrap().contains(&bound));

        let mut txn = Transaction::new();
        txn.update_item(
            id,
            Box::new(|payload| {
                if let Some(payload) = payload.as_any_mut().downcast_mut::<TestPayload>() {
                    payload.key = ItemKey::TAG_0;
                }
            }),
        );
        scene.enqueue_transaction(txn);
        scene.process_transaction_queue();

        assert!(!scene.in_spatial_index(id));
        assert!(scene.in_nonspatial_set(id));
        assert!(scene.item_cell_bound(id).is_none());
    }

    #[test]
    fn test_nonspatial_update_to_spatial() {
        let scene = Scene::new();
        let id = scene.allocate_id();
        commit_reset(&scene, id, TestPayload::nonspatial());
        assert!(scene.in_nonspatial_set(id));

        let bound = unit_bound(-3.0);
        let mut txn = Transaction::new();
        txn.update_item(
            id,
            Box::new(move |payload| {
                if let Some(payload) = payload.as_any_mut().downcast_mut::<TestPayload>() {
                    payload.key = ItemKey::SPATIAL;
                    payload.bound = bound;
                }
            }),
        );
        scene.enqueue_transaction(txn);
        scene.process_transaction_queue();

        assert!(scene.in_spatial_index(id));
        assert!(!scene.in_nonspatial_set(id));
    }

    #[test]
    fn test_every_live_item_classified_exactly_once() {
        let scene = Scene::new();
        let spatial_id = scene.allocate_id();
        let nonspatial_id = scene.allocate_id();

        let mut txn = Transaction::new();
        txn.reset_item(spatial_id, TestPayload::spatial(unit_bound(0.0)).boxed());
        txn.reset_item(nonspatial_id, TestPayload::nonspatial().boxed());
        scene.enqueue_transaction(txn);
        scene.process_transaction_queue();

        for id in [spatial_id, nonspatial_id] {
            let spatial = scene.in_spatial_index(id);
            let nonspatial = scene.in_nonspatial_set(id);
            assert!(spatial ^ nonspatial, "item {id} must live in exactly one container");
            assert_eq!(scene.item_key(id).unwrap().is_spatial(), spatial);
        }
        assert_eq!(scene.spatial_item_count(), 1);
        assert_eq!(scene.nonspatial_item_count(), 1);
    }

    #[test]
    fn test_remove_is_idempotent_across_commits() {
        let scene = Scene::new();
        let id = scene.allocate_id();
        commit_reset(&scene, id, TestPayload::spatial(unit_bound(1.0)));

        let mut txn = Transaction::new();
        txn.remove_item(id);
        scene.enqueue_transaction(txn);
        scene.process_transaction_queue();

        assert!(!scene.in_spatial_index(id));
        assert!(!scene.in_nonspatial_set(id));
        assert!(scene.item_key(id).unwrap().is_empty());

        // A second remove of the same id must leave the same observable state
        let mut txn = Transaction::new();
        txn.remove_item(id);
        scene.enqueue_transaction(txn);
        scene.process_transaction_queue();

        assert!(!scene.in_spatial_index(id));
        assert!(!scene.in_nonspatial_set(id));
        assert!(scene.item_key(id).unwrap().is_empty());
        assert_eq!(scene.spatial_item_count(), 0);
        assert_eq!(scene.nonspatial_item_count(), 0);
    }

    #[test]
    fn test_remove_deregisters_transition() {
        let scene = Scene::new();
        let id = scene.allocate_id();
        commit_reset(&scene, id, TestPayload::nonspatial());

        let mut txn = Transaction::new();
        txn.add_transition_to_item(id, TransitionType::ElementEnter, INVALID_ITEM_ID);
        scene.enqueue_transaction(txn);
        scene.process_transaction_queue();
        assert_eq!(transition_stage(&scene).transition_count(), 1);

        let mut txn = Transaction::new();
        txn.remove_item(id);
        scene.enqueue_transaction(txn);
        scene.process_transaction_queue();
        assert_eq!(transition_stage(&scene).transition_count(), 0);
        assert!(scene.item_transition(id).is_none());
    }

    #[test]
    fn test_second_transition_descriptor_wins() {
        let scene = Scene::new();
        let id = scene.allocate_id();
        commit_reset(&scene, id, TestPayload::nonspatial());

        let mut first = Transaction::new();
        first.add_transition_to_item(id, TransitionType::ElementEnter, INVALID_ITEM_ID);
        let mut second = Transaction::new();
        second.add_transition_to_item(id, TransitionType::ElementLeave, INVALID_ITEM_ID);
        scene.enqueue_transaction(first);
        scene.enqueue_transaction(second);
        scene.process_transaction_queue();

        let stage = transition_stage(&scene);
        assert_eq!(stage.transition_count(), 1);
        let transition = stage.transition(scene.item_transition(id).unwrap()).unwrap();
        assert_eq!(transition.transition_type, TransitionType::ElementLeave);
    }

    #[test]
    fn test_transition_propagates_to_sub_items() {
        let scene = Scene::new();
        let parent = scene.allocate_id();
        let child = scene.allocate_id();
        let grandchild = scene.allocate_id();

        let mut txn = Transaction::new();
        txn.reset_item(
            parent,
            TestPayload::nonspatial().with_sub_items(vec![child]).boxed(),
        );
        txn.reset_item(
            child,
            TestPayload::nonspatial().with_sub_items(vec![grandchild]).boxed(),
        );
        txn.reset_item(grandchild, TestPayload::nonspatial().boxed());
        scene.enqueue_transaction(txn);
        scene.process_transaction_queue();

        let mut txn = Transaction::new();
        txn.add_transition_to_item(parent, TransitionType::UserEnter, INVALID_ITEM_ID);
        scene.enqueue_transaction(txn);
        scene.process_transaction_queue();

        let transition = scene.item_transition(parent);
        assert!(transition.is_some());
        assert_eq!(scene.item_transition(child), transition);
        assert_eq!(scene.item_transition(grandchild), transition);

        // Removing the transition clears the whole sub-tree
        let mut txn = Transaction::new();
        txn.remove_transition_from_item(parent);
        scene.enqueue_transaction(txn);
        scene.process_transaction_queue();

        assert!(scene.item_transition(parent).is_none());
        assert!(scene.item_transition(child).is_none());
        assert!(scene.item_transition(grandchild).is_none());
        assert_eq!(transition_stage(&scene).transition_count(), 0);
    }

    #[test]
    fn test_cyclic_sub_items_terminate() {
        let scene = Scene::new();
        let a = scene.allocate_id();
        let b = scene.allocate_id();

        let mut txn = Transaction::new();
        txn.reset_item(a, TestPayload::nonspatial().with_sub_items(vec![b]).boxed());
        txn.reset_item(b, TestPayload::nonspatial().with_sub_items(vec![a]).boxed());
        scene.enqueue_transaction(txn);
        scene.process_transaction_queue();

        let mut txn = Transaction::new();
        txn.add_transition_to_item(a, TransitionType::AvatarChange, INVALID_ITEM_ID);
        scene.enqueue_transaction(txn);
        scene.process_transaction_queue();

        let transition = scene.item_transition(a);
        assert!(transition.is_some());
        assert_eq!(scene.item_transition(b), transition);
    }

    #[test]
    fn test_transition_on_item_removed_earlier_in_batch() {
        let scene = Scene::new();
        let id = scene.allocate_id();
        commit_reset(&scene, id, TestPayload::nonspatial());

        // Remove and transition merged into one consolidated batch; the
        // remove applies first, so the descriptor lands on a dead item
        let mut remove = Transaction::new();
        remove.remove_item(id);
        let mut transition = Transaction::new();
        transition.add_transition_to_item(id, TransitionType::ElementLeave, INVALID_ITEM_ID);
        scene.enqueue_transaction(remove);
        scene.enqueue_transaction(transition);
        scene.process_transaction_queue();

        assert_eq!(transition_stage(&scene).transition_count(), 0);
        assert!(scene.item_transition(id).is_none());
    }

    #[test]
    fn test_selection_last_writer_wins() {
        let scene = Scene::new();

        let mut txn = Transaction::new();
        txn.reset_selection(Selection::new("highlight", vec![1, 2]));
        txn.reset_selection(Selection::new("highlight", vec![3]));
        scene.enqueue_transaction(txn);
        scene.process_transaction_queue();

        assert_eq!(scene.get_selection("highlight").items(), &[3]);
        assert!(scene.get_selection("missing").is_empty());
    }

    #[test]
    fn test_bulk_selection_reset() {
        let scene = Scene::new();
        scene.reset_selections(vec![
            Selection::new("a", vec![1]),
            Selection::new("b", vec![2]),
        ]);
        assert_eq!(scene.get_selection("a").items(), &[1]);
        assert_eq!(scene.get_selection("b").items(), &[2]);
    }

    #[test]
    fn test_stage_registry_replace_and_miss() {
        let scene = Scene::new();
        assert!(scene.get_stage("missing").is_none());
        assert!(scene.get_stage(TransitionStage::NAME).is_some());

        let replacement = Arc::new(TransitionStage::new());
        replacement.add_transition(1, TransitionType::ElementEnter, INVALID_ITEM_ID);
        scene.reset_stage(TransitionStage::NAME, replacement);
        assert_eq!(transition_stage(&scene).transition_count(), 1);
    }

    #[test]
    fn test_multi_producer_enqueue() {
        let scene = Arc::new(Scene::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let scene = Arc::clone(&scene);
            handles.push(std::thread::spawn(move || {
                for _ in 0..8 {
                    let id = scene.allocate_id();
                    let mut txn = Transaction::new();
                    txn.reset_item(id, TestPayload::nonspatial().boxed());
                    scene.enqueue_transaction(txn);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        scene.process_transaction_queue();

        assert_eq!(scene.nonspatial_item_count(), 32);
        for id in 1..=32 {
            assert!(scene.is_allocated_id(id));
        }
    }
}
