//! Spatial index interface and simple implementation
//!
//! Provides the pluggable spatial acceleration structure used to classify
//! scene items by bounding volume. The scene only depends on the
//! [`SpatialIndex`] trait; the default [`FlatCellIndex`] performs linear
//! queries and can be replaced with an octree or grid without changing
//! the API.

use slotmap::{new_key_type, SlotMap};

use crate::foundation::math::Vec3;
use crate::scene::{ItemId, ItemKey};

new_key_type! {
    /// Handle into the spatial index locating an item's bounding volume
    pub struct CellId;
}

/// Axis-Aligned Bounding Box for spatial classification and queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB fully contains another AABB
    pub fn contains(&self, other: &Aabb) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Vec3::zeros(), Vec3::zeros())
    }
}

/// Trait for spatial data structures used to classify scene items
///
/// Mutations are only performed by the scene consumer thread under the
/// item-store lock; implementations do not need internal synchronization.
pub trait SpatialIndex: Send {
    /// Insert an item, or relocate it when `old_cell` refers to a previous
    /// placement. Returns the cell the item now occupies.
    fn reset_item(
        &mut self,
        old_cell: Option<CellId>,
        old_key: ItemKey,
        bound: Aabb,
        id: ItemId,
        new_key: ItemKey,
    ) -> CellId;

    /// Remove an item from its cell
    fn remove_item(&mut self, cell: Option<CellId>, key: ItemKey, id: ItemId);

    /// Check whether an item is present in the index
    fn contains(&self, id: ItemId) -> bool;

    /// Bounding volume covered by a cell, if the cell is live
    fn cell_bound(&self, cell: CellId) -> Option<Aabb>;

    /// Total number of items in the index
    fn item_count(&self) -> usize;

    /// Query all items whose bounds intersect the given volume
    fn query_bound(&self, bound: &Aabb) -> Vec<ItemId>;
}

#[derive(Debug, Clone, Copy)]
struct CellEntry {
    id: ItemId,
    bound: Aabb,
}

/// Simple flat spatial index (no hierarchical partitioning)
///
/// Every item gets its own cell and queries are linear scans. Sufficient
/// for small scenes; a tree-based index can be plugged in behind
/// [`SpatialIndex`] later without changing the scene.
#[derive(Debug, Default)]
pub struct FlatCellIndex {
    cells: SlotMap<CellId, CellEntry>,
}

impl FlatCellIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpatialIndex for FlatCellIndex {
    fn reset_item(
        &mut self,
        old_cell: Option<CellId>,
        _old_key: ItemKey,
        bound: Aabb,
        id: ItemId,
        _new_key: ItemKey,
    ) -> CellId {
        if let Some(cell) = old_cell {
            if let Some(entry) = self.cells.get_mut(cell) {
                entry.id = id;
                entry.bound = bound;
                return cell;
            }
        }
        self.cells.insert(CellEntry { id, bound })
    }

    fn remove_item(&mut self, cell: Option<CellId>, _key: ItemKey, id: ItemId) {
        if let Some(cell) = cell {
            if self.cells.remove(cell).is_some() {
                return;
            }
        }
        // Stale or missing cell handle, fall back to a scan
        self.cells.retain(|_, entry| entry.id != id);
    }

    fn contains(&self, id: ItemId) -> bool {
        self.cells.values().any(|entry| entry.id == id)
    }

    fn cell_bound(&self, cell: CellId) -> Option<Aabb> {
        self.cells.get(cell).map(|entry| entry.bound)
    }

    fn item_count(&self) -> usize {
        self.cells.len()
    }

    fn query_bound(&self, bound: &Aabb) -> Vec<ItemId> {
        self.cells
            .values()
            .filter(|entry| entry.bound.intersects(bound))
            .map(|entry| entry.id)
            .collect()
    }
}
