//! Named ordered collections of scene items

use crate::scene::item::ItemId;

/// Named ordered list of item IDs used for grouped operations
///
/// Selections have last-writer-wins semantics: resetting a selection with
/// an existing name replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    name: String,
    items: Vec<ItemId>,
}

impl Selection {
    /// Create a selection over the given items
    pub fn new(name: impl Into<String>, items: Vec<ItemId>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    /// Name of the selection
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Items in selection order
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// Whether the selection holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
