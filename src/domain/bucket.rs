//! A named container with a maximum capacity.

use super::{BucketId, ItemId};

/// A bucket and the ordered ids of the items it holds.
///
/// `size` gates admission only: lowering it below the current item count
/// keeps every item and simply makes the bucket report full.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bucket {
    id: BucketId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub size: u32,
    items: Vec<ItemId>,
}

impl Bucket {
    pub fn new(id: BucketId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn with_details(
        id: BucketId,
        name: Option<String>,
        description: Option<String>,
        size: u32,
    ) -> Self {
        Self {
            id,
            name,
            description,
            size,
            items: Vec::new(),
        }
    }

    pub fn id(&self) -> BucketId {
        self.id
    }

    /// Member item ids in insertion order.
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.items.contains(&item)
    }

    /// True when the item count has reached (or exceeds) `size`.
    /// A bucket of size 0 is always full.
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.size as usize
    }

    /// Free slots left; zero for a full or over-capacity bucket.
    pub fn remaining_capacity(&self) -> usize {
        (self.size as usize).saturating_sub(self.items.len())
    }

    // Membership is only changed by the graph, which updates the item's
    // back-reference in the same step.
    pub(crate) fn add_item(&mut self, item: ItemId) {
        if !self.contains(item) {
            self.items.push(item);
        }
    }

    pub(crate) fn remove_item(&mut self, item: ItemId) {
        self.items.retain(|id| *id != item);
    }
}
