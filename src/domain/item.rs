//! A named unit that belongs to at most one bucket.

use super::{BucketId, ItemId};

/// An item and its back-reference to the containing bucket.
///
/// The back-reference is read-only from outside the aggregate; moving an item
/// goes through [`BucketGraph::assign`](super::BucketGraph::assign).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Item {
    id: ItemId,
    pub name: Option<String>,
    pub description: Option<String>,
    bucket: Option<BucketId>,
}

impl Item {
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn with_details(
        id: ItemId,
        name: Option<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            id,
            name,
            description,
            bucket: None,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    /// The bucket currently holding this item, if any.
    pub fn bucket(&self) -> Option<BucketId> {
        self.bucket
    }

    pub(crate) fn set_bucket(&mut self, bucket: Option<BucketId>) {
        self.bucket = bucket;
    }
}
