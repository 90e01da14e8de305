//! In-memory arena holding one consistency boundary of buckets and items.
//!
//! A request loads the buckets it touches (with all their members) plus the
//! item being moved, mutates the graph, and writes the affected buckets back.

use super::{Bucket, BucketId, DomainError, DomainResult, Item, ItemId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct BucketGraph {
    buckets: BTreeMap<BucketId, Bucket>,
    items: BTreeMap<ItemId, Item>,
}

impl BucketGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bucket to the arena. Any membership it carries is kept as is.
    pub fn insert_bucket(&mut self, bucket: Bucket) {
        self.buckets.insert(bucket.id(), bucket);
    }

    /// Add an item to the arena, unattached.
    pub fn insert_item(&mut self, mut item: Item) {
        item.set_bucket(None);
        self.items.insert(item.id(), item);
    }

    /// Link a persisted item to a persisted bucket without a capacity check.
    ///
    /// Only for reconstituting stored state: a bucket whose size was lowered
    /// may legitimately hold more items than it would admit today.
    pub fn restore_membership(&mut self, mut item: Item, bucket: BucketId) -> DomainResult<()> {
        let target = self
            .buckets
            .get_mut(&bucket)
            .ok_or(DomainError::UnknownBucket(bucket))?;
        target.add_item(item.id());
        item.set_bucket(Some(bucket));
        self.items.insert(item.id(), item);
        Ok(())
    }

    pub fn bucket(&self, id: BucketId) -> Option<&Bucket> {
        self.buckets.get(&id)
    }

    pub fn bucket_mut(&mut self, id: BucketId) -> Option<&mut Bucket> {
        self.buckets.get_mut(&id)
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    /// Members of a bucket in membership order.
    pub fn items_of(&self, bucket: BucketId) -> impl Iterator<Item = &Item> + '_ {
        self.buckets
            .get(&bucket)
            .into_iter()
            .flat_map(|b| b.items().iter())
            .filter_map(|id| self.items.get(id))
    }

    /// Set `item`'s bucket to `target`, updating both sides of the relationship.
    ///
    /// Re-assigning an item to the bucket it already sits in is a no-op, even
    /// when that bucket is full. Admission into a full bucket fails with
    /// [`DomainError::BucketFull`] and leaves the graph untouched; the check runs
    /// before the item leaves its current bucket.
    pub fn assign(&mut self, item: ItemId, target: Option<BucketId>) -> DomainResult<()> {
        let current = self
            .items
            .get(&item)
            .ok_or(DomainError::UnknownItem(item))?
            .bucket();

        if current == target {
            return Ok(());
        }

        if let Some(target_id) = target {
            let bucket = self
                .buckets
                .get(&target_id)
                .ok_or(DomainError::UnknownBucket(target_id))?;
            if !bucket.contains(item) && bucket.is_full() {
                return Err(DomainError::BucketFull(target_id));
            }
        }

        if let Some(current_id) = current {
            if !self.buckets.contains_key(&current_id) {
                return Err(DomainError::UnknownBucket(current_id));
            }
        }

        // Every lookup below is known to succeed.
        if let Some(previous) = current.and_then(|id| self.buckets.get_mut(&id)) {
            previous.remove_item(item);
        }
        if let Some(entry) = self.items.get_mut(&item) {
            entry.set_bucket(target);
        }
        if let Some(next) = target.and_then(|id| self.buckets.get_mut(&id)) {
            next.add_item(item);
        }

        Ok(())
    }

    /// Detach and drop an item.
    pub fn remove_item(&mut self, id: ItemId) -> Option<Item> {
        let item = self.items.remove(&id)?;
        if let Some(bucket) = item.bucket().and_then(|b| self.buckets.get_mut(&b)) {
            bucket.remove_item(id);
        }
        Some(item)
    }

    /// Drop a bucket, leaving its former members loaded but unattached.
    pub fn remove_bucket(&mut self, id: BucketId) -> Option<Bucket> {
        let bucket = self.buckets.remove(&id)?;
        for member in bucket.items() {
            if let Some(item) = self.items.get_mut(member) {
                item.set_bucket(None);
            }
        }
        Some(bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(buckets: &[(BucketId, u32)], items: &[ItemId]) -> BucketGraph {
        let mut graph = BucketGraph::new();
        for (id, size) in buckets {
            graph.insert_bucket(Bucket::with_details(*id, None, None, *size));
        }
        for id in items {
            graph.insert_item(Item::new(*id));
        }
        graph
    }

    fn count(graph: &BucketGraph, bucket: BucketId) -> usize {
        graph.bucket(bucket).map(Bucket::len).unwrap_or_default()
    }

    #[test]
    fn assign_links_both_sides() {
        let mut graph = graph_with(&[(1, 3)], &[10]);
        graph.assign(10, Some(1)).unwrap();

        assert_eq!(graph.item(10).unwrap().bucket(), Some(1));
        assert!(graph.bucket(1).unwrap().contains(10));
    }

    #[test]
    fn assign_none_detaches() {
        let mut graph = graph_with(&[(1, 3)], &[10]);
        graph.assign(10, Some(1)).unwrap();
        graph.assign(10, None).unwrap();

        assert_eq!(graph.item(10).unwrap().bucket(), None);
        assert!(!graph.bucket(1).unwrap().contains(10));
    }

    #[test]
    fn reassigning_same_bucket_is_noop_when_full() {
        let mut graph = graph_with(&[(1, 1)], &[10]);
        graph.assign(10, Some(1)).unwrap();
        assert!(graph.bucket(1).unwrap().is_full());

        assert_eq!(graph.assign(10, Some(1)), Ok(()));
        assert_eq!(graph.bucket(1).unwrap().items(), &[10]);
    }

    #[test]
    fn full_bucket_rejects_new_item() {
        let mut graph = graph_with(&[(1, 2)], &[10, 11, 12]);
        graph.assign(10, Some(1)).unwrap();
        graph.assign(11, Some(1)).unwrap();

        assert_eq!(graph.assign(12, Some(1)), Err(DomainError::BucketFull(1)));
        assert_eq!(count(&graph, 1), 2);
        assert_eq!(graph.item(12).unwrap().bucket(), None);
    }

    #[test]
    fn exact_fit_then_reject() {
        let mut graph = graph_with(&[(1, 3)], &[10, 11, 12, 13]);
        graph.assign(10, Some(1)).unwrap();
        graph.assign(11, Some(1)).unwrap();

        graph.assign(12, Some(1)).unwrap();
        assert_eq!(count(&graph, 1), 3);
        assert_eq!(graph.assign(13, Some(1)), Err(DomainError::BucketFull(1)));
    }

    #[test]
    fn shrinking_size_does_not_evict() {
        let mut graph = graph_with(&[(1, 3)], &[10, 11, 12, 13]);
        for id in [10, 11, 12] {
            graph.assign(id, Some(1)).unwrap();
        }
        graph.bucket_mut(1).unwrap().size = 2;

        let bucket = graph.bucket(1).unwrap();
        assert_eq!(bucket.len(), 3);
        assert!(bucket.is_full());
        assert_eq!(graph.assign(13, Some(1)), Err(DomainError::BucketFull(1)));

        graph.assign(10, None).unwrap();
        graph.assign(11, None).unwrap();
        graph.assign(13, Some(1)).unwrap();
        assert_eq!(graph.bucket(1).unwrap().items(), &[12, 13]);
    }

    #[test]
    fn move_between_full_buckets_is_rejected() {
        let mut graph = graph_with(&[(1, 1), (2, 1)], &[10, 20]);
        graph.assign(10, Some(1)).unwrap();
        graph.assign(20, Some(2)).unwrap();

        assert_eq!(graph.assign(10, Some(2)), Err(DomainError::BucketFull(2)));
        assert_eq!(graph.item(10).unwrap().bucket(), Some(1));
        assert_eq!(graph.bucket(1).unwrap().items(), &[10]);
        assert_eq!(graph.bucket(2).unwrap().items(), &[20]);
    }

    #[test]
    fn move_between_buckets_with_room() {
        let mut graph = graph_with(&[(1, 5), (2, 5)], &[10, 11, 20]);
        graph.assign(10, Some(1)).unwrap();
        graph.assign(11, Some(1)).unwrap();
        graph.assign(20, Some(2)).unwrap();

        graph.assign(10, Some(2)).unwrap();

        assert_eq!(count(&graph, 1), 1);
        assert_eq!(count(&graph, 2), 2);
        assert!(!graph.bucket(1).unwrap().contains(10));
        assert_eq!(graph.bucket(2).unwrap().items(), &[20, 10]);
        assert_eq!(graph.item(10).unwrap().bucket(), Some(2));
    }

    #[test]
    fn size_zero_admits_nothing() {
        let mut graph = graph_with(&[(1, 0)], &[10]);
        assert_eq!(graph.assign(10, Some(1)), Err(DomainError::BucketFull(1)));
    }

    #[test]
    fn unknown_ids_leave_graph_unchanged() {
        let mut graph = graph_with(&[(1, 1)], &[10]);
        assert_eq!(graph.assign(99, Some(1)), Err(DomainError::UnknownItem(99)));
        assert_eq!(graph.assign(10, Some(7)), Err(DomainError::UnknownBucket(7)));
        assert_eq!(graph.item(10).unwrap().bucket(), None);
    }

    #[test]
    fn restore_membership_skips_capacity_check() {
        let mut graph = graph_with(&[(1, 1)], &[]);
        graph.restore_membership(Item::new(10), 1).unwrap();
        graph.restore_membership(Item::new(11), 1).unwrap();

        assert_eq!(graph.bucket(1).unwrap().items(), &[10, 11]);
        assert_eq!(graph.item(11).unwrap().bucket(), Some(1));
        let ids: Vec<_> = graph.items_of(1).map(Item::id).collect();
        assert_eq!(ids, vec![10, 11]);
    }

    #[test]
    fn removing_bucket_detaches_members() {
        let mut graph = graph_with(&[(1, 2)], &[10]);
        graph.assign(10, Some(1)).unwrap();

        graph.remove_bucket(1).unwrap();
        assert_eq!(graph.item(10).unwrap().bucket(), None);
    }

    #[test]
    fn removing_item_frees_a_slot() {
        let mut graph = graph_with(&[(1, 1)], &[10, 11]);
        graph.assign(10, Some(1)).unwrap();

        graph.remove_item(10).unwrap();
        assert!(graph.bucket(1).unwrap().is_empty());
        graph.assign(11, Some(1)).unwrap();
    }
}
