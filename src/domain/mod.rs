//! Bucket/Item aggregate.
//!
//! Buckets and Items live in a [`BucketGraph`] arena keyed by id. An Item keeps
//! a back-reference to its Bucket and the Bucket keeps the ordered membership
//! list; [`BucketGraph::assign`] is the only way to change either side, so the
//! two always agree.

pub mod bucket;
pub mod error;
pub mod graph;
pub mod item;

pub use bucket::Bucket;
pub use error::{DomainError, DomainResult};
pub use graph::BucketGraph;
pub use item::Item;

/// Identity of a bucket, assigned by the store at creation.
pub type BucketId = i64;

/// Identity of an item, assigned by the store at creation.
pub type ItemId = i64;
