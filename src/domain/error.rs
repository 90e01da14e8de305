use super::{BucketId, ItemId};
use thiserror::Error;

/// Business-rule violations raised by the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The target bucket already holds `size` items.
    #[error("Bucket with id {0} is full.")]
    BucketFull(BucketId),
    #[error("bucket `{0}` is not loaded")]
    UnknownBucket(BucketId),
    #[error("item `{0}` is not loaded")]
    UnknownItem(ItemId),
}

pub type DomainResult<T> = Result<T, DomainError>;
