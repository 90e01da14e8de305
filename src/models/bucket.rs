//! Row and response shapes for buckets.

use crate::domain::{self, BucketId};
use crate::models::item::ItemRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of the `buckets` table.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct BucketRecord {
    /// Store-assigned identity.
    pub id: BucketId,

    /// Optional display name.
    pub name: Option<String>,

    /// Optional free-form description.
    pub description: Option<String>,

    /// Maximum number of items the bucket admits.
    pub size: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BucketRecord {
    /// Domain entity without members; the repository restores those.
    ///
    /// A stored size outside `u32` is a decode error rather than a guess.
    pub fn to_domain(&self) -> sqlx::Result<domain::Bucket> {
        let size = u32::try_from(self.size).map_err(|err| sqlx::Error::ColumnDecode {
            index: "size".into(),
            source: Box::new(err),
        })?;
        Ok(domain::Bucket::with_details(
            self.id,
            self.name.clone(),
            self.description.clone(),
            size,
        ))
    }
}

/// A bucket together with its members, as returned by `GET /buckets/{id}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BucketDetails {
    #[serde(flatten)]
    pub bucket: BucketRecord,
    pub item_count: usize,
    pub is_full: bool,
    pub items: Vec<ItemRecord>,
}

impl BucketDetails {
    /// `is_full` comes from the loaded aggregate, not recomputed from rows.
    pub fn new(bucket: BucketRecord, items: Vec<ItemRecord>, is_full: bool) -> Self {
        Self {
            item_count: items.len(),
            is_full,
            bucket,
            items,
        }
    }
}
