//! Row shape for items.

use crate::domain::{self, BucketId, ItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of the `items` table.
///
/// `position` is the item's index in its bucket's membership order and is
/// `None` while the item is unattached.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub bucket_id: Option<BucketId>,
    #[serde(skip)]
    pub position: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ItemRecord {
    /// Unattached domain entity; membership is restored by the repository.
    pub fn to_domain(&self) -> domain::Item {
        domain::Item::with_details(self.id, self.name.clone(), self.description.clone())
    }
}
