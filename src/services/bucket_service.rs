//! src/services/bucket_service.rs
//!
//! BucketService — request-level operations on buckets and items. Each
//! mutating call runs one load → mutate → save cycle inside a single SQLite
//! transaction: rows are loaded into a [`BucketGraph`], the aggregate enforces
//! the capacity rule, and only then are the touched rows written back. A
//! rejected change drops the transaction, so nothing partial is persisted.

use crate::{
    domain::{BucketGraph, BucketId, DomainError, ItemId},
    models::{
        bucket::BucketDetails, bucket::BucketRecord, item::ItemRecord, page::clamp_max_keys,
    },
    repositories::bucket_repository as repo,
};
use serde::{Deserialize, Deserializer};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

const MAX_TEXT_LEN: usize = 1024;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("bucket `{0}` not found")]
    BucketNotFound(BucketId),
    #[error("item `{0}` not found")]
    ItemNotFound(ItemId),
    #[error("`{field}` invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Body of `POST /buckets`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBucket {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Falls back to the configured default when absent.
    pub size: Option<i64>,
}

/// Body of `PUT /buckets/{id}`. Absent fields are left unchanged; an
/// explicit `null` clears `name` or `description`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BucketChanges {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub size: Option<i64>,
}

/// Body of `POST /items`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewItem {
    pub name: Option<String>,
    pub description: Option<String>,
    pub bucket_id: Option<BucketId>,
}

/// Body of `PUT /items/{id}`. Absent fields are left unchanged; an
/// explicit `null` clears them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemChanges {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
}

/// Marks a field that appeared in the body, so `null` becomes `Some(None)`
/// while a missing field stays `None` through `#[serde(default)]`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// One page of an id-ordered listing.
#[derive(Debug)]
pub struct Listing<T> {
    pub entries: Vec<T>,
    /// Page size actually applied.
    pub max_keys: usize,
    pub is_truncated: bool,
    /// Last id of this page; the next page starts after it.
    pub next_after: Option<i64>,
}

#[derive(Clone)]
pub struct BucketService {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,

    /// Size given to buckets created without one.
    pub default_bucket_size: u32,
}

impl BucketService {
    pub fn new(db: Arc<SqlitePool>, default_bucket_size: u32) -> Self {
        Self {
            db,
            default_bucket_size,
        }
    }

    fn ensure_text_valid(field: &'static str, value: Option<&str>) -> ServiceResult<()> {
        let Some(value) = value else {
            return Ok(());
        };
        if value.len() > MAX_TEXT_LEN {
            return Err(ServiceError::Invalid {
                field,
                reason: format!("must be at most {} bytes", MAX_TEXT_LEN),
            });
        }
        if value.chars().any(|c| c.is_control() && c != '\n' && c != '\t') {
            return Err(ServiceError::Invalid {
                field,
                reason: "must not contain control characters".into(),
            });
        }
        Ok(())
    }

    fn parse_size(size: i64) -> ServiceResult<u32> {
        u32::try_from(size).map_err(|_| ServiceError::Invalid {
            field: "size",
            reason: format!("must be between 0 and {}", u32::MAX),
        })
    }

    /// Load a bucket and all its members into `graph`.
    ///
    /// Returns the bucket row and its member rows in membership order.
    async fn load_bucket(
        conn: &mut SqliteConnection,
        graph: &mut BucketGraph,
        id: BucketId,
    ) -> ServiceResult<(BucketRecord, Vec<ItemRecord>)> {
        let record = repo::fetch_bucket(conn, id)
            .await?
            .ok_or(ServiceError::BucketNotFound(id))?;
        graph.insert_bucket(record.to_domain()?);

        let members = repo::fetch_members(conn, id).await?;
        for member in &members {
            graph.restore_membership(member.to_domain(), id)?;
        }
        Ok((record, members))
    }

    /// Write back the membership of a loaded bucket.
    async fn save_bucket(
        conn: &mut SqliteConnection,
        graph: &BucketGraph,
        id: BucketId,
    ) -> ServiceResult<()> {
        let bucket = graph.bucket(id).ok_or(DomainError::UnknownBucket(id))?;
        repo::save_membership(conn, bucket).await?;
        Ok(())
    }

    pub async fn create_bucket(&self, req: NewBucket) -> ServiceResult<BucketDetails> {
        Self::ensure_text_valid("name", req.name.as_deref())?;
        Self::ensure_text_valid("description", req.description.as_deref())?;
        let size = match req.size {
            Some(size) => Self::parse_size(size)?,
            None => self.default_bucket_size,
        };

        let mut conn = self.db.acquire().await?;
        let record =
            repo::insert_bucket(&mut conn, req.name.as_deref(), req.description.as_deref(), size)
                .await?;
        info!(bucket_id = record.id, size, "created bucket");

        Ok(BucketDetails::new(record, Vec::new(), size == 0))
    }

    pub async fn get_bucket(&self, id: BucketId) -> ServiceResult<BucketDetails> {
        let mut conn = self.db.acquire().await?;
        let mut graph = BucketGraph::new();
        let (record, members) = Self::load_bucket(&mut conn, &mut graph, id).await?;
        let is_full = graph.bucket(id).is_some_and(|b| b.is_full());
        Ok(BucketDetails::new(record, members, is_full))
    }

    /// Members of a bucket in membership order.
    pub async fn bucket_items(&self, id: BucketId) -> ServiceResult<Vec<ItemRecord>> {
        let mut conn = self.db.acquire().await?;
        repo::fetch_bucket(&mut conn, id)
            .await?
            .ok_or(ServiceError::BucketNotFound(id))?;
        Ok(repo::fetch_members(&mut conn, id).await?)
    }

    pub async fn list_buckets(
        &self,
        after: Option<BucketId>,
        max_keys: usize,
    ) -> ServiceResult<Listing<BucketRecord>> {
        let max_keys = clamp_max_keys(max_keys);
        let mut conn = self.db.acquire().await?;
        let rows = repo::list_buckets(&mut conn, after, max_keys + 1).await?;
        Ok(paginate(rows, max_keys, |b| b.id))
    }

    /// Apply attribute changes. Lowering `size` below the current item count
    /// keeps every item; the bucket just stops admitting new ones.
    pub async fn update_bucket(
        &self,
        id: BucketId,
        changes: BucketChanges,
    ) -> ServiceResult<BucketDetails> {
        Self::ensure_text_valid("name", changes.name.as_ref().and_then(|n| n.as_deref()))?;
        Self::ensure_text_valid(
            "description",
            changes.description.as_ref().and_then(|d| d.as_deref()),
        )?;
        let size = changes.size.map(Self::parse_size).transpose()?;

        let mut tx = self.db.begin().await?;
        let mut graph = BucketGraph::new();
        let (_, members) = Self::load_bucket(&mut tx, &mut graph, id).await?;

        let bucket = graph
            .bucket_mut(id)
            .ok_or(DomainError::UnknownBucket(id))?;
        if let Some(name) = changes.name {
            bucket.name = name;
        }
        if let Some(description) = changes.description {
            bucket.description = description;
        }
        if let Some(size) = size {
            bucket.size = size;
            if bucket.len() > size as usize {
                warn!(
                    bucket_id = id,
                    size,
                    items = bucket.len(),
                    "bucket size lowered below its item count; existing items kept"
                );
            }
        }
        let is_full = bucket.is_full();

        let record = repo::update_bucket(&mut tx, bucket)
            .await?
            .ok_or(ServiceError::BucketNotFound(id))?;
        tx.commit().await?;

        Ok(BucketDetails::new(record, members, is_full))
    }

    /// Delete a bucket. Its items survive, unattached.
    pub async fn delete_bucket(&self, id: BucketId) -> ServiceResult<()> {
        let mut tx = self.db.begin().await?;
        let deleted = repo::delete_bucket(&mut tx, id).await?;
        if deleted == 0 {
            return Err(ServiceError::BucketNotFound(id));
        }
        tx.commit().await?;
        info!(bucket_id = id, "deleted bucket");
        Ok(())
    }

    /// Create an item, optionally placing it in a bucket.
    ///
    /// A full target bucket rejects the whole request; the item is not created.
    pub async fn create_item(&self, req: NewItem) -> ServiceResult<ItemRecord> {
        Self::ensure_text_valid("name", req.name.as_deref())?;
        Self::ensure_text_valid("description", req.description.as_deref())?;

        let mut tx = self.db.begin().await?;
        let record =
            repo::insert_item(&mut tx, req.name.as_deref(), req.description.as_deref()).await?;

        let Some(bucket_id) = req.bucket_id else {
            tx.commit().await?;
            info!(item_id = record.id, "created item");
            return Ok(record);
        };

        let mut graph = BucketGraph::new();
        Self::load_bucket(&mut tx, &mut graph, bucket_id).await?;
        graph.insert_item(record.to_domain());
        if let Err(err) = graph.assign(record.id, Some(bucket_id)) {
            if matches!(err, DomainError::BucketFull(_)) {
                warn!(bucket_id, "rejected new item: bucket is full");
            }
            return Err(err.into());
        }
        Self::save_bucket(&mut tx, &graph, bucket_id).await?;

        let record = repo::fetch_item(&mut tx, record.id)
            .await?
            .ok_or(ServiceError::ItemNotFound(record.id))?;
        tx.commit().await?;
        info!(item_id = record.id, bucket_id, "created item");
        Ok(record)
    }

    pub async fn get_item(&self, id: ItemId) -> ServiceResult<ItemRecord> {
        let mut conn = self.db.acquire().await?;
        repo::fetch_item(&mut conn, id)
            .await?
            .ok_or(ServiceError::ItemNotFound(id))
    }

    pub async fn list_items(
        &self,
        bucket: Option<BucketId>,
        after: Option<ItemId>,
        max_keys: usize,
    ) -> ServiceResult<Listing<ItemRecord>> {
        let max_keys = clamp_max_keys(max_keys);
        let mut conn = self.db.acquire().await?;
        let rows = repo::list_items(&mut conn, bucket, after, max_keys + 1).await?;
        Ok(paginate(rows, max_keys, |i| i.id))
    }

    pub async fn update_item(&self, id: ItemId, changes: ItemChanges) -> ServiceResult<ItemRecord> {
        Self::ensure_text_valid("name", changes.name.as_ref().and_then(|n| n.as_deref()))?;
        Self::ensure_text_valid(
            "description",
            changes.description.as_ref().and_then(|d| d.as_deref()),
        )?;

        let mut tx = self.db.begin().await?;
        let mut item = repo::fetch_item(&mut tx, id)
            .await?
            .ok_or(ServiceError::ItemNotFound(id))?
            .to_domain();
        if let Some(name) = changes.name {
            item.name = name;
        }
        if let Some(description) = changes.description {
            item.description = description;
        }

        let record = repo::update_item(&mut tx, &item)
            .await?
            .ok_or(ServiceError::ItemNotFound(id))?;
        tx.commit().await?;
        Ok(record)
    }

    /// Set the item's bucket (`None` detaches it).
    ///
    /// Loads the item's current bucket and the target bucket with all their
    /// members, lets the aggregate decide, and writes both memberships back.
    pub async fn assign_item(
        &self,
        id: ItemId,
        target: Option<BucketId>,
    ) -> ServiceResult<ItemRecord> {
        let mut tx = self.db.begin().await?;
        let record = repo::fetch_item(&mut tx, id)
            .await?
            .ok_or(ServiceError::ItemNotFound(id))?;
        let current = record.bucket_id;
        if current == target {
            return Ok(record);
        }

        let mut graph = BucketGraph::new();
        match current {
            Some(current_id) => {
                Self::load_bucket(&mut tx, &mut graph, current_id).await?;
            }
            None => graph.insert_item(record.to_domain()),
        }
        if let Some(target_id) = target {
            Self::load_bucket(&mut tx, &mut graph, target_id).await?;
        }

        if let Err(err) = graph.assign(id, target) {
            if let DomainError::BucketFull(bucket_id) = err {
                warn!(item_id = id, bucket_id, "rejected move: bucket is full");
            }
            return Err(err.into());
        }

        if let Some(current_id) = current {
            Self::save_bucket(&mut tx, &graph, current_id).await?;
        }
        match target {
            Some(target_id) => Self::save_bucket(&mut tx, &graph, target_id).await?,
            None => repo::detach_item(&mut tx, id).await?,
        }

        let record = repo::fetch_item(&mut tx, id)
            .await?
            .ok_or(ServiceError::ItemNotFound(id))?;
        tx.commit().await?;
        info!(item_id = id, from = ?current, to = ?target, "moved item");
        Ok(record)
    }

    /// Delete an item, closing the gap it leaves in its bucket's order.
    pub async fn delete_item(&self, id: ItemId) -> ServiceResult<()> {
        let mut tx = self.db.begin().await?;
        let record = repo::fetch_item(&mut tx, id)
            .await?
            .ok_or(ServiceError::ItemNotFound(id))?;

        let mut graph = BucketGraph::new();
        if let Some(bucket_id) = record.bucket_id {
            Self::load_bucket(&mut tx, &mut graph, bucket_id).await?;
            graph.remove_item(id);
        }

        if repo::delete_item(&mut tx, id).await? == 0 {
            return Err(ServiceError::ItemNotFound(id));
        }
        if let Some(bucket_id) = record.bucket_id {
            Self::save_bucket(&mut tx, &graph, bucket_id).await?;
        }
        tx.commit().await?;
        info!(item_id = id, "deleted item");
        Ok(())
    }
}

/// Split off the look-ahead row fetched to detect truncation.
fn paginate<T>(mut rows: Vec<T>, max_keys: usize, id: impl Fn(&T) -> i64) -> Listing<T> {
    let is_truncated = rows.len() > max_keys;
    rows.truncate(max_keys);
    let next_after = if is_truncated {
        rows.last().map(&id)
    } else {
        None
    };
    Listing {
        entries: rows,
        max_keys,
        is_truncated,
        next_after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn service() -> BucketService {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        BucketService::new(Arc::new(pool), 10)
    }

    async fn bucket(service: &BucketService, size: i64) -> BucketId {
        service
            .create_bucket(NewBucket {
                size: Some(size),
                ..NewBucket::default()
            })
            .await
            .unwrap()
            .bucket
            .id
    }

    async fn item_in(service: &BucketService, bucket_id: Option<BucketId>) -> ItemId {
        service
            .create_item(NewItem {
                bucket_id,
                ..NewItem::default()
            })
            .await
            .unwrap()
            .id
    }

    fn member_ids(details: &BucketDetails) -> Vec<ItemId> {
        details.items.iter().map(|i| i.id).collect()
    }

    #[tokio::test]
    async fn create_bucket_uses_default_size() {
        let service = service().await;
        let details = service.create_bucket(NewBucket::default()).await.unwrap();
        assert_eq!(details.bucket.size, 10);
        assert!(!details.is_full);
        assert_eq!(details.item_count, 0);
    }

    #[tokio::test]
    async fn negative_size_is_invalid() {
        let service = service().await;
        let err = service
            .create_bucket(NewBucket {
                size: Some(-1),
                ..NewBucket::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid { field: "size", .. }));
    }

    #[tokio::test]
    async fn create_item_into_full_bucket_creates_nothing() {
        let service = service().await;
        let bucket_id = bucket(&service, 1).await;
        item_in(&service, Some(bucket_id)).await;

        let err = service
            .create_item(NewItem {
                name: Some("overflow".into()),
                bucket_id: Some(bucket_id),
                ..NewItem::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::BucketFull(id)) if id == bucket_id
        ));

        let all = service.list_items(None, None, 100).await.unwrap();
        assert_eq!(all.entries.len(), 1);
    }

    #[tokio::test]
    async fn assign_round_trips_membership_order() {
        let service = service().await;
        let bucket_id = bucket(&service, 3).await;
        let a = item_in(&service, None).await;
        let b = item_in(&service, None).await;
        let c = item_in(&service, None).await;

        for id in [c, a, b] {
            service.assign_item(id, Some(bucket_id)).await.unwrap();
        }

        let details = service.get_bucket(bucket_id).await.unwrap();
        assert_eq!(member_ids(&details), vec![c, a, b]);
        assert!(details.is_full);
    }

    #[tokio::test]
    async fn rejected_move_leaves_rows_unchanged() {
        let service = service().await;
        let first = bucket(&service, 1).await;
        let second = bucket(&service, 1).await;
        let a = item_in(&service, Some(first)).await;
        let b = item_in(&service, Some(second)).await;

        let err = service.assign_item(a, Some(second)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::BucketFull(id)) if id == second));

        assert_eq!(service.get_item(a).await.unwrap().bucket_id, Some(first));
        assert_eq!(member_ids(&service.get_bucket(first).await.unwrap()), vec![a]);
        assert_eq!(member_ids(&service.get_bucket(second).await.unwrap()), vec![b]);
    }

    #[tokio::test]
    async fn move_adjusts_both_buckets() {
        let service = service().await;
        let first = bucket(&service, 3).await;
        let second = bucket(&service, 3).await;
        let a = item_in(&service, Some(first)).await;
        let b = item_in(&service, Some(first)).await;

        let moved = service.assign_item(a, Some(second)).await.unwrap();
        assert_eq!(moved.bucket_id, Some(second));

        assert_eq!(member_ids(&service.get_bucket(first).await.unwrap()), vec![b]);
        assert_eq!(member_ids(&service.get_bucket(second).await.unwrap()), vec![a]);
    }

    #[tokio::test]
    async fn reassigning_to_full_current_bucket_is_noop() {
        let service = service().await;
        let bucket_id = bucket(&service, 1).await;
        let a = item_in(&service, Some(bucket_id)).await;

        let record = service.assign_item(a, Some(bucket_id)).await.unwrap();
        assert_eq!(record.bucket_id, Some(bucket_id));
    }

    #[tokio::test]
    async fn explicit_null_clears_text_but_absent_keeps_it() {
        let service = service().await;
        let details = service
            .create_bucket(NewBucket {
                name: Some("x".into()),
                description: Some("shelf".into()),
                size: Some(1),
            })
            .await
            .unwrap();
        let bucket_id = details.bucket.id;

        let changes: BucketChanges = serde_json::from_str(r#"{"name": null}"#).unwrap();
        let updated = service.update_bucket(bucket_id, changes).await.unwrap();
        assert_eq!(updated.bucket.name, None);
        assert_eq!(updated.bucket.description.as_deref(), Some("shelf"));

        let item = service
            .create_item(NewItem {
                name: Some("thing".into()),
                description: Some("blue".into()),
                bucket_id: None,
            })
            .await
            .unwrap();
        let changes: ItemChanges =
            serde_json::from_str(r#"{"description": null}"#).unwrap();
        let updated = service.update_item(item.id, changes).await.unwrap();
        assert_eq!(updated.name.as_deref(), Some("thing"));
        assert_eq!(updated.description, None);
    }

    #[test]
    fn changes_tell_null_from_missing() {
        let changes: BucketChanges =
            serde_json::from_str(r#"{"name": null, "size": 3}"#).unwrap();
        assert_eq!(changes.name, Some(None));
        assert_eq!(changes.description, None);

        let changes: ItemChanges = serde_json::from_str(r#"{"name": "a"}"#).unwrap();
        assert_eq!(changes.name, Some(Some("a".to_string())));
    }

    #[tokio::test]
    async fn oversized_page_request_is_capped() {
        let service = service().await;
        bucket(&service, 1).await;
        let listing = service.list_buckets(None, 50_000).await.unwrap();
        assert_eq!(listing.max_keys, 1000);
        let listing = service.list_items(None, None, 0).await.unwrap();
        assert_eq!(listing.max_keys, 1);
    }

    #[tokio::test]
    async fn shrinking_keeps_items() {
        let service = service().await;
        let bucket_id = bucket(&service, 3).await;
        for _ in 0..3 {
            item_in(&service, Some(bucket_id)).await;
        }

        let details = service
            .update_bucket(
                bucket_id,
                BucketChanges {
                    size: Some(2),
                    ..BucketChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(details.item_count, 3);
        assert!(details.is_full);

        let extra = item_in(&service, None).await;
        assert!(service.assign_item(extra, Some(bucket_id)).await.is_err());
    }

    #[tokio::test]
    async fn detach_and_delete_free_slots() {
        let service = service().await;
        let bucket_id = bucket(&service, 2).await;
        let a = item_in(&service, Some(bucket_id)).await;
        let b = item_in(&service, Some(bucket_id)).await;

        let detached = service.assign_item(a, None).await.unwrap();
        assert_eq!(detached.bucket_id, None);
        service.delete_item(b).await.unwrap();

        let details = service.get_bucket(bucket_id).await.unwrap();
        assert_eq!(details.item_count, 0);
        assert!(matches!(
            service.get_item(b).await,
            Err(ServiceError::ItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn deleting_bucket_detaches_items() {
        let service = service().await;
        let bucket_id = bucket(&service, 2).await;
        let a = item_in(&service, Some(bucket_id)).await;

        service.delete_bucket(bucket_id).await.unwrap();

        assert_eq!(service.get_item(a).await.unwrap().bucket_id, None);
        assert!(matches!(
            service.delete_bucket(bucket_id).await,
            Err(ServiceError::BucketNotFound(_))
        ));
    }

    #[tokio::test]
    async fn listing_pages_by_id() {
        let service = service().await;
        let ids = [
            bucket(&service, 1).await,
            bucket(&service, 1).await,
            bucket(&service, 1).await,
        ];

        let first = service.list_buckets(None, 2).await.unwrap();
        assert!(first.is_truncated);
        assert_eq!(first.next_after, Some(ids[1]));

        let second = service.list_buckets(first.next_after, 2).await.unwrap();
        assert!(!second.is_truncated);
        assert_eq!(second.entries.len(), 1);
        assert_eq!(second.entries[0].id, ids[2]);
    }
}
