//! SQLite persistence for buckets and items.
//!
//! Every function takes a plain connection so callers decide the transaction
//! boundary: pass `&mut tx` for a load/mutate/save cycle or a pooled
//! connection for one-off reads.

use crate::{
    domain::{self, BucketId, ItemId},
    models::{bucket::BucketRecord, item::ItemRecord},
};
use chrono::Utc;
use sqlx::{QueryBuilder, SqliteConnection, sqlite::Sqlite};
use tracing::debug;

const BUCKET_COLUMNS: &str = "id, name, description, size, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, name, description, bucket_id, position, created_at, updated_at";

pub async fn insert_bucket(
    conn: &mut SqliteConnection,
    name: Option<&str>,
    description: Option<&str>,
    size: u32,
) -> sqlx::Result<BucketRecord> {
    let now = Utc::now();
    sqlx::query_as::<_, BucketRecord>(&format!(
        "INSERT INTO buckets (name, description, size, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)
         RETURNING {BUCKET_COLUMNS}"
    ))
    .bind(name)
    .bind(description)
    .bind(i64::from(size))
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
}

pub async fn fetch_bucket(
    conn: &mut SqliteConnection,
    id: BucketId,
) -> sqlx::Result<Option<BucketRecord>> {
    sqlx::query_as::<_, BucketRecord>(&format!(
        "SELECT {BUCKET_COLUMNS} FROM buckets WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
}

/// Buckets ordered by id, strictly after `after` when given.
pub async fn list_buckets(
    conn: &mut SqliteConnection,
    after: Option<BucketId>,
    limit: usize,
) -> sqlx::Result<Vec<BucketRecord>> {
    let mut builder =
        QueryBuilder::<Sqlite>::new(format!("SELECT {BUCKET_COLUMNS} FROM buckets WHERE 1 = 1"));
    if let Some(after) = after {
        builder.push(" AND id > ");
        builder.push_bind(after);
    }
    builder.push(" ORDER BY id ASC LIMIT ");
    builder.push_bind(limit as i64);

    let rows = builder.build_query_as().fetch_all(&mut *conn).await?;
    Ok(rows)
}

/// Write name, description and size. Membership is saved separately.
pub async fn update_bucket(
    conn: &mut SqliteConnection,
    bucket: &domain::Bucket,
) -> sqlx::Result<Option<BucketRecord>> {
    sqlx::query_as::<_, BucketRecord>(&format!(
        "UPDATE buckets SET name = ?, description = ?, size = ?, updated_at = ?
         WHERE id = ?
         RETURNING {BUCKET_COLUMNS}"
    ))
    .bind(bucket.name.as_deref())
    .bind(bucket.description.as_deref())
    .bind(i64::from(bucket.size))
    .bind(Utc::now())
    .bind(bucket.id())
    .fetch_optional(&mut *conn)
    .await
}

/// Delete a bucket row after detaching its members. Returns rows deleted.
pub async fn delete_bucket(conn: &mut SqliteConnection, id: BucketId) -> sqlx::Result<u64> {
    let detached = sqlx::query(
        "UPDATE items SET bucket_id = NULL, position = NULL, updated_at = ? WHERE bucket_id = ?",
    )
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *conn)
    .await?;
    debug!("detached {} items from bucket {}", detached.rows_affected(), id);

    let result = sqlx::query("DELETE FROM buckets WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Members of a bucket in membership order.
pub async fn fetch_members(
    conn: &mut SqliteConnection,
    bucket: BucketId,
) -> sqlx::Result<Vec<ItemRecord>> {
    sqlx::query_as::<_, ItemRecord>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE bucket_id = ? ORDER BY position ASC, id ASC"
    ))
    .bind(bucket)
    .fetch_all(&mut *conn)
    .await
}

/// Persist a bucket's membership list: every member points at the bucket
/// and carries its index as `position`.
///
/// Items that left the bucket are not touched here; the caller writes their
/// new bucket (or detaches them) separately.
pub async fn save_membership(
    conn: &mut SqliteConnection,
    bucket: &domain::Bucket,
) -> sqlx::Result<()> {
    let now = Utc::now();
    for (position, item) in bucket.items().iter().enumerate() {
        sqlx::query("UPDATE items SET bucket_id = ?, position = ?, updated_at = ? WHERE id = ?")
            .bind(bucket.id())
            .bind(position as i64)
            .bind(now)
            .bind(*item)
            .execute(&mut *conn)
            .await?;
    }
    debug!(
        "saved membership of bucket {} ({} items)",
        bucket.id(),
        bucket.len()
    );
    Ok(())
}

pub async fn detach_item(conn: &mut SqliteConnection, id: ItemId) -> sqlx::Result<()> {
    sqlx::query("UPDATE items SET bucket_id = NULL, position = NULL, updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Insert an unattached item.
pub async fn insert_item(
    conn: &mut SqliteConnection,
    name: Option<&str>,
    description: Option<&str>,
) -> sqlx::Result<ItemRecord> {
    let now = Utc::now();
    sqlx::query_as::<_, ItemRecord>(&format!(
        "INSERT INTO items (name, description, bucket_id, position, created_at, updated_at)
         VALUES (?, ?, NULL, NULL, ?, ?)
         RETURNING {ITEM_COLUMNS}"
    ))
    .bind(name)
    .bind(description)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
}

pub async fn fetch_item(
    conn: &mut SqliteConnection,
    id: ItemId,
) -> sqlx::Result<Option<ItemRecord>> {
    sqlx::query_as::<_, ItemRecord>(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Items ordered by id, optionally restricted to one bucket.
pub async fn list_items(
    conn: &mut SqliteConnection,
    bucket: Option<BucketId>,
    after: Option<ItemId>,
    limit: usize,
) -> sqlx::Result<Vec<ItemRecord>> {
    let mut builder =
        QueryBuilder::<Sqlite>::new(format!("SELECT {ITEM_COLUMNS} FROM items WHERE 1 = 1"));
    if let Some(bucket) = bucket {
        builder.push(" AND bucket_id = ");
        builder.push_bind(bucket);
    }
    if let Some(after) = after {
        builder.push(" AND id > ");
        builder.push_bind(after);
    }
    builder.push(" ORDER BY id ASC LIMIT ");
    builder.push_bind(limit as i64);

    let rows = builder.build_query_as().fetch_all(&mut *conn).await?;
    Ok(rows)
}

/// Write name and description. The bucket link is saved through membership.
pub async fn update_item(
    conn: &mut SqliteConnection,
    item: &domain::Item,
) -> sqlx::Result<Option<ItemRecord>> {
    sqlx::query_as::<_, ItemRecord>(&format!(
        "UPDATE items SET name = ?, description = ?, updated_at = ?
         WHERE id = ?
         RETURNING {ITEM_COLUMNS}"
    ))
    .bind(item.name.as_deref())
    .bind(item.description.as_deref())
    .bind(Utc::now())
    .bind(item.id())
    .fetch_optional(&mut *conn)
    .await
}

pub async fn delete_item(conn: &mut SqliteConnection, id: ItemId) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM items WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
