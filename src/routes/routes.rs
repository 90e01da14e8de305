//! Defines routes for all bucket and item operations.
//!
//! ## Structure
//! - **Bucket endpoints**
//!   - `GET    /buckets` — list buckets (supports max-keys, continuation-token)
//!   - `POST   /buckets` — create bucket
//!   - `GET    /buckets/{id}` — bucket with its items
//!   - `PUT    /buckets/{id}` — update name, description, size
//!   - `DELETE /buckets/{id}` — delete bucket, detaching its items
//!   - `GET    /buckets/{id}/items` — items in membership order
//!
//! - **Item endpoints**
//!   - `GET    /items` — list items (optionally by bucket-id)
//!   - `POST   /items` — create item, optionally inside a bucket
//!   - `GET    /items/{id}` — fetch item
//!   - `PUT    /items/{id}` — update name, description
//!   - `PUT    /items/{id}/bucket` — move item between buckets (409 when full)
//!   - `DELETE /items/{id}` — delete item

use crate::{
    handlers::{
        bucket_handlers::{
            create_bucket, delete_bucket, get_bucket, list_bucket_items, list_buckets,
            update_bucket,
        },
        health_handlers::{healthz, readyz},
        item_handlers::{
            assign_bucket, create_item, delete_item, get_item, list_items, update_item,
        },
    },
    services::bucket_service::BucketService,
};
use axum::{
    Router,
    routing::{get, put},
};

/// Build and return the router for all routes.
///
/// The router carries shared state (`BucketService`) to all handlers.
pub fn routes() -> Router<BucketService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Bucket routes
        .route("/buckets", get(list_buckets).post(create_bucket))
        .route(
            "/buckets/{id}",
            get(get_bucket).put(update_bucket).delete(delete_bucket),
        )
        .route("/buckets/{id}/items", get(list_bucket_items))
        // Item routes
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/items/{id}/bucket", put(assign_bucket))
}
