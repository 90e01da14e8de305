//! Bucket/Item CRUD service.
//!
//! Buckets hold a bounded number of Items. The capacity rule lives in
//! [`domain`]; everything else is SQLite persistence and an axum HTTP surface
//! around it.

pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

use axum::Router;
use services::bucket_service::BucketService;
use sqlx::SqlitePool;
use std::sync::Arc;

/// The full router with its state attached.
pub fn app(db: Arc<SqlitePool>, default_bucket_size: u32) -> Router {
    let service = BucketService::new(db, default_bucket_size);
    routes::routes::routes().with_state(service)
}
