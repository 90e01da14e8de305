//! HTTP handlers for item operations.

use crate::{
    domain::{BucketId, ItemId},
    errors::AppError,
    handlers::pagination::{ListQuery, into_page},
    services::bucket_service::{BucketService, ItemChanges, NewItem},
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;

/// Body of `PUT /items/{id}/bucket`. A null or missing `bucket_id` detaches.
#[derive(Debug, Deserialize)]
pub struct AssignBucketReq {
    pub bucket_id: Option<BucketId>,
}

/// `GET /items` — list items by id, optionally filtered with ?bucket-id=
pub async fn list_items(
    State(service): State<BucketService>,
    q: Result<Query<ListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(q) = q?;
    let listing = service
        .list_items(q.bucket_id, q.after()?, q.max_keys())
        .await?;
    Ok(Json(into_page(listing)))
}

/// `POST /items` — create item, optionally inside a bucket.
pub async fn create_item(
    State(service): State<BucketService>,
    payload: Result<Json<NewItem>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let item = service.create_item(payload).await?;
    let location = format!("/items/{}", item.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(item)))
}

/// `GET /items/{id}`
pub async fn get_item(
    State(service): State<BucketService>,
    Path(id): Path<ItemId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(service.get_item(id).await?))
}

/// `PUT /items/{id}` — update name and description.
pub async fn update_item(
    State(service): State<BucketService>,
    Path(id): Path<ItemId>,
    payload: Result<Json<ItemChanges>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    Ok(Json(service.update_item(id, payload).await?))
}

/// `PUT /items/{id}/bucket` — move the item; 409 when the target is full.
pub async fn assign_bucket(
    State(service): State<BucketService>,
    Path(id): Path<ItemId>,
    payload: Result<Json<AssignBucketReq>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    Ok(Json(service.assign_item(id, payload.bucket_id).await?))
}

/// `DELETE /items/{id}`
pub async fn delete_item(
    State(service): State<BucketService>,
    Path(id): Path<ItemId>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
