//! HTTP handlers for bucket operations.

use crate::{
    domain::BucketId,
    errors::AppError,
    handlers::pagination::{ListQuery, into_page},
    services::bucket_service::{BucketChanges, BucketService, NewBucket},
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

/// `GET /buckets` — list buckets by id, supports ?max-keys=&continuation-token=
pub async fn list_buckets(
    State(service): State<BucketService>,
    q: Result<Query<ListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(q) = q?;
    let listing = service.list_buckets(q.after()?, q.max_keys()).await?;
    Ok(Json(into_page(listing)))
}

/// `POST /buckets` — create bucket.
pub async fn create_bucket(
    State(service): State<BucketService>,
    payload: Result<Json<NewBucket>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let details = service.create_bucket(payload).await?;
    let location = format!("/buckets/{}", details.bucket.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(details),
    ))
}

/// `GET /buckets/{id}` — bucket with its items.
pub async fn get_bucket(
    State(service): State<BucketService>,
    Path(id): Path<BucketId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(service.get_bucket(id).await?))
}

/// `PUT /buckets/{id}` — update name, description, size.
pub async fn update_bucket(
    State(service): State<BucketService>,
    Path(id): Path<BucketId>,
    payload: Result<Json<BucketChanges>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    Ok(Json(service.update_bucket(id, payload).await?))
}

/// `DELETE /buckets/{id}` — delete bucket; its items stay, unattached.
pub async fn delete_bucket(
    State(service): State<BucketService>,
    Path(id): Path<BucketId>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_bucket(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /buckets/{id}/items` — members in membership order.
pub async fn list_bucket_items(
    State(service): State<BucketService>,
    Path(id): Path<BucketId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(service.bucket_items(id).await?))
}
