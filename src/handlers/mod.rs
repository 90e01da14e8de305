//! HTTP handlers. Each delegates to `BucketService` and maps its errors
//! through `AppError`.

pub mod bucket_handlers;
pub mod health_handlers;
pub mod item_handlers;
pub mod pagination;
