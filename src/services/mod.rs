//! Request-level operations over the bucket aggregate.

pub mod bucket_service;
