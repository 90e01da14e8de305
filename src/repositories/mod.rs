//! Data access for the bucket aggregate.

pub mod bucket_repository;
