//! Persistence rows and response bodies.
//!
//! Rows map to the SQLite tables via `sqlx::FromRow` and serialize as JSON via
//! `serde`; `to_domain` turns them into aggregate entities.

pub mod bucket;
pub mod item;
pub mod page;
