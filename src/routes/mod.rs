//! HTTP routing.

pub mod routes;
