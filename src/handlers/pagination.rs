//! Continuation-token paging shared by the list endpoints.
//!
//! Tokens are the base64 encoding of the last id on the previous page, so
//! clients treat them as opaque.

use crate::{
    errors::AppError,
    models::page::{DEFAULT_MAX_KEYS, Page, clamp_max_keys},
    services::bucket_service::Listing,
};
use base64::{Engine as _, engine::general_purpose};
use serde::Deserialize;

/// Query params accepted by the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "max-keys")]
    pub max_keys: Option<usize>,
    #[serde(rename = "continuation-token")]
    pub continuation_token: Option<String>,
    /// Only honoured by `GET /items`.
    #[serde(rename = "bucket-id")]
    pub bucket_id: Option<i64>,
}

impl ListQuery {
    pub fn max_keys(&self) -> usize {
        clamp_max_keys(self.max_keys.unwrap_or(DEFAULT_MAX_KEYS))
    }

    /// The id the requested page starts after.
    pub fn after(&self) -> Result<Option<i64>, AppError> {
        self.continuation_token
            .as_deref()
            .map(decode_continuation_token)
            .transpose()
    }
}

pub fn into_page<T>(listing: Listing<T>) -> Page<T> {
    Page {
        key_count: listing.entries.len(),
        entries: listing.entries,
        max_keys: listing.max_keys,
        is_truncated: listing.is_truncated,
        next_continuation_token: listing.next_after.map(encode_continuation_token),
    }
}

pub fn encode_continuation_token(after: i64) -> String {
    general_purpose::STANDARD.encode(after.to_string())
}

pub fn decode_continuation_token(token: &str) -> Result<i64, AppError> {
    general_purpose::STANDARD
        .decode(token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or_else(|| AppError::bad_request(format!("invalid continuation token `{}`", token)))
}
