//! Paged listing envelope shared by `GET /buckets` and `GET /items`.

use serde::Serialize;

pub const DEFAULT_MAX_KEYS: usize = 100;
pub const MAX_KEYS_LIMIT: usize = 1000;

/// Page size actually served for a requested `max-keys`.
pub fn clamp_max_keys(requested: usize) -> usize {
    requested.clamp(1, MAX_KEYS_LIMIT)
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub entries: Vec<T>,
    pub max_keys: usize,
    pub key_count: usize,
    pub is_truncated: bool,
    /// Opaque token for the next page; only present when truncated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_continuation_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_stays_within_bounds() {
        assert_eq!(clamp_max_keys(0), 1);
        assert_eq!(clamp_max_keys(DEFAULT_MAX_KEYS), DEFAULT_MAX_KEYS);
        assert_eq!(clamp_max_keys(MAX_KEYS_LIMIT + 1), MAX_KEYS_LIMIT);
    }
}
