//! Read-only projections over pagination and entity state.

use chrono::{DateTime, Utc};

use riptide_domain::{EntityRecord, PaginationState};

/// UI-facing pagination metadata for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    /// Last successfully completed page number.
    pub current_page: u32,
    /// Page size negotiated with the server.
    pub page_size: u32,
    /// Server-reported total if known.
    pub total_count: u64,
    /// True once the list has no further next page.
    pub has_reached_end: bool,
    /// True while a fetch is in flight.
    pub is_loading: bool,
    /// Human-readable message of the last failure.
    pub error: Option<String>,
    /// True when the cached window is older than the freshness threshold.
    pub is_stale: bool,
}

impl PageInfo {
    /// Projects one pagination state into display metadata.
    #[must_use]
    pub fn from_state(state: &PaginationState, now: DateTime<Utc>) -> Self {
        Self {
            current_page: state.current_page,
            page_size: state.page_size,
            total_count: state.total_count,
            has_reached_end: state.has_reached_end,
            is_loading: state.is_loading,
            error: state.error.clone(),
            is_stale: state.is_stale(now),
        }
    }
}

/// A materialized page: the accumulated entities of a pagination key, in
/// display order, plus its pagination metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    /// Entity records for the loaded ids, in id order. Ids the entity store
    /// no longer holds are skipped.
    pub data: Vec<EntityRecord>,
    /// Pagination metadata.
    pub pagination: PageInfo,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_page_info_projection() {
        let state = PaginationState {
            ids: vec!["a".to_string()],
            current_page: 2,
            total_count: 40,
            has_reached_end: true,
            error: Some("HTTP error 500".to_string()),
            last_successful_fetch_at: Some(DateTime::from_timestamp(0, 0).unwrap()),
            ..PaginationState::default()
        };

        let info = PageInfo::from_state(&state, DateTime::from_timestamp(600, 0).unwrap());

        assert_eq!(info.current_page, 2);
        assert_eq!(info.total_count, 40);
        assert!(info.has_reached_end);
        assert!(!info.is_loading);
        assert_eq!(info.error.as_deref(), Some("HTTP error 500"));
        assert!(info.is_stale);
    }
}
