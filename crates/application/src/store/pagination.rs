//! Keyed pagination state map.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use riptide_domain::{FetchOptions, FetchPlan, ListEvent, ListKey, PaginationState, plan_fetch};

/// The map from pagination key to that key's fetch-lifecycle state.
///
/// All mutation goes through [`Self::try_begin`] and [`Self::apply`], both of
/// which hold the write lock for the whole transition, so the plan decision
/// and the loading-flag flip are atomic: two interleaved fetches for the
/// same key can never both dispatch.
#[derive(Debug, Clone, Default)]
pub struct PaginationMap {
    states: Arc<RwLock<HashMap<ListKey, PaginationState>>>,
}

impl PaginationMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides whether a fetch should be dispatched for `key` and, if so,
    /// marks the key loading and returns the plan.
    pub async fn try_begin(
        &self,
        key: &str,
        options: &FetchOptions,
        now: DateTime<Utc>,
    ) -> Option<FetchPlan> {
        let mut states = self.states.write().await;
        let state = states.entry(key.to_string()).or_default();
        let plan = plan_fetch(state, options, now)?;
        state.apply(&ListEvent::Requested {
            page_fetched: plan.page_fetched,
            reset: plan.reset,
            generation: plan.generation,
        });
        Some(plan)
    }

    /// Folds a completion event into `key`'s state.
    pub async fn apply(&self, key: &str, event: &ListEvent) {
        let mut states = self.states.write().await;
        states.entry(key.to_string()).or_default().apply(event);
    }

    /// Snapshot of one key's state.
    pub async fn get(&self, key: &str) -> Option<PaginationState> {
        let states = self.states.read().await;
        states.get(key).cloned()
    }

    /// Drops one key's state.
    pub async fn remove(&self, key: &str) {
        let mut states = self.states.write().await;
        states.remove(key);
    }

    /// Drops all pagination state.
    pub async fn clear(&self) {
        let mut states = self.states.write().await;
        states.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use riptide_domain::{PageFetched, PageOutcome};

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_try_begin_marks_key_loading() {
        let map = PaginationMap::new();
        let plan = map
            .try_begin("feed", &FetchOptions::reset(), at(0))
            .await
            .unwrap();
        assert_eq!(plan.page_fetched, PageFetched::First);

        let state = map.get("feed").await.unwrap();
        assert!(state.is_loading);
        assert_eq!(state.generation, plan.generation);
    }

    #[tokio::test]
    async fn test_second_begin_while_loading_is_refused() {
        let map = PaginationMap::new();
        map.try_begin("feed", &FetchOptions::reset(), at(0))
            .await
            .unwrap();

        assert!(
            map.try_begin("feed", &FetchOptions::reset(), at(0))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let map = PaginationMap::new();
        map.try_begin("feed", &FetchOptions::reset(), at(0))
            .await
            .unwrap();

        assert!(
            map.try_begin("bookmarks", &FetchOptions::reset(), at(0))
                .await
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_apply_success_round_trip() {
        let map = PaginationMap::new();
        let plan = map
            .try_begin("feed", &FetchOptions::reset(), at(0))
            .await
            .unwrap();

        map.apply(
            "feed",
            &ListEvent::Succeeded {
                page_fetched: plan.page_fetched,
                outcome: PageOutcome {
                    ids: vec!["a".to_string()],
                    next_page_key: None,
                    prev_page_key: None,
                    total_count: 1,
                    page_size: 20,
                    collection: Some("articles".to_string()),
                },
                generation: plan.generation,
                fetched_at: at(5),
            },
        )
        .await;

        let state = map.get("feed").await.unwrap();
        assert!(!state.is_loading);
        assert_eq!(state.ids, vec!["a".to_string()]);
        assert_eq!(state.collection.as_deref(), Some("articles"));
    }
}
