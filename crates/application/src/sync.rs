//! The pagination controller.
//!
//! [`SyncEngine::fetch_list`] is the single entry point UI code uses to load
//! list data. It consults the pagination state map and the fetch policy to
//! decide whether to hit the network at all, builds the cursor query,
//! delegates to the orchestrator, and folds the result back into the state
//! map. Failures never propagate past this boundary: they land in the key's
//! `error` field and surface through [`SyncEngine::select_page`].

use std::sync::Arc;

use riptide_domain::{FetchOptions, ListEvent, PageOutcome, PageQuery};

use crate::orchestrator::{FetchMeta, ListDescriptor, RequestOrchestrator};
use crate::ports::Clock;
use crate::select::{PageInfo, PageView};
use crate::store::{EntityStore, PaginationMap};

/// Per-call parameters of one `fetch_list` invocation.
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    /// Caller intent: reset, next, previous, policy, force.
    pub options: FetchOptions,
    /// Filter parameters forwarded to the server.
    pub filters: Vec<(String, String)>,
}

impl ListRequest {
    /// Creates a request with the given options and no filters.
    #[must_use]
    pub fn new(options: FetchOptions) -> Self {
        Self {
            options,
            filters: Vec::new(),
        }
    }

    /// Appends a filter parameter.
    #[must_use]
    pub fn with_filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((name.into(), value.into()));
        self
    }
}

/// What a `fetch_list` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    /// The planner decided no network call was needed.
    Skipped,
    /// A page was fetched and folded into the state.
    Fetched,
    /// The fetch failed; the message is also recorded on the key.
    Failed(String),
}

/// The sync core's policy layer, tying the state map, the orchestrator and
/// the clock together.
pub struct SyncEngine {
    orchestrator: RequestOrchestrator,
    pagination: PaginationMap,
    clock: Arc<dyn Clock>,
}

impl SyncEngine {
    /// Creates an engine around an orchestrator.
    #[must_use]
    pub fn new(orchestrator: RequestOrchestrator, clock: Arc<dyn Clock>) -> Self {
        Self {
            orchestrator,
            pagination: PaginationMap::new(),
            clock,
        }
    }

    /// The pagination state map.
    #[must_use]
    pub const fn pagination(&self) -> &PaginationMap {
        &self.pagination
    }

    /// The entity store fetches commit into.
    #[must_use]
    pub const fn entities(&self) -> &EntityStore {
        self.orchestrator.entities()
    }

    /// Fetches list data for `key` according to `request`.
    ///
    /// Whether a network call happens depends on the options and the key's
    /// current state: cursorless next/previous fetches, fetches into fresh
    /// `CacheFirst` data, and fetches while the key is already loading are
    /// no-ops (unless forced).
    pub async fn fetch_list(
        &self,
        key: &str,
        descriptor: &ListDescriptor,
        request: ListRequest,
    ) -> FetchStatus {
        let now = self.clock.now();
        let Some(plan) = self.pagination.try_begin(key, &request.options, now).await else {
            tracing::trace!(key, "fetch skipped");
            return FetchStatus::Skipped;
        };

        let mut query = PageQuery::new(descriptor.page_size).with_plan(&plan);
        for (name, value) in request.filters {
            query = query.with_filter(name, value);
        }
        let meta = FetchMeta {
            key: key.to_string(),
            page_fetched: plan.page_fetched,
            page_size: descriptor.page_size,
            reset: plan.reset,
            generation: plan.generation,
        };

        let result = match query.to_query_string() {
            Ok(query_string) => {
                self.orchestrator
                    .execute(descriptor, Some(&query_string), None, &meta)
                    .await
            }
            Err(error) => Err(error.into()),
        };

        match result {
            Ok(page) => {
                self.pagination
                    .apply(
                        key,
                        &ListEvent::Succeeded {
                            page_fetched: plan.page_fetched,
                            outcome: PageOutcome {
                                ids: page.ids,
                                next_page_key: page.next_page_key,
                                prev_page_key: page.prev_page_key,
                                total_count: page.total_count,
                                page_size: descriptor.page_size,
                                collection: page.collection,
                            },
                            generation: plan.generation,
                            fetched_at: self.clock.now(),
                        },
                    )
                    .await;
                FetchStatus::Fetched
            }
            Err(error) => {
                let message = error.to_string();
                self.pagination
                    .apply(
                        key,
                        &ListEvent::Failed {
                            message: message.clone(),
                            generation: plan.generation,
                        },
                    )
                    .await;
                FetchStatus::Failed(message)
            }
        }
    }

    /// Materializes the accumulated page for `key`: entity records in
    /// display order plus pagination metadata. `None` until the key has
    /// been fetched at least once.
    pub async fn select_page(&self, key: &str) -> Option<PageView> {
        let state = self.pagination.get(key).await?;
        let data = match &state.collection {
            Some(collection) => self.entities().get_many(collection, &state.ids).await,
            None => Vec::new(),
        };
        Some(PageView {
            data,
            pagination: PageInfo::from_state(&state, self.clock.now()),
        })
    }
}
