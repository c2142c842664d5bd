//! Keyed pagination state machine.
//!
//! Every independently tracked list view (a feed, a filtered search, one
//! user's achievements) is identified by an opaque [`ListKey`] and owns one
//! [`PaginationState`]. State changes only through [`PaginationState::apply`]
//! folding a [`ListEvent`], and whether a fetch is issued at all is decided
//! by the pure [`plan_fetch`] function, so every transition is testable
//! without I/O.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::merge::{MergeDirection, merge_ids};

/// Opaque key identifying one independently tracked paginated view,
/// e.g. `"user-42-articles-feed-cat-news"`.
pub type ListKey = String;

/// Age beyond which cached list data is considered stale.
pub const STALE_AFTER_SECONDS: i64 = 5 * 60;

/// Page size used when a descriptor does not override it.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// How cached data interacts with the network on a plain fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
    /// Never touch the network; serve whatever is cached.
    CacheOnly,
    /// Fetch only when the cache is empty or stale.
    #[default]
    CacheFirst,
    /// Always fetch; the UI may keep showing cached data meanwhile.
    CacheAndNetwork,
    /// Always fetch.
    NetworkOnly,
}

/// Caller intent for one `fetch_list` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Replace the loaded window with the first page.
    pub reset: bool,
    /// Load the page after the current window.
    pub fetch_next: bool,
    /// Load the page before the current window.
    pub fetch_previous: bool,
    /// Cache policy applied to plain fetches.
    pub fetch_policy: FetchPolicy,
    /// Fetch unconditionally, even while another fetch is in flight.
    pub force_refresh: bool,
}

impl FetchOptions {
    /// Options for a reset fetch.
    #[must_use]
    pub fn reset() -> Self {
        Self {
            reset: true,
            ..Self::default()
        }
    }

    /// Options for fetching the next page.
    #[must_use]
    pub fn next() -> Self {
        Self {
            fetch_next: true,
            ..Self::default()
        }
    }

    /// Options for fetching the previous page.
    #[must_use]
    pub fn previous() -> Self {
        Self {
            fetch_previous: true,
            ..Self::default()
        }
    }

    /// Options for an unconditional refresh.
    #[must_use]
    pub fn force() -> Self {
        Self {
            force_refresh: true,
            ..Self::default()
        }
    }

    /// Sets the fetch policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }
}

/// Which page of the window a dispatched fetch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFetched {
    /// The first page (initial load, reset, or refresh).
    First,
    /// The page after the loaded window.
    Next,
    /// The page before the loaded window.
    Previous,
}

/// A fetch the planner decided to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    /// Page targeted by this fetch.
    pub page_fetched: PageFetched,
    /// Whether the result replaces the loaded window.
    pub reset: bool,
    /// Cursor to send (`next` or `prev` depending on `page_fetched`).
    pub cursor: Option<String>,
    /// Generation stamped on the dispatch; completions carrying an older
    /// generation are discarded.
    pub generation: u64,
}

/// Fetch-lifecycle state of one pagination key.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationState {
    /// Loaded identifiers in display order, duplicate-free.
    pub ids: Vec<String>,
    /// Last successfully completed page number; 0 before any page landed.
    pub current_page: u32,
    /// Page size negotiated with the server.
    pub page_size: u32,
    /// Cursor for the page after the window; `None` means end of list.
    pub next_page_key: Option<String>,
    /// Cursor for the page before the window.
    pub prev_page_key: Option<String>,
    /// Server-reported total if known.
    pub total_count: u64,
    /// True once a successful fetch came back without a next cursor.
    pub has_reached_end: bool,
    /// True between dispatch and resolution.
    pub is_loading: bool,
    /// Message of the last failure; cleared by the next success.
    pub error: Option<String>,
    /// Wall-clock instant of the last successful fetch.
    pub last_successful_fetch_at: Option<DateTime<Utc>>,
    /// Generation of the fetch currently owning this key.
    pub generation: u64,
    /// Collection the loaded ids refer to, once known.
    pub collection: Option<String>,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            current_page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            next_page_key: None,
            prev_page_key: None,
            total_count: 0,
            has_reached_end: false,
            is_loading: false,
            error: None,
            last_successful_fetch_at: None,
            generation: 0,
            collection: None,
        }
    }
}

/// Successful page payload folded into the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    /// Identifiers of the fetched page, in server order.
    pub ids: Vec<String>,
    /// Cursor for the page after the fetched one.
    pub next_page_key: Option<String>,
    /// Cursor for the page before the fetched one.
    pub prev_page_key: Option<String>,
    /// Server-reported total.
    pub total_count: u64,
    /// Page size this fetch was issued with.
    pub page_size: u32,
    /// Collection the ids refer to, when the fetch was normalized.
    pub collection: Option<String>,
}

/// Everything that can happen to a pagination key.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent {
    /// A fetch was dispatched.
    Requested {
        /// Page targeted by the fetch.
        page_fetched: PageFetched,
        /// Whether the fetch replaces the window.
        reset: bool,
        /// Generation of the dispatch.
        generation: u64,
    },
    /// A fetch resolved successfully.
    Succeeded {
        /// Page targeted by the fetch.
        page_fetched: PageFetched,
        /// The fetched page.
        outcome: PageOutcome,
        /// Generation of the dispatch this resolves.
        generation: u64,
        /// Wall-clock completion instant.
        fetched_at: DateTime<Utc>,
    },
    /// A fetch failed.
    Failed {
        /// Human-readable failure message.
        message: String,
        /// Generation of the dispatch this resolves.
        generation: u64,
    },
}

impl PaginationState {
    /// True when the cached window is older than [`STALE_AFTER_SECONDS`].
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.last_successful_fetch_at
            .is_none_or(|at| now - at > Duration::seconds(STALE_AFTER_SECONDS))
    }

    /// Folds an event into the state.
    ///
    /// Completion events whose generation does not match the one currently
    /// owning the key are discarded: a response landing after the key was
    /// force-refreshed must not overwrite the newer window.
    pub fn apply(&mut self, event: &ListEvent) {
        match event {
            ListEvent::Requested { generation, .. } => {
                self.generation = *generation;
                self.is_loading = true;
            }
            ListEvent::Succeeded {
                page_fetched,
                outcome,
                generation,
                fetched_at,
            } => {
                if *generation != self.generation {
                    return;
                }
                self.is_loading = false;
                self.error = None;
                self.last_successful_fetch_at = Some(*fetched_at);
                self.page_size = outcome.page_size;
                self.total_count = outcome.total_count;
                if outcome.collection.is_some() {
                    self.collection.clone_from(&outcome.collection);
                }
                match page_fetched {
                    PageFetched::First => {
                        self.ids.clone_from(&outcome.ids);
                        self.next_page_key.clone_from(&outcome.next_page_key);
                        self.prev_page_key.clone_from(&outcome.prev_page_key);
                        self.current_page = u32::from(!self.ids.is_empty());
                    }
                    PageFetched::Next => {
                        self.ids = merge_ids(&self.ids, &outcome.ids, MergeDirection::Append);
                        self.next_page_key.clone_from(&outcome.next_page_key);
                        self.current_page += 1;
                    }
                    PageFetched::Previous => {
                        self.ids = merge_ids(&self.ids, &outcome.ids, MergeDirection::Prepend);
                        self.prev_page_key.clone_from(&outcome.prev_page_key);
                    }
                }
                self.has_reached_end = self.next_page_key.is_none();
            }
            ListEvent::Failed {
                message,
                generation,
            } => {
                if *generation != self.generation {
                    return;
                }
                self.is_loading = false;
                self.error = Some(message.clone());
            }
        }
    }
}

/// Decides whether a fetch should be issued for `state` given the caller's
/// `options`, and with which cursor.
///
/// Decision order: force refresh wins unconditionally (as a reset fetch);
/// a fetch while the key is already loading is a no-op; next/previous
/// require their cursor; plain fetches consult the fetch policy, with
/// `CacheFirst` short-circuiting on fresh non-empty data.
#[must_use]
pub fn plan_fetch(
    state: &PaginationState,
    options: &FetchOptions,
    now: DateTime<Utc>,
) -> Option<FetchPlan> {
    let generation = state.generation + 1;

    if options.force_refresh {
        return Some(FetchPlan {
            page_fetched: PageFetched::First,
            reset: true,
            cursor: None,
            generation,
        });
    }

    if state.is_loading {
        return None;
    }

    if options.fetch_next {
        return state.next_page_key.clone().map(|cursor| FetchPlan {
            page_fetched: PageFetched::Next,
            reset: false,
            cursor: Some(cursor),
            generation,
        });
    }

    if options.fetch_previous {
        return state.prev_page_key.clone().map(|cursor| FetchPlan {
            page_fetched: PageFetched::Previous,
            reset: false,
            cursor: Some(cursor),
            generation,
        });
    }

    let first = FetchPlan {
        page_fetched: PageFetched::First,
        reset: options.reset,
        cursor: None,
        generation,
    };
    match options.fetch_policy {
        FetchPolicy::CacheOnly => None,
        FetchPolicy::CacheFirst => {
            if !state.ids.is_empty() && !state.is_stale(now) {
                None
            } else {
                Some(first)
            }
        }
        FetchPolicy::CacheAndNetwork | FetchPolicy::NetworkOnly => Some(first),
    }
}
