//! Pagination query-string building.

use crate::error::{DomainError, DomainResult};
use crate::pagination::{FetchPlan, PageFetched};

/// Query parameters for one paginated fetch: the page size, at most one of
/// the `next`/`prev` cursors, and caller-supplied filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    /// Requested page size.
    pub page_size: u32,
    /// Cursor for the page after the loaded window.
    pub next: Option<String>,
    /// Cursor for the page before the loaded window.
    pub prev: Option<String>,
    /// Additional filter parameters, appended in order.
    pub filters: Vec<(String, String)>,
}

impl PageQuery {
    /// Creates a query for `page_size` records.
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Takes the cursor from a fetch plan, placing it on the side the plan's
    /// direction dictates.
    #[must_use]
    pub fn with_plan(mut self, plan: &FetchPlan) -> Self {
        match plan.page_fetched {
            PageFetched::First => {}
            PageFetched::Next => self.next.clone_from(&plan.cursor),
            PageFetched::Previous => self.prev.clone_from(&plan.cursor),
        }
        self
    }

    /// Appends a filter parameter.
    #[must_use]
    pub fn with_filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((name.into(), value.into()));
        self
    }

    /// Encodes the query as a URL query string, without the leading `?`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidQuery`] if a parameter cannot be
    /// percent-encoded.
    pub fn to_query_string(&self) -> DomainResult<String> {
        let mut pairs: Vec<(&str, String)> =
            vec![("page_size", self.page_size.to_string())];
        if let Some(next) = &self.next {
            pairs.push(("next", next.clone()));
        } else if let Some(prev) = &self.prev {
            pairs.push(("prev", prev.clone()));
        }
        for (name, value) in &self.filters {
            pairs.push((name.as_str(), value.clone()));
        }
        serde_urlencoded::to_string(&pairs).map_err(|e| DomainError::InvalidQuery(e.to_string()))
    }
}
