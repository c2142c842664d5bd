//! Request orchestration: dispatch → transform → normalize → commit.
//!
//! The orchestrator turns one planned list fetch into a [`FetchedPage`]: it
//! calls the API client, runs the descriptor's transform pipeline over the
//! payload, normalizes the result into the entity store, and carries the
//! server's pagination envelope through. Entity writes happen only after
//! every transform and the normalization succeeded, so a failing step never
//! commits a partial page.

use std::sync::Arc;

use serde_json::Value;

use riptide_domain::{
    DEFAULT_PAGE_SIZE, EntityId, HttpMethod, ListKey, PageFetched, Schema, normalize,
};

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::ports::Clock;
use crate::store::EntityStore;

/// One total mapping applied to a payload value.
pub type TransformStep = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// Ordered transform pipeline applied to fetched payloads.
///
/// Steps run in a fixed order: the `before` mapping on the raw payload,
/// then the element-wise `each` transform, then the `after` mapping. Any
/// step may be absent.
#[derive(Clone, Default)]
pub struct TransformPipeline {
    before: Option<TransformStep>,
    each: Option<TransformStep>,
    after: Option<TransformStep>,
}

impl TransformPipeline {
    /// Creates an empty (identity) pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the mapping applied to the raw payload before anything else.
    #[must_use]
    pub fn with_before(
        mut self,
        step: impl Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.before = Some(Arc::new(step));
        self
    }

    /// Sets the transform applied to each element of the item list (or to
    /// the whole payload when it is not a list).
    #[must_use]
    pub fn with_each(
        mut self,
        step: impl Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.each = Some(Arc::new(step));
        self
    }

    /// Sets the mapping applied after the element-wise transform.
    #[must_use]
    pub fn with_after(
        mut self,
        step: impl Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.after = Some(Arc::new(step));
        self
    }

    fn apply_before(&self, value: Value) -> Result<Value, String> {
        match &self.before {
            Some(step) => step(value),
            None => Ok(value),
        }
    }

    fn apply_each(&self, value: Value) -> Result<Value, String> {
        let Some(each) = &self.each else {
            return Ok(value);
        };
        match value {
            Value::Array(elements) => elements
                .into_iter()
                .map(|element| each(element))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => each(other),
        }
    }

    fn apply_after(&self, value: Value) -> Result<Value, String> {
        match &self.after {
            Some(step) => step(value),
            None => Ok(value),
        }
    }
}

impl std::fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("before", &self.before.is_some())
            .field("each", &self.each.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}

/// Static description of one paginated resource.
#[derive(Debug, Clone)]
pub struct ListDescriptor {
    /// Endpoint path, e.g. `"/articles"`.
    pub endpoint: String,
    /// HTTP verb, GET unless overridden.
    pub method: HttpMethod,
    /// Normalization schema; absent for unnormalized fetches.
    pub schema: Option<Schema>,
    /// Transform pipeline applied to the payload.
    pub transforms: TransformPipeline,
    /// Whether the endpoint requires a bearer token.
    pub requires_auth: bool,
    /// Page size requested from the server.
    pub page_size: u32,
}

impl ListDescriptor {
    /// Creates a descriptor for an authenticated GET endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: HttpMethod::Get,
            schema: None,
            transforms: TransformPipeline::new(),
            requires_auth: true,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the normalization schema.
    #[must_use]
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Sets the transform pipeline.
    #[must_use]
    pub fn with_transforms(mut self, transforms: TransformPipeline) -> Self {
        self.transforms = transforms;
        self
    }

    /// Overrides the page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Marks the endpoint as accessible without credentials.
    #[must_use]
    pub const fn anonymous(mut self) -> Self {
        self.requires_auth = false;
        self
    }
}

/// Metadata accompanying one fetch through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMeta {
    /// Pagination key the fetch belongs to.
    pub key: ListKey,
    /// Which page of the window is being fetched.
    pub page_fetched: PageFetched,
    /// Page size the fetch was issued with.
    pub page_size: u32,
    /// Whether the fetch replaces the loaded window.
    pub reset: bool,
    /// Generation stamped at dispatch.
    pub generation: u64,
}

/// Result of one successful list fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Identifiers of the fetched page, in server order.
    pub ids: Vec<EntityId>,
    /// Cursor for the page after the fetched one.
    pub next_page_key: Option<String>,
    /// Cursor for the page before the fetched one.
    pub prev_page_key: Option<String>,
    /// Server-reported total, falling back to the page's record count.
    pub total_count: u64,
    /// Collection the ids refer to, when a schema was applied.
    pub collection: Option<String>,
}

/// Pagination envelope split off a raw list payload.
struct ListEnvelope {
    items: Value,
    next_page_key: Option<String>,
    prev_page_key: Option<String>,
    total_count: Option<u64>,
}

impl ListEnvelope {
    /// Splits `{ items, nextPageKey, prevPageKey, totalCount }` envelopes;
    /// any other payload passes through as the item list with no cursors.
    fn split(value: Value) -> Self {
        match value {
            Value::Object(mut fields) if fields.contains_key("items") => {
                let items = fields.remove("items").unwrap_or(Value::Null);
                Self {
                    items,
                    next_page_key: fields.get("nextPageKey").and_then(cursor_of),
                    prev_page_key: fields.get("prevPageKey").and_then(cursor_of),
                    total_count: fields.get("totalCount").and_then(Value::as_u64),
                }
            }
            other => Self {
                items: other,
                next_page_key: None,
                prev_page_key: None,
                total_count: None,
            },
        }
    }
}

fn cursor_of(value: &Value) -> Option<String> {
    match value {
        Value::String(cursor) => Some(cursor.clone()),
        _ => None,
    }
}

/// Executes planned fetches against the API and commits their entities.
pub struct RequestOrchestrator {
    client: Arc<ApiClient>,
    entities: EntityStore,
    clock: Arc<dyn Clock>,
}

impl RequestOrchestrator {
    /// Creates an orchestrator writing into `entities`.
    #[must_use]
    pub fn new(client: Arc<ApiClient>, entities: EntityStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            entities,
            clock,
        }
    }

    /// The entity store this orchestrator commits into.
    #[must_use]
    pub const fn entities(&self) -> &EntityStore {
        &self.entities
    }

    /// Runs one fetch through the full pipeline.
    ///
    /// # Errors
    ///
    /// Any client, transform or normalization failure fails the whole call;
    /// nothing is committed to the entity store in that case.
    pub async fn execute(
        &self,
        descriptor: &ListDescriptor,
        query: Option<&str>,
        body: Option<Value>,
        meta: &FetchMeta,
    ) -> ApiResult<FetchedPage> {
        tracing::debug!(
            key = %meta.key,
            endpoint = %descriptor.endpoint,
            page = ?meta.page_fetched,
            "list request dispatched"
        );

        let result = self.run(descriptor, query, body).await;
        match &result {
            Ok(page) => {
                tracing::debug!(key = %meta.key, count = page.ids.len(), "list request succeeded");
            }
            Err(error) => {
                tracing::warn!(key = %meta.key, %error, "list request failed");
            }
        }
        result
    }

    async fn run(
        &self,
        descriptor: &ListDescriptor,
        query: Option<&str>,
        body: Option<Value>,
    ) -> ApiResult<FetchedPage> {
        let payload = self
            .client
            .request(
                descriptor.method,
                &descriptor.endpoint,
                query,
                body,
                descriptor.requires_auth,
            )
            .await?;
        let raw = payload.into_json()?;

        let value = descriptor
            .transforms
            .apply_before(raw)
            .map_err(ApiError::Transform)?;
        let envelope = ListEnvelope::split(value);
        let items = descriptor
            .transforms
            .apply_each(envelope.items)
            .map_err(ApiError::Transform)?;
        let items = descriptor
            .transforms
            .apply_after(items)
            .map_err(ApiError::Transform)?;

        let (ids, collection) = match &descriptor.schema {
            Some(schema) => {
                let normalized = normalize(&items, schema, self.clock.now())?;
                let ids = normalized.result.ids();
                // Commit point: everything before this line is fallible.
                self.entities.upsert_all(normalized.entities).await;
                (ids, Some(schema.collection.clone()))
            }
            None => (Vec::new(), None),
        };

        let total_count = envelope.total_count.unwrap_or(ids.len() as u64);
        Ok(FetchedPage {
            ids,
            next_page_key: envelope.next_page_key,
            prev_page_key: envelope.prev_page_key,
            total_count,
            collection,
        })
    }
}
