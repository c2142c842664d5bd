//! Riptide Domain - Core sync types
//!
//! This crate defines the domain model for the Riptide sync core: the
//! pagination state machine and its planner, the ordered id-merge algorithm,
//! normalization schemas, credential state, and query building. All types
//! here are pure Rust with no I/O dependencies.

pub mod credentials;
pub mod entity;
pub mod error;
pub mod http;
pub mod merge;
pub mod pagination;
pub mod query;
pub mod schema;

pub use credentials::{Credentials, REFRESH_BUFFER_SECONDS};
pub use entity::{CollectionName, EntityId, EntityMap, EntityRecord};
pub use error::{DomainError, DomainResult};
pub use http::HttpMethod;
pub use merge::{MergeDirection, merge_by_key, merge_ids};
pub use pagination::{
    DEFAULT_PAGE_SIZE, FetchOptions, FetchPlan, FetchPolicy, ListEvent, ListKey, PageFetched,
    PageOutcome, PaginationState, STALE_AFTER_SECONDS, plan_fetch,
};
pub use query::PageQuery;
pub use schema::{NormalizedPayload, NormalizedResult, Relation, Schema, normalize};
