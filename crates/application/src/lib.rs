//! Riptide Application - Sync orchestration
//!
//! This crate ties the domain model to the outside world through ports: the
//! authenticated API client with single-flight credential refresh, the
//! request orchestrator (dispatch → transform → normalize → commit), the
//! pagination controller, the in-memory entity cache, and the read-only
//! selector layer.

pub mod auth;
pub mod client;
pub mod error;
pub mod orchestrator;
pub mod ports;
pub mod select;
pub mod store;
pub mod sync;

pub use auth::{REFRESH_ENDPOINT, RefreshManager, SessionManager};
pub use client::{ApiClient, ApiPayload};
pub use error::{ApiError, ApiResult};
pub use orchestrator::{
    FetchMeta, FetchedPage, ListDescriptor, RequestOrchestrator, TransformPipeline, TransformStep,
};
pub use select::{PageInfo, PageView};
pub use store::{EntityStore, PaginationMap};
pub use sync::{FetchStatus, ListRequest, SyncEngine};
