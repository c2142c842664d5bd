//! Normalized entity records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of a normalized collection, e.g. `"articles"`.
pub type CollectionName = String;

/// Identifier of a single entity within a collection.
pub type EntityId = String;

/// Entities produced by one normalization pass, grouped by collection.
pub type EntityMap = HashMap<CollectionName, HashMap<EntityId, EntityRecord>>;

/// A single normalized record: the opaque domain payload plus the instant it
/// was last fetched from the server.
///
/// The fetch timestamp lives alongside the payload rather than inside it, so
/// the payload stays byte-for-byte what the server sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// The record payload as returned by the API (after transforms).
    pub data: Value,
    /// When this copy of the record was fetched.
    pub last_fetched_at: DateTime<Utc>,
}

impl EntityRecord {
    /// Creates a record stamped with the given fetch time.
    #[must_use]
    pub const fn new(data: Value, last_fetched_at: DateTime<Utc>) -> Self {
        Self {
            data,
            last_fetched_at,
        }
    }
}
