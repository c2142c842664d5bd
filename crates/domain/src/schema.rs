//! Per-collection normalization schemas.
//!
//! A [`Schema`] describes how to flatten a nested API payload into id-keyed
//! entity maps: which collection the records belong to, which field carries
//! the identifier, and which fields hold nested related records that should
//! be extracted into their own collections and replaced by id references.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::entity::{EntityId, EntityMap, EntityRecord};
use crate::error::{DomainError, DomainResult};

/// Describes how records of one collection are normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Collection the normalized records are stored under.
    pub collection: String,
    /// Field carrying the record identifier (`"id"`, `"key"`, ...).
    pub id_field: String,
    /// Fields holding nested related records.
    pub relations: Vec<Relation>,
}

/// A field of a record that embeds records of another collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Field name on the parent record.
    pub field: String,
    /// Schema of the embedded records.
    pub schema: Schema,
}

impl Schema {
    /// Creates a schema with the conventional `"id"` identifier field.
    #[must_use]
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id_field: "id".to_string(),
            relations: Vec::new(),
        }
    }

    /// Overrides the identifier field name.
    #[must_use]
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Declares `field` as holding nested records of `schema`.
    #[must_use]
    pub fn with_relation(mut self, field: impl Into<String>, schema: Self) -> Self {
        self.relations.push(Relation {
            field: field.into(),
            schema,
        });
        self
    }
}

/// What the normalized payload's reference shape looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedResult {
    /// The payload was a single record.
    One(EntityId),
    /// The payload was a list of records, in server order.
    Many(Vec<EntityId>),
}

impl NormalizedResult {
    /// The result ids as a list regardless of payload shape.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        match self {
            Self::One(id) => vec![id.clone()],
            Self::Many(ids) => ids.clone(),
        }
    }
}

/// Output of one normalization pass.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPayload {
    /// Reference-only result shape.
    pub result: NormalizedResult,
    /// Extracted entities grouped by collection.
    pub entities: EntityMap,
}

/// Normalizes a payload (a record object or an array of record objects) into
/// id-keyed entities, stamping every record with `fetched_at`.
///
/// Nested relation fields are extracted recursively and replaced on the
/// parent record by their id (or id array).
///
/// # Errors
///
/// Fails without producing any entities when an element is not an object or
/// lacks a usable identifier, so a bad page never commits partial state.
pub fn normalize(
    payload: &Value,
    schema: &Schema,
    fetched_at: DateTime<Utc>,
) -> DomainResult<NormalizedPayload> {
    let mut entities = EntityMap::new();
    let result = match payload {
        Value::Array(elements) => {
            let mut ids = Vec::with_capacity(elements.len());
            for element in elements {
                ids.push(normalize_record(element, schema, fetched_at, &mut entities)?);
            }
            NormalizedResult::Many(ids)
        }
        Value::Object(_) => {
            NormalizedResult::One(normalize_record(payload, schema, fetched_at, &mut entities)?)
        }
        other => {
            return Err(DomainError::UnexpectedShape(format!(
                "cannot normalize {}",
                value_kind(other)
            )));
        }
    };

    Ok(NormalizedPayload { result, entities })
}

/// Normalizes one record object, returning its identifier.
fn normalize_record(
    value: &Value,
    schema: &Schema,
    fetched_at: DateTime<Utc>,
    entities: &mut EntityMap,
) -> DomainResult<EntityId> {
    let Value::Object(fields) = value else {
        return Err(DomainError::UnexpectedShape(format!(
            "expected a record object, got {}",
            value_kind(value)
        )));
    };

    let id = fields
        .get(&schema.id_field)
        .and_then(identity_of)
        .ok_or_else(|| DomainError::MissingIdentifier(schema.id_field.clone()))?;

    let mut record = fields.clone();
    for relation in &schema.relations {
        let Some(nested) = record.get(&relation.field) else {
            continue;
        };
        if nested.is_null() {
            continue;
        }
        let nested = normalize(&nested.clone(), &relation.schema, fetched_at)?;
        for (collection, records) in nested.entities {
            entities.entry(collection).or_default().extend(records);
        }
        let reference = match nested.result {
            NormalizedResult::One(id) => Value::String(id),
            NormalizedResult::Many(ids) => {
                Value::Array(ids.into_iter().map(Value::String).collect())
            }
        };
        record.insert(relation.field.clone(), reference);
    }

    entities
        .entry(schema.collection.clone())
        .or_default()
        .insert(
            id.clone(),
            EntityRecord::new(Value::Object(record), fetched_at),
        );

    Ok(id)
}

/// Extracts an identity from an id field value. Numbers are stringified so
/// integer and string server ids normalize the same way.
fn identity_of(value: &Value) -> Option<EntityId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
